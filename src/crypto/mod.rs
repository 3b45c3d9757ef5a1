//! Hashing utilities for Protectorium
//!
//! Provides domain-separated SHA-256 digests for incident commitments,
//! proof hashes and proof transaction hashes.

mod hash;

pub use hash::*;
