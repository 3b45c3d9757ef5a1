//! Domain models for Protectorium
//!
//! Incidents, proofs, companies and the proof lifecycle state machine with
//! its role-based gating rules.

mod incident;
mod lifecycle;
mod types;

pub use incident::*;
pub use lifecycle::*;
pub use types::*;
