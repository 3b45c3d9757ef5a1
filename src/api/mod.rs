//! API layer for Protectorium
//!
//! REST endpoints for the policyholder and insurer incident views, plus the
//! wire types shared with the client.

pub mod error;
pub mod handlers;
mod rest;
pub mod types;

pub use error::{ApiError, ErrorCode, ErrorDetails};
pub use rest::*;
