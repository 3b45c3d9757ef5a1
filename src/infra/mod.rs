//! Infrastructure layer for Protectorium
//!
//! Contains trait definitions and implementations for:
//! - Incident storage (in-memory, PostgreSQL)
//! - Proof engine (deterministic local prover)
//! - Lifecycle service (compare-and-set transitions)
//! - Demo seed data
//! - Graceful shutdown (signal handling, background job draining)

mod error;
mod graceful_shutdown;
mod memory;
pub mod postgres;
mod prover;
mod seed;
mod service;
mod traits;

pub use error::*;
pub use graceful_shutdown::{shutdown_signal, JobGuard, JobTracker};
pub use memory::InMemoryIncidentStore;
pub use postgres::PgIncidentStore;
pub use prover::LocalProofEngine;
pub use seed::seed_demo_data;
pub use service::{GenerationMode, IncidentService};
pub use traits::*;
