//! Protectorium Library
//!
//! Incident proof lifecycle service: incidents move from "needs proof" to
//! "proof generated" to "verified", gated by role (Policyholder, Insurer).
//!
//! ## Modules
//!
//! - [`domain`] - Incidents, proofs, sessions and the lifecycle state machine
//! - [`crypto`] - Commitment, proof and transaction hashing
//! - [`infra`] - Storage (in-memory, PostgreSQL), proof engine, lifecycle service
//! - [`api`] - REST API routes and wire types
//! - [`client`] - Typed REST client and session-scoped dashboard
//! - [`server`] - Configuration and server bootstrap

pub mod api;
pub mod client;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod server;

// Re-export commonly used types
pub use domain::{
    BlockchainStatus, Company, CompanyId, HexDigest, Incident, IncidentId, IncidentSummary,
    LifecycleAction, LifecycleError, PortfolioEntry, ProofStatus, ProofSummary, Role, Session,
};

pub use infra::{
    IncidentService, IncidentStore, InMemoryIncidentStore, LocalProofEngine, PgIncidentStore,
    ProofEngine, Result, ServiceError,
};
