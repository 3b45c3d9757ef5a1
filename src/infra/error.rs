//! Error types for Protectorium infrastructure

use thiserror::Error;

use crate::domain::{CompanyId, IncidentId, LifecycleError};

/// Errors that can occur in the incident service and its stores
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Incident not found (or not visible in the requested scope)
    #[error("incident not found: {0}")]
    IncidentNotFound(IncidentId),

    /// Company not found
    #[error("company not found: {0}")]
    CompanyNotFound(CompanyId),

    /// Incident already exists
    #[error("incident already exists: {0}")]
    DuplicateIncident(IncidentId),

    /// Lifecycle rule violated
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The proof engine failed to produce a proof
    #[error("proof generation failed for {incident_id}: {reason}")]
    ProofGeneration {
        incident_id: IncidentId,
        reason: String,
    },

    /// The proof engine rejected a proof during verification
    #[error("proof rejected for {incident_id}: {reason}")]
    ProofRejected {
        incident_id: IncidentId,
        reason: String,
    },

    /// Stored row could not be decoded into a domain value
    #[error("corrupt record for {incident_id}: {reason}")]
    CorruptRecord {
        incident_id: IncidentId,
        reason: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;
