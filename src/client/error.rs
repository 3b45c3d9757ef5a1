//! Client error types

use thiserror::Error;

use crate::domain::{IncidentId, LifecycleAction, LifecycleError};

/// Errors surfaced by the REST client and dashboard
#[derive(Error, Debug)]
pub enum ClientError {
    /// Non-2xx response
    #[error("{message} (HTTP {status})")]
    Api {
        status: u16,
        status_text: String,
        /// Machine-readable code, when the backend sent one
        code: Option<String>,
        message: String,
    },

    /// Transport failure (connect, timeout, TLS)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("invalid response: {0}")]
    Decode(String),

    /// Rejected by the local guard before any request was sent
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Same action already outstanding for this incident
    #[error("{action} already in progress for incident {incident_id}")]
    InFlight {
        action: LifecycleAction,
        incident_id: IncidentId,
    },

    /// Proof still generating after the configured number of polls
    #[error("proof for incident {0} still generating after polling")]
    PollTimeout(IncidentId),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// HTTP status, for API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether repeating the same call may succeed without other changes
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Api { status, .. } => *status >= 500 || *status == 429,
            ClientError::Network(_) | ClientError::InFlight { .. } | ClientError::PollTimeout(_) => {
                true
            }
            ClientError::Decode(_) | ClientError::Lifecycle(_) | ClientError::Configuration(_) => {
                false
            }
        }
    }

    /// Whether the backend reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> ClientError {
        ClientError::Api {
            status,
            status_text: String::new(),
            code: None,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_retryable() {
        assert!(api(503).is_retryable());
        assert!(api(429).is_retryable());
        assert!(!api(409).is_retryable());
        assert!(!ClientError::Decode("bad".into()).is_retryable());
        assert!(ClientError::PollTimeout("INC-1".into()).is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(api(404).to_string(), "boom (HTTP 404)");
        assert!(api(404).is_not_found());
    }
}
