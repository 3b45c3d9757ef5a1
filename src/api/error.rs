//! Structured API error responses with error codes
//!
//! This module provides consistent error handling across all API endpoints
//! with machine-readable error codes and human-readable messages.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::LifecycleError;
use crate::infra::ServiceError;

// ============================================================================
// Error Codes
// ============================================================================

/// Error codes for API responses
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (3xxx)
    /// Field or path value is invalid
    InvalidFieldValue,

    // Resource errors (4xxx)
    /// Incident not found, or not visible in the requested scope
    IncidentNotFound,
    /// Company not found
    CompanyNotFound,

    // Conflict / permission errors (5xxx)
    /// Resource already exists
    AlreadyExists,
    /// Role may not perform this operation
    InsufficientPermissions,

    // Lifecycle errors (7xxx)
    /// Transition not valid from the current proof status
    InvalidStateTransition,
    /// Prover failed to produce a proof
    ProofGenerationFailed,
    /// Verifier rejected the proof
    ProofRejected,

    // Infrastructure errors (8xxx)
    /// Database operation failed
    DatabaseError,
    /// Service not ready
    ServiceUnavailable,
    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn numeric_code(&self) -> u32 {
        match self {
            ErrorCode::InvalidFieldValue => 3001,

            ErrorCode::IncidentNotFound => 4001,
            ErrorCode::CompanyNotFound => 4002,

            ErrorCode::AlreadyExists => 5001,
            ErrorCode::InsufficientPermissions => 5002,

            ErrorCode::InvalidStateTransition => 7001,
            ErrorCode::ProofGenerationFailed => 7002,
            ErrorCode::ProofRejected => 7003,

            ErrorCode::DatabaseError => 8001,
            ErrorCode::ServiceUnavailable => 8002,
            ErrorCode::InternalError => 8999,
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidFieldValue => StatusCode::BAD_REQUEST,

            ErrorCode::IncidentNotFound => StatusCode::NOT_FOUND,
            ErrorCode::CompanyNotFound => StatusCode::NOT_FOUND,

            ErrorCode::AlreadyExists => StatusCode::CONFLICT,
            ErrorCode::InsufficientPermissions => StatusCode::FORBIDDEN,

            ErrorCode::InvalidStateTransition => StatusCode::CONFLICT,
            ErrorCode::ProofGenerationFailed => StatusCode::BAD_GATEWAY,
            ErrorCode::ProofRejected => StatusCode::UNPROCESSABLE_ENTITY,

            ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code_str = match self {
            ErrorCode::InvalidFieldValue => "INVALID_FIELD_VALUE",
            ErrorCode::IncidentNotFound => "INCIDENT_NOT_FOUND",
            ErrorCode::CompanyNotFound => "COMPANY_NOT_FOUND",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::ProofGenerationFailed => "PROOF_GENERATION_FAILED",
            ErrorCode::ProofRejected => "PROOF_REJECTED",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", code_str)
    }
}

// ============================================================================
// Structured Error Response
// ============================================================================

/// Structured error response for API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error details
    pub error: ErrorDetails,
}

/// Detailed error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Numeric error code for easy categorization
    pub numeric_code: u32,

    /// Human-readable error message
    pub message: String,

    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Related resource ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                details: None,
                resource_id: None,
            },
        }
    }

    /// Set additional details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    /// Set related resource ID
    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.error.resource_id = Some(id.into());
        self
    }

    /// Get the HTTP status code
    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code_str = self.error.code.to_string();
        let mut response = (status, Json(self)).into_response();

        // Add error code header for easier debugging
        if let Ok(code_value) = axum::http::HeaderValue::from_str(&code_str) {
            response.headers_mut().insert(
                axum::http::header::HeaderName::from_static("x-error-code"),
                code_value,
            );
        }

        response
    }
}

// ============================================================================
// Conversion from ServiceError
// ============================================================================

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        let message = err.to_string();
        match err {
            LifecycleError::InvalidTransition {
                incident_id,
                action,
                from,
            } => ApiError::new(ErrorCode::InvalidStateTransition, message)
                .with_resource_id(incident_id.to_string())
                .with_details(serde_json::json!({
                    "action": action,
                    "from_state": from,
                })),
            LifecycleError::NoPendingTransaction { incident_id } => {
                ApiError::new(ErrorCode::InvalidStateTransition, message)
                    .with_resource_id(incident_id.to_string())
            }
            LifecycleError::RoleNotPermitted { .. } => {
                ApiError::new(ErrorCode::InsufficientPermissions, message)
            }
            LifecycleError::NotVisible { incident_id, .. }
            | LifecycleError::CompanyMismatch { incident_id, .. } => ApiError::new(
                ErrorCode::IncidentNotFound,
                format!("Incident not found: {}", incident_id),
            )
            .with_resource_id(incident_id.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => {
                ApiError::new(ErrorCode::DatabaseError, format!("Database error: {}", e))
            }
            ServiceError::IncidentNotFound(id) => ApiError::new(
                ErrorCode::IncidentNotFound,
                format!("Incident not found: {}", id),
            )
            .with_resource_id(id.to_string()),
            ServiceError::CompanyNotFound(id) => ApiError::new(
                ErrorCode::CompanyNotFound,
                format!("Company not found: {}", id),
            )
            .with_resource_id(id.to_string()),
            ServiceError::DuplicateIncident(id) => ApiError::new(
                ErrorCode::AlreadyExists,
                format!("Incident already exists: {}", id),
            )
            .with_resource_id(id.to_string()),
            ServiceError::Lifecycle(e) => e.into(),
            ServiceError::ProofGeneration {
                incident_id,
                reason,
            } => ApiError::new(
                ErrorCode::ProofGenerationFailed,
                format!("Proof generation failed: {}", reason),
            )
            .with_resource_id(incident_id.to_string()),
            ServiceError::ProofRejected {
                incident_id,
                reason,
            } => ApiError::new(
                ErrorCode::ProofRejected,
                format!("Proof rejected: {}", reason),
            )
            .with_resource_id(incident_id.to_string()),
            ServiceError::CorruptRecord {
                incident_id,
                reason,
            } => ApiError::new(
                ErrorCode::InternalError,
                format!("Corrupt incident record: {}", reason),
            )
            .with_resource_id(incident_id.to_string()),
            ServiceError::Configuration(msg) => ApiError::new(
                ErrorCode::InternalError,
                format!("Configuration error: {}", msg),
            ),
            ServiceError::Internal(msg) => ApiError::new(ErrorCode::InternalError, msg),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Create a validation error with field details
pub fn validation_error(field: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::InvalidFieldValue, message.into()).with_details(serde_json::json!({
        "field": field
    }))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LifecycleAction, ProofStatus};

    #[test]
    fn test_error_code_numeric() {
        assert_eq!(ErrorCode::InvalidFieldValue.numeric_code(), 3001);
        assert_eq!(ErrorCode::IncidentNotFound.numeric_code(), 4001);
        assert_eq!(ErrorCode::InvalidStateTransition.numeric_code(), 7001);
        assert_eq!(ErrorCode::DatabaseError.numeric_code(), 8001);
        assert_eq!(ErrorCode::InternalError.numeric_code(), 8999);
    }

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::IncidentNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::InvalidStateTransition.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::ProofRejected.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ErrorCode::InternalError.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_transition_conversion() {
        let err = ServiceError::Lifecycle(LifecycleError::InvalidTransition {
            incident_id: "INC-1".into(),
            action: LifecycleAction::GenerateProof,
            from: ProofStatus::Verified,
        });
        let api: ApiError = err.into();

        assert_eq!(api.error.code, ErrorCode::InvalidStateTransition);
        assert_eq!(api.status(), StatusCode::CONFLICT);
        assert_eq!(api.error.resource_id.as_deref(), Some("INC-1"));
        assert_eq!(
            api.error.details.unwrap()["from_state"],
            serde_json::json!("verified")
        );
    }

    #[test]
    fn test_not_found_conversion() {
        let api: ApiError = ServiceError::CompanyNotFound("ghost".into()).into();
        assert_eq!(api.error.code, ErrorCode::CompanyNotFound);
        assert_eq!(api.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_error_serialization() {
        let error = ApiError::new(ErrorCode::IncidentNotFound, "Incident not found: INC-9");
        let json = serde_json::to_string(&error).unwrap();

        assert!(json.contains("INCIDENT_NOT_FOUND"));
        assert!(json.contains("Incident not found: INC-9"));
        assert!(json.contains("4001"));
    }

    #[test]
    fn test_error_display_matches_serde() {
        for code in [
            ErrorCode::InvalidStateTransition,
            ErrorCode::ProofGenerationFailed,
            ErrorCode::ServiceUnavailable,
        ] {
            assert_eq!(
                serde_json::to_value(code).unwrap(),
                serde_json::json!(code.to_string())
            );
        }
    }
}
