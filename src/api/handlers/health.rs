//! Health check handlers

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::error::{ApiError, ErrorCode};
use crate::server::AppState;

/// Response for the basic health check endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall health status
    pub status: String,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Timestamp of health check
    pub timestamp: String,
}

/// Response for the readiness endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    /// `postgres` or `memory`
    pub storage: String,
    pub incident_count: u64,
    pub response_time_ms: u64,
}

/// Basic health check endpoint.
///
/// Returns a simple health response without performing deep checks.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "protectorium".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Readiness check endpoint.
///
/// Round-trips the incident store.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, ApiError> {
    let start = std::time::Instant::now();
    match state.service.store().count_incidents().await {
        Ok(incident_count) => Ok(Json(ReadinessResponse {
            status: "ready".to_string(),
            storage: state.storage_kind.to_string(),
            incident_count,
            response_time_ms: start.elapsed().as_millis() as u64,
        })),
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            Err(ApiError::new(
                ErrorCode::ServiceUnavailable,
                format!("Storage unavailable: {}", e),
            ))
        }
    }
}
