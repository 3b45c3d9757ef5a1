//! Policyholder incident handlers.

use axum::extract::{Path, State};
use axum::Json;
use tracing::{debug, info, instrument};

use super::parse_incident_id;
use crate::api::error::ApiError;
use crate::api::types::{IncidentDetailResponse, IncidentListItem, ProofStatusResponse};
use crate::server::AppState;

/// GET /incidents - List all incidents.
#[instrument(skip(state))]
pub async fn list_incidents(
    State(state): State<AppState>,
) -> Result<Json<Vec<IncidentListItem>>, ApiError> {
    let incidents = state.service.list_incidents().await?;
    debug!(count = incidents.len(), "Listing incidents");
    Ok(Json(incidents.iter().map(IncidentListItem::from).collect()))
}

/// GET /incident/:incident_id - Full incident detail.
#[instrument(skip(state), fields(incident_id = %incident_id))]
pub async fn get_incident(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
) -> Result<Json<IncidentDetailResponse>, ApiError> {
    let incident_id = parse_incident_id(incident_id)?;
    let incident = state.service.incident_details(&incident_id).await?;
    Ok(Json(IncidentDetailResponse::from(&incident)))
}

/// POST /incident/:incident_id/generate-proof - Start proof generation.
#[instrument(skip(state), fields(incident_id = %incident_id))]
pub async fn generate_proof(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
) -> Result<Json<ProofStatusResponse>, ApiError> {
    let incident_id = parse_incident_id(incident_id)?;
    let status = state.service.generate_proof(&incident_id).await?;
    info!(proof_status = %status, "Proof generation requested");
    Ok(Json(ProofStatusResponse::new(&incident_id, status)))
}
