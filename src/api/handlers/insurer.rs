//! Insurer portfolio and verification handlers.
//!
//! Every view here hides incidents that still need a proof.

use axum::extract::{Path, State};
use axum::Json;
use tracing::{debug, info, instrument};

use super::{parse_company_id, parse_incident_id};
use crate::api::error::ApiError;
use crate::api::types::{
    IncidentDetailResponse, IncidentListItem, PortfolioItem, ProofStatusResponse,
};
use crate::server::AppState;

/// GET /company/incidents/list - Insurer portfolio.
#[instrument(skip(state))]
pub async fn list_portfolio(
    State(state): State<AppState>,
) -> Result<Json<Vec<PortfolioItem>>, ApiError> {
    let portfolio = state.service.portfolio().await?;
    debug!(companies = portfolio.len(), "Listing portfolio");
    Ok(Json(portfolio.iter().map(PortfolioItem::from).collect()))
}

/// GET /company/:company_id/incidents - Insurer-visible incidents of a company.
#[instrument(skip(state), fields(company_id = %company_id))]
pub async fn list_company_incidents(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Json<Vec<IncidentListItem>>, ApiError> {
    let company_id = parse_company_id(company_id)?;
    let incidents = state.service.company_incidents(&company_id).await?;
    Ok(Json(incidents.iter().map(IncidentListItem::from).collect()))
}

/// GET /company/:company_id/incident/:incident_id - Insurer detail view.
#[instrument(skip(state), fields(company_id = %company_id, incident_id = %incident_id))]
pub async fn get_company_incident(
    State(state): State<AppState>,
    Path((company_id, incident_id)): Path<(String, String)>,
) -> Result<Json<IncidentDetailResponse>, ApiError> {
    let company_id = parse_company_id(company_id)?;
    let incident_id = parse_incident_id(incident_id)?;
    let incident = state
        .service
        .company_incident_details(&company_id, &incident_id)
        .await?;
    Ok(Json(IncidentDetailResponse::from(&incident)))
}

/// POST /company/:company_id/incident/:incident_id/verify - Verify a proof.
#[instrument(skip(state), fields(company_id = %company_id, incident_id = %incident_id))]
pub async fn verify_proof(
    State(state): State<AppState>,
    Path((company_id, incident_id)): Path<(String, String)>,
) -> Result<Json<ProofStatusResponse>, ApiError> {
    let company_id = parse_company_id(company_id)?;
    let incident_id = parse_incident_id(incident_id)?;
    let status = state.service.verify_proof(&company_id, &incident_id).await?;
    info!(proof_status = %status, "Proof verification completed");
    Ok(Json(ProofStatusResponse::new(&incident_id, status)))
}
