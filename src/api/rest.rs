//! REST API routes for Protectorium.

use axum::routing::{get, post};
use axum::Router;

use crate::api::handlers::{
    generate_proof, get_company_incident, get_incident, list_company_incidents, list_incidents,
    list_portfolio, verify_proof,
};
use crate::server::AppState;

/// Build the incident router.
///
/// `/company/incidents/list` is a static route; it takes priority over the
/// `:company_id` capture.
pub fn router() -> Router<AppState> {
    Router::new()
        // Policyholder
        .route("/incidents", get(list_incidents))
        .route("/incident/:incident_id", get(get_incident))
        .route("/incident/:incident_id/generate-proof", post(generate_proof))
        // Insurer
        .route("/company/incidents/list", get(list_portfolio))
        .route("/company/:company_id/incidents", get(list_company_incidents))
        .route(
            "/company/:company_id/incident/:incident_id",
            get(get_company_incident),
        )
        .route(
            "/company/:company_id/incident/:incident_id/verify",
            post(verify_proof),
        )
}
