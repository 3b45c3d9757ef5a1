//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use protectorium::crypto::compute_incident_commitment;
use protectorium::domain::{Company, Incident, Severity};
use protectorium::infra::{
    GenerationMode, InMemoryIncidentStore, IncidentService, IncidentStore, LocalProofEngine,
    ProofEngine,
};
use protectorium::server::{build_router, AppState, StorageKind};

/// Company owning the fixture incidents
pub const ACME: &str = "acme";
pub const GLOBEX: &str = "globex";

/// Build a fresh incident in `NeedProof`
pub fn test_incident(incident_id: &str, company_id: &str) -> Incident {
    let detected_at = Utc
        .with_ymd_and_hms(2025, 11, 23, 9, 0, 0)
        .single()
        .unwrap();
    let commitment =
        compute_incident_commitment(incident_id, company_id, &detected_at.to_rfc3339(), 12);
    Incident::new(incident_id.into(), company_id.into(), commitment, detected_at)
        .with_severity(Severity::High)
        .with_event_count(12)
        .with_agent_version("1.0.0")
}

/// In-memory store holding two companies and `INC-100` (acme, `NeedProof`)
pub async fn fixture_store() -> Arc<InMemoryIncidentStore> {
    let store = Arc::new(InMemoryIncidentStore::new());
    store
        .upsert_company(Company::new(ACME, "Acme Corp"))
        .await
        .unwrap();
    store
        .upsert_company(Company::new(GLOBEX, "Globex Inc"))
        .await
        .unwrap();
    store
        .insert_incident(test_incident("INC-100", ACME))
        .await
        .unwrap();
    store
}

/// Application state over `store` with the local proof engine
pub fn test_state(store: Arc<dyn IncidentStore>, mode: GenerationMode) -> AppState {
    let prover: Arc<dyn ProofEngine> = Arc::new(LocalProofEngine::new());
    AppState::new(
        IncidentService::new(store, prover).with_mode(mode),
        StorageKind::Memory,
    )
}

/// Router with its state applied
pub fn test_router(state: AppState) -> axum::Router {
    build_router().unwrap().with_state(state)
}

/// Send a request through the router and decode the JSON body.
pub async fn send_request(
    router: &axum::Router,
    method: Method,
    uri: &str,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::empty())
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

/// Serve `state` on an ephemeral local port, returning the base URL.
pub async fn spawn_server(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let app = test_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub async fn connect_db() -> Option<sqlx::PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .ok()?;
    Some(pool)
}

/// Assert that a result is Ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a result is Err
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        match $result {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}
