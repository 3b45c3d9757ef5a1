//! HTTP server bootstrap for Protectorium.
//!
//! This module wires together:
//! - configuration
//! - incident storage (PostgreSQL or in-memory)
//! - the proof engine and lifecycle service
//! - the Axum router

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::AllowOrigin;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::api::handlers::{health_check, readiness_check};
use crate::infra::{
    seed_demo_data, shutdown_signal, GenerationMode, InMemoryIncidentStore, IncidentService,
    IncidentStore, LocalProofEngine, PgIncidentStore, ProofEngine,
};

/// How long shutdown waits for background proof jobs
const JOB_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Maximum database connections.
    pub max_connections: u32,
    /// Create tables on startup.
    pub init_db: bool,
    /// Insert demo data into an empty store.
    pub seed_demo_data: bool,
    /// Inline or background proof generation.
    pub generation_mode: GenerationMode,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("Invalid listen address {host}:{port}"))?;

        let max_connections: u32 = std::env::var("MAX_DB_CONNECTIONS")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(10);

        let generation_mode = match std::env::var("PROOF_GENERATION_MODE") {
            Ok(v) => v.parse().map_err(|e: String| anyhow::anyhow!(e))?,
            Err(_) => GenerationMode::default(),
        };

        let log_format = match std::env::var("LOG_FORMAT") {
            Ok(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            database_url,
            listen_addr,
            max_connections,
            init_db: env_flag("DB_INIT_ON_STARTUP", true),
            seed_demo_data: env_flag("SEED_DEMO_DATA", true),
            generation_mode,
            log_format,
        })
    }
}

/// Read a boolean flag; anything but `0`, `false` or `off` counts as set.
fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| {
            !matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off"
            )
        })
        .unwrap_or(default)
}

/// Which incident store backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Postgres,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Memory => write!(f, "memory"),
            StorageKind::Postgres => write!(f, "postgres"),
        }
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: IncidentService,
    pub storage_kind: StorageKind,
}

impl AppState {
    pub fn new(service: IncidentService, storage_kind: StorageKind) -> Self {
        Self {
            service,
            storage_kind,
        }
    }

    /// State over an empty in-memory store with the local proof engine
    pub fn in_memory() -> Self {
        let store: Arc<dyn IncidentStore> = Arc::new(InMemoryIncidentStore::new());
        let prover: Arc<dyn ProofEngine> = Arc::new(LocalProofEngine::new());
        Self::new(IncidentService::new(store, prover), StorageKind::Memory)
    }
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    info!("Starting Protectorium v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Proof generation: {}", config.generation_mode.as_str());

    let (store, storage_kind) = connect_store(&config).await?;
    let prover: Arc<dyn ProofEngine> = Arc::new(LocalProofEngine::new());

    if config.seed_demo_data {
        let inserted = seed_demo_data(store.as_ref(), prover.as_ref()).await?;
        if inserted > 0 {
            info!(incidents = inserted, "Demo data loaded");
        }
    }

    let service = IncidentService::new(store, prover).with_mode(config.generation_mode);
    service.resume_interrupted().await?;

    let state = AppState::new(service.clone(), storage_kind);

    // Build router
    let app = build_router()?.with_state(state);

    // Start server
    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    info!("Protectorium is ready to accept connections");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if !service.drain(JOB_DRAIN_TIMEOUT).await {
        warn!("Shutting down with proof jobs still running");
    }
    info!("Shutdown complete");

    Ok(())
}

/// Open the configured incident store.
pub async fn connect_store(
    config: &Config,
) -> anyhow::Result<(Arc<dyn IncidentStore>, StorageKind)> {
    let Some(database_url) = &config.database_url else {
        info!("DATABASE_URL not set, using in-memory incident store");
        return Ok((Arc::new(InMemoryIncidentStore::new()), StorageKind::Memory));
    };

    info!("  Max connections: {}", config.max_connections);
    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(database_url)
        .await?;
    info!("Connected to PostgreSQL");

    let store = PgIncidentStore::new(pool);
    if config.init_db {
        info!("Initializing database schema...");
        store.initialize().await?;
        info!("Database schema ready");
    } else {
        info!("Schema initialization skipped (DB_INIT_ON_STARTUP=0)");
    }

    Ok((Arc::new(store), StorageKind::Postgres))
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_current_span(true)
            .init(),
    }
}

/// Build the full router: incident API, health probes, tracing and CORS.
pub fn build_router() -> anyhow::Result<Router<AppState>> {
    let mut router = Router::new()
        .merge(crate::api::router())
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors_layer_from_env()? {
        router = router.layer(cors_layer);
    }

    Ok(router)
}

fn cors_layer_from_env() -> anyhow::Result<Option<CorsLayer>> {
    let origins = match std::env::var("CORS_ALLOW_ORIGINS") {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };

    let origins = origins.trim();
    if origins.is_empty() {
        return Ok(None);
    }

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_kind_display() {
        assert_eq!(StorageKind::Memory.to_string(), "memory");
        assert_eq!(StorageKind::Postgres.to_string(), "postgres");
    }

    #[test]
    fn test_env_flag_default() {
        assert!(env_flag("PROTECTORIUM_TEST_UNSET_FLAG", true));
        assert!(!env_flag("PROTECTORIUM_TEST_UNSET_FLAG", false));
    }
}
