//! Typed client for the Protectorium REST API
//!
//! - [`ApiClient`] - raw endpoint calls returning wire types
//! - [`mappers`] - wire types into domain values
//! - [`IncidentDashboard`] - session-scoped views and lifecycle actions

pub mod cache;
mod config;
mod dashboard;
mod error;
mod http;
mod inflight;
pub mod mappers;

pub use cache::{CacheStats, QueryCache, QueryKey};
pub use config::{ClientConfig, DEFAULT_EXPLORER_URL};
pub use dashboard::IncidentDashboard;
pub use error::{ClientError, Result};
pub use http::ApiClient;
pub use inflight::{InFlightGuard, InFlightTracker};
