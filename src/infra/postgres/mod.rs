//! PostgreSQL implementations for production incident storage

mod incident_store;

pub use incident_store::*;
