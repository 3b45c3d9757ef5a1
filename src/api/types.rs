//! Shared request and response types for the REST API.
//!
//! Used by the handlers to encode responses and by the client to decode
//! them. Enum-valued fields travel as plain strings; the client mappers
//! validate them against the domain enums.

use serde::{Deserialize, Serialize};

use crate::domain::{
    BlockchainStatus, Incident, IncidentSummary, PortfolioEntry, ProofStatus, ProofSummary,
};

// ============================================================================
// Blockchain status
// ============================================================================

/// `blockchain_status` wire value for an incident with no proof transaction
pub const BLOCKCHAIN_STATUS_NONE: &str = "none";

/// Wire value for an optional settlement state.
///
/// The wire only knows `none | pending | confirmed`; a failed transaction
/// is reported as `pending` until it is resubmitted.
pub fn blockchain_status_wire(status: Option<BlockchainStatus>) -> &'static str {
    match status {
        None => BLOCKCHAIN_STATUS_NONE,
        Some(BlockchainStatus::Pending) | Some(BlockchainStatus::Failed) => "pending",
        Some(BlockchainStatus::Confirmed) => "confirmed",
    }
}

// ============================================================================
// Policyholder types
// ============================================================================

/// Row of `GET /incidents` and `GET /company/:company_id/incidents`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentListItem {
    pub incident_id: String,
    pub detected_at: String,
    pub proof_status: String,
}

impl From<&IncidentSummary> for IncidentListItem {
    fn from(summary: &IncidentSummary) -> Self {
        Self {
            incident_id: summary.incident_id.to_string(),
            detected_at: summary.detected_at.to_rfc3339(),
            proof_status: summary.proof_status.as_str().to_string(),
        }
    }
}

/// Proof data embedded in incident details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofSummaryDto {
    pub proof_hash: String,
    #[serde(default)]
    pub public_inputs: Vec<String>,
    pub commitment: String,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

impl From<&ProofSummary> for ProofSummaryDto {
    fn from(proof: &ProofSummary) -> Self {
        Self {
            proof_hash: proof.proof_hash.to_string(),
            public_inputs: proof.public_inputs.clone(),
            commitment: proof.commitment.to_string(),
            transaction_hash: proof.transaction_hash.map(|h| h.to_string()),
        }
    }
}

/// Response of `GET /incident/:incident_id` and the insurer detail view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentDetailResponse {
    pub incident_id: String,
    pub company_id: String,
    #[serde(default)]
    pub company_name: Option<String>,
    pub detected_at: String,
    pub commitment: String,
    pub proof_status: String,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub blockchain_status: Option<String>,
    #[serde(default)]
    pub proof_summary: Option<ProofSummaryDto>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub event_count: Option<u32>,
    #[serde(default)]
    pub agent_version: Option<String>,
}

impl From<&Incident> for IncidentDetailResponse {
    fn from(incident: &Incident) -> Self {
        let proof = incident.proof.as_ref();
        Self {
            incident_id: incident.incident_id.to_string(),
            company_id: incident.company_id.to_string(),
            company_name: incident.company_name.clone(),
            detected_at: incident.detected_at.to_rfc3339(),
            commitment: incident.commitment.to_string(),
            proof_status: incident.proof_status.as_str().to_string(),
            transaction_hash: proof
                .and_then(|p| p.transaction_hash)
                .map(|h| h.to_string()),
            blockchain_status: Some(
                blockchain_status_wire(proof.and_then(|p| p.blockchain_status)).to_string(),
            ),
            proof_summary: proof.map(ProofSummaryDto::from),
            severity: incident.severity.map(|s| s.as_str().to_string()),
            event_count: incident.event_count,
            agent_version: incident.agent_version.clone(),
        }
    }
}

/// Response of the generate and verify endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStatusResponse {
    pub incident_id: String,
    pub proof_status: String,
}

impl ProofStatusResponse {
    pub fn new(incident_id: impl ToString, status: ProofStatus) -> Self {
        Self {
            incident_id: incident_id.to_string(),
            proof_status: status.as_str().to_string(),
        }
    }
}

// ============================================================================
// Insurer types
// ============================================================================

/// Row of `GET /company/incidents/list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioItem {
    pub company_id: String,
    pub company_name: String,
    pub incident_count: u64,
}

impl From<&PortfolioEntry> for PortfolioItem {
    fn from(entry: &PortfolioEntry) -> Self {
        Self {
            company_id: entry.company_id.to_string(),
            company_name: entry.company_name.clone(),
            incident_count: entry.incident_count,
        }
    }
}
