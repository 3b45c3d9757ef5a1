//! Incident, proof and company models
//!
//! The proof lifecycle is a single [`ProofStatus`] enum. Every consumer
//! (wire codec, storage codec, labels, role predicates) matches on it
//! exhaustively so wire values and display labels cannot drift apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::types::{CompanyId, HexDigest, IncidentId};

// ============================================================================
// Proof status
// ============================================================================

/// Where an incident is in the proof lifecycle.
///
/// `NeedProof → Generating → NotVerified → Verified`. `Generating` is
/// transient and carries no proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofStatus {
    /// No proof has been produced yet
    NeedProof,
    /// A proof is being produced by the prover
    Generating,
    /// A proof exists but the insurer has not verified it
    NotVerified,
    /// The insurer verified the proof
    Verified,
}

impl ProofStatus {
    pub const ALL: [ProofStatus; 4] = [
        ProofStatus::NeedProof,
        ProofStatus::Generating,
        ProofStatus::NotVerified,
        ProofStatus::Verified,
    ];

    /// Wire / storage value
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofStatus::NeedProof => "need_proof",
            ProofStatus::Generating => "generating",
            ProofStatus::NotVerified => "not_verified",
            ProofStatus::Verified => "verified",
        }
    }

    /// Human-readable label shown in dashboards
    pub fn label(&self) -> &'static str {
        match self {
            ProofStatus::NeedProof => "Need Proof",
            ProofStatus::Generating => "Generating Proof",
            ProofStatus::NotVerified => "Proof Not Verified",
            ProofStatus::Verified => "ZK proof Verified",
        }
    }

    /// Whether an incident in this state must carry a proof summary
    pub fn has_proof(&self) -> bool {
        match self {
            ProofStatus::NeedProof | ProofStatus::Generating => false,
            ProofStatus::NotVerified | ProofStatus::Verified => true,
        }
    }
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProofStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "need_proof" => Ok(ProofStatus::NeedProof),
            "generating" => Ok(ProofStatus::Generating),
            "not_verified" => Ok(ProofStatus::NotVerified),
            "verified" => Ok(ProofStatus::Verified),
            other => Err(format!("unknown proof status: {other}")),
        }
    }
}

// ============================================================================
// Blockchain status
// ============================================================================

/// Settlement state of the proof's on-chain transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockchainStatus {
    Pending,
    Confirmed,
    Failed,
}

impl BlockchainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockchainStatus::Pending => "pending",
            BlockchainStatus::Confirmed => "confirmed",
            BlockchainStatus::Failed => "failed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BlockchainStatus::Pending => "Pending",
            BlockchainStatus::Confirmed => "Confirmed",
            BlockchainStatus::Failed => "Failed",
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, BlockchainStatus::Pending)
    }
}

impl fmt::Display for BlockchainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BlockchainStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BlockchainStatus::Pending),
            "confirmed" => Ok(BlockchainStatus::Confirmed),
            "failed" => Ok(BlockchainStatus::Failed),
            other => Err(format!("unknown blockchain status: {other}")),
        }
    }
}

// ============================================================================
// Severity
// ============================================================================

/// Severity assigned by the detection agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

// ============================================================================
// Proofs
// ============================================================================

/// Output of the external prover for a single incident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofArtifact {
    /// Hash of the proof bytes
    pub proof_hash: HexDigest,
    /// Public inputs as hex field elements
    pub public_inputs: Vec<String>,
    /// Hash of the transaction that posted the proof on-chain
    pub transaction_hash: HexDigest,
}

/// Proof data exposed once a proof exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofSummary {
    pub proof_hash: HexDigest,
    pub public_inputs: Vec<String>,
    /// Commitment the proof was produced against
    pub commitment: HexDigest,
    pub transaction_hash: Option<HexDigest>,
    /// `None` when the backend has no transaction on record
    pub blockchain_status: Option<BlockchainStatus>,
}

impl ProofSummary {
    /// Build the summary for a freshly generated proof. The transaction is
    /// submitted but not yet settled.
    pub fn from_artifact(artifact: ProofArtifact, commitment: HexDigest) -> Self {
        Self {
            proof_hash: artifact.proof_hash,
            public_inputs: artifact.public_inputs,
            commitment,
            transaction_hash: Some(artifact.transaction_hash),
            blockchain_status: Some(BlockchainStatus::Pending),
        }
    }

    /// Relative URL of the downloadable proof document
    pub fn json_url(&self, incident_id: &IncidentId) -> String {
        format!("/api/proofs/{incident_id}.json")
    }
}

// ============================================================================
// Incident
// ============================================================================

/// A detected incident and its proof state.
///
/// Invariant: `proof.is_some() == proof_status.has_proof()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: IncidentId,
    pub company_id: CompanyId,
    pub company_name: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub commitment: HexDigest,
    pub proof_status: ProofStatus,
    pub proof: Option<ProofSummary>,
    pub severity: Option<Severity>,
    pub event_count: Option<u32>,
    pub agent_version: Option<String>,
}

impl Incident {
    /// A freshly detected incident awaiting its proof
    pub fn new(
        incident_id: IncidentId,
        company_id: CompanyId,
        commitment: HexDigest,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            incident_id,
            company_id,
            company_name: None,
            detected_at,
            commitment,
            proof_status: ProofStatus::NeedProof,
            proof: None,
            severity: None,
            event_count: None,
            agent_version: None,
        }
    }

    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_event_count(mut self, count: u32) -> Self {
        self.event_count = Some(count);
        self
    }

    pub fn with_agent_version(mut self, version: impl Into<String>) -> Self {
        self.agent_version = Some(version.into());
        self
    }

    /// Whether the proof-presence invariant holds
    pub fn is_consistent(&self) -> bool {
        self.proof.is_some() == self.proof_status.has_proof()
    }

    pub fn summary(&self) -> IncidentSummary {
        IncidentSummary {
            incident_id: self.incident_id.clone(),
            detected_at: self.detected_at,
            proof_status: self.proof_status,
        }
    }
}

/// List-view projection of an incident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentSummary {
    pub incident_id: IncidentId,
    pub detected_at: DateTime<Utc>,
    pub proof_status: ProofStatus,
}

// ============================================================================
// Companies
// ============================================================================

/// Insured company
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub company_id: CompanyId,
    pub company_name: String,
    pub wallet_address: Option<String>,
}

impl Company {
    pub fn new(company_id: impl Into<CompanyId>, company_name: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            company_name: company_name.into(),
            wallet_address: None,
        }
    }
}

/// One row of the insurer's portfolio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub company_id: CompanyId,
    pub company_name: String,
    /// Incidents of this company visible to the insurer
    pub incident_count: u64,
}
