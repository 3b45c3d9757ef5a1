//! Trait definitions for Protectorium core services

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{
    Company, CompanyId, Incident, IncidentId, ProofArtifact, ProofStatus, ProofSummary,
};

use super::Result;

/// Incident store holds companies and their incidents.
///
/// Incidents are created by the detection system (or seeding) and mutated
/// only through conditional updates; they are never deleted.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Insert or replace a company
    async fn upsert_company(&self, company: Company) -> Result<()>;

    /// Get a company by ID
    async fn get_company(&self, company_id: &CompanyId) -> Result<Option<Company>>;

    /// List all companies ordered by ID
    async fn list_companies(&self) -> Result<Vec<Company>>;

    /// Insert a newly detected incident
    ///
    /// Fails with `DuplicateIncident` if the ID is taken.
    async fn insert_incident(&self, incident: Incident) -> Result<()>;

    /// Get an incident with its company name resolved
    async fn get_incident(&self, incident_id: &IncidentId) -> Result<Option<Incident>>;

    /// List all incidents, oldest first
    async fn list_incidents(&self) -> Result<Vec<Incident>>;

    /// List incidents of one company, oldest first
    async fn list_company_incidents(&self, company_id: &CompanyId) -> Result<Vec<Incident>>;

    /// Total number of incidents
    async fn count_incidents(&self) -> Result<u64>;

    /// Write the mutable state of `incident` (status and proof) if the stored
    /// status still equals `expected`.
    ///
    /// Returns `false` without writing when the stored status differs. This
    /// compare-and-set is what makes lifecycle transitions idempotent.
    async fn update_incident(&self, incident: &Incident, expected: ProofStatus) -> Result<bool>;
}

/// Proof engine produces and checks incident proofs.
///
/// Stands in for the external prover/verifier service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProofEngine: Send + Sync {
    /// Produce a proof over the incident's commitment
    async fn generate(&self, incident: &Incident) -> Result<ProofArtifact>;

    /// Check a previously generated proof
    async fn verify(&self, incident: &Incident, proof: &ProofSummary) -> Result<bool>;
}
