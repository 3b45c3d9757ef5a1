//! Incident lifecycle service
//!
//! Server-side owner of incident state. Every transition is applied with a
//! compare-and-set against the store, which makes the backend the source of
//! truth for idempotence.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{
    is_visible, CompanyId, Incident, IncidentId, IncidentSummary, LifecycleAction,
    LifecycleError, PortfolioEntry, ProofStatus, Role,
};
use crate::infra::{IncidentStore, JobTracker, ProofEngine, Result, ServiceError};

/// How `generate_proof` runs the prover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationMode {
    /// Run the prover within the request and return the final status
    #[default]
    Inline,
    /// Spawn the prover and return `generating` immediately
    Background,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Inline => "inline",
            GenerationMode::Background => "background",
        }
    }
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(GenerationMode::Inline),
            "background" => Ok(GenerationMode::Background),
            other => Err(format!("unknown proof generation mode: {other}")),
        }
    }
}

/// Incident lifecycle service
#[derive(Clone)]
pub struct IncidentService {
    store: Arc<dyn IncidentStore>,
    prover: Arc<dyn ProofEngine>,
    mode: GenerationMode,
    jobs: Arc<JobTracker>,
}

impl IncidentService {
    pub fn new(store: Arc<dyn IncidentStore>, prover: Arc<dyn ProofEngine>) -> Self {
        Self {
            store,
            prover,
            mode: GenerationMode::default(),
            jobs: Arc::new(JobTracker::new()),
        }
    }

    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    pub fn store(&self) -> &Arc<dyn IncidentStore> {
        &self.store
    }

    /// Wait for background proof jobs to finish
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.jobs.wait_for_drain(timeout).await
    }

    // ========================================================================
    // Policyholder operations
    // ========================================================================

    /// All incidents, oldest first
    #[instrument(skip(self))]
    pub async fn list_incidents(&self) -> Result<Vec<IncidentSummary>> {
        let incidents = self.store.list_incidents().await?;
        debug!(count = incidents.len(), "Listed incidents");
        Ok(incidents.iter().map(Incident::summary).collect())
    }

    #[instrument(skip(self), fields(incident_id = %incident_id))]
    pub async fn incident_details(&self, incident_id: &IncidentId) -> Result<Incident> {
        self.load(incident_id).await
    }

    /// Start (or join) proof generation for an incident.
    ///
    /// Returns the status after the call: `not_verified` once an inline run
    /// completes, `generating` while a run is in flight. Calls on an incident
    /// that already has a proof fail with an invalid transition.
    #[instrument(skip(self), fields(incident_id = %incident_id, mode = self.mode.as_str()))]
    pub async fn generate_proof(&self, incident_id: &IncidentId) -> Result<ProofStatus> {
        let incident = self.load(incident_id).await?;

        match incident.proof_status {
            ProofStatus::NeedProof => {}
            ProofStatus::Generating => {
                debug!("Proof generation already in flight");
                return Ok(ProofStatus::Generating);
            }
            ProofStatus::NotVerified | ProofStatus::Verified => {
                return Err(invalid(&incident, LifecycleAction::GenerateProof));
            }
        }

        let mut claimed = incident.clone();
        claimed.begin_generation()?;
        if !self
            .store
            .update_incident(&claimed, ProofStatus::NeedProof)
            .await?
        {
            // Lost the race against a concurrent request
            let current = self.load(incident_id).await?;
            return match current.proof_status {
                ProofStatus::Generating => Ok(ProofStatus::Generating),
                _ => Err(invalid(&current, LifecycleAction::GenerateProof)),
            };
        }

        info!("Proof generation started");

        match self.mode {
            GenerationMode::Inline => self.run_generation(claimed).await,
            GenerationMode::Background => {
                let service = self.clone();
                let guard = self.jobs.job_start();
                tokio::spawn(async move {
                    let _guard = guard;
                    let incident_id = claimed.incident_id.clone();
                    if let Err(e) = service.run_generation(claimed).await {
                        error!(incident_id = %incident_id, error = %e, "Background proof generation failed");
                    }
                });
                Ok(ProofStatus::Generating)
            }
        }
    }

    /// Run the prover for an incident already claimed in `Generating`
    async fn run_generation(&self, mut incident: Incident) -> Result<ProofStatus> {
        match self.prover.generate(&incident).await {
            Ok(artifact) => {
                incident.complete_generation(artifact)?;
                if !self
                    .store
                    .update_incident(&incident, ProofStatus::Generating)
                    .await?
                {
                    return Err(ServiceError::Internal(format!(
                        "incident {} left generating state during proof generation",
                        incident.incident_id
                    )));
                }
                info!(incident_id = %incident.incident_id, "Proof generated");
                Ok(incident.proof_status)
            }
            Err(e) => {
                warn!(incident_id = %incident.incident_id, error = %e, "Prover failed, rolling back");
                incident.abort_generation();
                self.store
                    .update_incident(&incident, ProofStatus::Generating)
                    .await?;
                Err(ServiceError::ProofGeneration {
                    incident_id: incident.incident_id,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Re-run the prover for incidents left in `Generating`, e.g. after a
    /// restart interrupted a background job. Returns how many were resumed.
    #[instrument(skip(self))]
    pub async fn resume_interrupted(&self) -> Result<usize> {
        let stuck: Vec<Incident> = self
            .store
            .list_incidents()
            .await?
            .into_iter()
            .filter(|i| i.proof_status == ProofStatus::Generating)
            .collect();

        let mut resumed = 0;
        for incident in stuck {
            let incident_id = incident.incident_id.clone();
            match self.run_generation(incident).await {
                Ok(_) => resumed += 1,
                Err(e) => warn!(incident_id = %incident_id, error = %e, "Could not resume proof generation"),
            }
        }

        if resumed > 0 {
            info!(resumed, "Resumed interrupted proof generation");
        }
        Ok(resumed)
    }

    // ========================================================================
    // Insurer operations
    // ========================================================================

    /// Insurer portfolio: every company with its count of visible incidents
    #[instrument(skip(self))]
    pub async fn portfolio(&self) -> Result<Vec<PortfolioEntry>> {
        let companies = self.store.list_companies().await?;
        let incidents = self.store.list_incidents().await?;

        Ok(companies
            .into_iter()
            .map(|company| {
                let incident_count = incidents
                    .iter()
                    .filter(|i| {
                        i.company_id == company.company_id
                            && is_visible(Role::Insurer, i.proof_status)
                    })
                    .count() as u64;
                PortfolioEntry {
                    company_id: company.company_id,
                    company_name: company.company_name,
                    incident_count,
                }
            })
            .collect())
    }

    /// Insurer-visible incidents of one company
    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn company_incidents(&self, company_id: &CompanyId) -> Result<Vec<IncidentSummary>> {
        self.require_company(company_id).await?;
        let incidents = self.store.list_company_incidents(company_id).await?;
        Ok(incidents
            .iter()
            .filter(|i| is_visible(Role::Insurer, i.proof_status))
            .map(Incident::summary)
            .collect())
    }

    /// Insurer view of one incident. Incidents that still need a proof are
    /// reported as not found.
    #[instrument(skip(self), fields(company_id = %company_id, incident_id = %incident_id))]
    pub async fn company_incident_details(
        &self,
        company_id: &CompanyId,
        incident_id: &IncidentId,
    ) -> Result<Incident> {
        self.require_company(company_id).await?;
        let incident = self.load_scoped(company_id, incident_id).await?;
        if !is_visible(Role::Insurer, incident.proof_status) {
            return Err(ServiceError::IncidentNotFound(incident_id.clone()));
        }
        Ok(incident)
    }

    /// Verify a generated proof and settle its transaction
    #[instrument(skip(self), fields(company_id = %company_id, incident_id = %incident_id))]
    pub async fn verify_proof(
        &self,
        company_id: &CompanyId,
        incident_id: &IncidentId,
    ) -> Result<ProofStatus> {
        self.require_company(company_id).await?;
        let incident = self.load_scoped(company_id, incident_id).await?;

        let proof = match (&incident.proof_status, &incident.proof) {
            (ProofStatus::NotVerified, Some(proof)) => proof.clone(),
            _ => return Err(invalid(&incident, LifecycleAction::VerifyProof)),
        };

        if !self.prover.verify(&incident, &proof).await? {
            warn!("Proof rejected by verifier");
            return Err(ServiceError::ProofRejected {
                incident_id: incident_id.clone(),
                reason: "proof does not match incident commitment".to_string(),
            });
        }

        let mut verified = incident.clone();
        verified.mark_verified()?;
        if let Err(e) = verified.settle_transaction(true) {
            debug!(error = %e, "No pending transaction to settle");
        }

        if !self
            .store
            .update_incident(&verified, ProofStatus::NotVerified)
            .await?
        {
            let current = self.load(incident_id).await?;
            return match current.proof_status {
                ProofStatus::Verified => Ok(ProofStatus::Verified),
                _ => Err(invalid(&current, LifecycleAction::VerifyProof)),
            };
        }

        info!("Proof verified");
        Ok(verified.proof_status)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn load(&self, incident_id: &IncidentId) -> Result<Incident> {
        self.store
            .get_incident(incident_id)
            .await?
            .ok_or_else(|| ServiceError::IncidentNotFound(incident_id.clone()))
    }

    async fn load_scoped(
        &self,
        company_id: &CompanyId,
        incident_id: &IncidentId,
    ) -> Result<Incident> {
        let incident = self.load(incident_id).await?;
        if &incident.company_id != company_id {
            return Err(ServiceError::IncidentNotFound(incident_id.clone()));
        }
        Ok(incident)
    }

    async fn require_company(&self, company_id: &CompanyId) -> Result<()> {
        match self.store.get_company(company_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::CompanyNotFound(company_id.clone())),
        }
    }
}

fn invalid(incident: &Incident, action: LifecycleAction) -> ServiceError {
    ServiceError::Lifecycle(LifecycleError::InvalidTransition {
        incident_id: incident.incident_id.clone(),
        action,
        from: incident.proof_status,
    })
}

// ============================================================================
// Tests
// ============================================================================
