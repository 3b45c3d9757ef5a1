//! Session-scoped incident dashboard
//!
//! Wraps [`ApiClient`] with the lifecycle rules the backend also enforces:
//! role gating runs against the incident as last fetched, before any
//! request goes out. Each transition holds an in-flight guard for its
//! duration and invalidates the cached views it may have changed, so the
//! next read re-fetches.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::cache::{CacheStats, CachedQuery, QueryCache, QueryKey};
use super::config::ClientConfig;
use super::error::{ClientError, Result};
use super::http::ApiClient;
use super::inflight::InFlightTracker;
use super::mappers::{
    map_incident_detail, map_incident_summaries, map_portfolio, map_proof_status_response,
};
use crate::domain::{
    authorize, CompanyId, HexDigest, Incident, IncidentId, IncidentSummary, LifecycleAction,
    LifecycleError, PortfolioEntry, ProofStatus, Role, Session,
};

pub struct IncidentDashboard {
    api: ApiClient,
    cache: QueryCache,
    inflight: Arc<InFlightTracker>,
    session: Session,
    config: ClientConfig,
}

impl IncidentDashboard {
    pub fn new(config: ClientConfig, session: Session) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(&config)?,
            cache: QueryCache::new(config.cache_ttl),
            inflight: InFlightTracker::new(),
            session,
            config,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Switch role or company. Cached views belong to the old session and
    /// are dropped.
    pub async fn set_session(&mut self, session: Session) {
        self.session = session;
        self.cache.clear().await;
    }

    pub fn cache_stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    pub fn in_flight(&self) -> &Arc<InFlightTracker> {
        &self.inflight
    }

    fn scoped_company(&self) -> Result<&CompanyId> {
        self.session.company_id.as_ref().ok_or_else(|| {
            ClientError::Configuration("insurer session has no company selected".to_string())
        })
    }

    fn incident_key(&self, incident_id: &IncidentId) -> Result<QueryKey> {
        Ok(match self.session.role {
            Role::Policyholder => QueryKey::Incident(incident_id.clone()),
            Role::Insurer => {
                QueryKey::CompanyIncident(self.scoped_company()?.clone(), incident_id.clone())
            }
        })
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Incidents visible to the session. Insurers see the selected company
    /// only, and never incidents still awaiting a proof.
    #[instrument(skip(self), fields(role = %self.session.role))]
    pub async fn list_incidents(&self) -> Result<Vec<IncidentSummary>> {
        let key = match self.session.role {
            Role::Policyholder => QueryKey::Incidents,
            Role::Insurer => QueryKey::CompanyIncidents(self.scoped_company()?.clone()),
        };

        if let Some(items) = self.cache.summaries(&key).await {
            return Ok(items);
        }

        let raw = match &key {
            QueryKey::CompanyIncidents(company_id) => self.api.company_incidents(company_id).await?,
            _ => self.api.list_incidents().await?,
        };

        let items: Vec<IncidentSummary> = map_incident_summaries(raw)?
            .into_iter()
            .filter(|item| self.session.can_see(item.proof_status))
            .collect();

        debug!(count = items.len(), "Fetched incident list");
        self.cache
            .insert(key, CachedQuery::Summaries(items.clone()))
            .await;
        Ok(items)
    }

    /// Incident detail, from cache when fresh
    #[instrument(skip(self), fields(role = %self.session.role))]
    pub async fn incident(&self, incident_id: &IncidentId) -> Result<Incident> {
        let key = self.incident_key(incident_id)?;
        if let Some(incident) = self.cache.incident(&key).await {
            return Ok(incident);
        }
        self.fetch_incident(key).await
    }

    /// Incident detail straight from the backend
    pub async fn refresh_incident(&self, incident_id: &IncidentId) -> Result<Incident> {
        let key = self.incident_key(incident_id)?;
        self.fetch_incident(key).await
    }

    async fn fetch_incident(&self, key: QueryKey) -> Result<Incident> {
        let raw = match &key {
            QueryKey::CompanyIncident(company_id, incident_id) => {
                self.api
                    .company_incident_details(company_id, incident_id)
                    .await?
            }
            QueryKey::Incident(incident_id) => self.api.incident_details(incident_id).await?,
            other => {
                return Err(ClientError::Configuration(format!(
                    "{other:?} is not an incident view"
                )))
            }
        };

        let incident = map_incident_detail(raw)?;
        if !self.session.can_see(incident.proof_status) {
            return Err(LifecycleError::NotVisible {
                incident_id: incident.incident_id,
                role: self.session.role,
            }
            .into());
        }

        self.cache
            .insert(key, CachedQuery::Incident(incident.clone()))
            .await;
        Ok(incident)
    }

    /// Insurer portfolio: companies with their visible incident counts
    #[instrument(skip(self))]
    pub async fn portfolio(&self) -> Result<Vec<PortfolioEntry>> {
        if let Some(items) = self.cache.portfolio().await {
            return Ok(items);
        }

        let items = map_portfolio(self.api.portfolio().await?);
        self.cache
            .insert(QueryKey::Portfolio, CachedQuery::Portfolio(items.clone()))
            .await;
        Ok(items)
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Request a proof for `incident` as last seen by this session.
    ///
    /// Returns the re-fetched incident, which is `NotVerified` once the
    /// backend has finished or `Generating` while it is still working.
    #[instrument(skip(self, incident), fields(incident_id = %incident.incident_id))]
    pub async fn generate_proof(&self, incident: &Incident) -> Result<Incident> {
        authorize(&self.session, LifecycleAction::GenerateProof, incident)?;
        let _guard = self
            .inflight
            .acquire(LifecycleAction::GenerateProof, &incident.incident_id)?;

        let response = self.api.generate_proof(&incident.incident_id).await;
        self.cache.invalidate_incident(&incident.incident_id).await;
        let (_, status) = map_proof_status_response(response?)?;

        info!(status = %status, "Proof generation requested");
        self.refresh_incident(&incident.incident_id).await
    }

    /// Verify the proof of `incident` as last seen by this session.
    ///
    /// Only an insurer may verify, and only a `NotVerified` incident of the
    /// company the session is scoped to.
    #[instrument(skip(self, incident), fields(incident_id = %incident.incident_id))]
    pub async fn verify_proof(&self, incident: &Incident) -> Result<Incident> {
        authorize(&self.session, LifecycleAction::VerifyProof, incident)?;
        let company_id = self
            .session
            .company_id
            .clone()
            .unwrap_or_else(|| incident.company_id.clone());

        let _guard = self
            .inflight
            .acquire(LifecycleAction::VerifyProof, &incident.incident_id)?;

        let response = self
            .api
            .verify_proof(&company_id, &incident.incident_id)
            .await;
        self.cache.invalidate_incident(&incident.incident_id).await;
        let (_, status) = map_proof_status_response(response?)?;

        info!(status = %status, company_id = %company_id, "Proof verified");
        let key = QueryKey::CompanyIncident(company_id, incident.incident_id.clone());
        self.fetch_incident(key).await
    }

    /// Poll until the incident leaves `Generating`.
    #[instrument(skip(self))]
    pub async fn wait_for_proof(&self, incident_id: &IncidentId) -> Result<Incident> {
        for attempt in 0..self.config.poll_attempts {
            let incident = self.refresh_incident(incident_id).await?;
            if incident.proof_status != ProofStatus::Generating {
                return Ok(incident);
            }
            debug!(attempt, "Proof still generating");
            tokio::time::sleep(self.config.poll_interval).await;
        }
        Err(ClientError::PollTimeout(incident_id.clone()))
    }

    // ========================================================================
    // Links
    // ========================================================================

    /// Explorer page for a proof transaction
    pub fn explorer_url(&self, transaction_hash: &HexDigest) -> String {
        format!(
            "{}/{}",
            self.config.explorer_url.trim_end_matches('/'),
            transaction_hash
        )
    }

    /// Downloadable proof document, once a proof exists
    pub fn proof_json_url(&self, incident: &Incident) -> Option<String> {
        incident
            .proof
            .as_ref()
            .map(|proof| proof.json_url(&incident.incident_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    // Nothing listens here; any request would fail with a network error.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn dashboard(session: Session) -> IncidentDashboard {
        let config = ClientConfig::default()
            .with_base_url(UNREACHABLE)
            .with_timeout(Duration::from_millis(200));
        IncidentDashboard::new(config, session).unwrap()
    }

    fn incident(status: ProofStatus) -> Incident {
        let mut incident = Incident::new(
            "INC-100".into(),
            "acme".into(),
            HexDigest::from_bytes([7; 32]),
            Utc::now(),
        );
        incident.proof_status = status;
        incident
    }

    #[tokio::test]
    async fn test_insurer_verify_on_need_proof_is_local() {
        let dash = dashboard(Session::insurer().with_company("acme"));
        let err = dash
            .verify_proof(&incident(ProofStatus::NeedProof))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Lifecycle(LifecycleError::NotVisible { .. })
        ));
    }

    #[tokio::test]
    async fn test_policyholder_cannot_verify() {
        let dash = dashboard(Session::policyholder());
        let err = dash
            .verify_proof(&incident(ProofStatus::NotVerified))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Lifecycle(LifecycleError::RoleNotPermitted { .. })
        ));
    }

    #[tokio::test]
    async fn test_generate_from_wrong_state_is_local() {
        let dash = dashboard(Session::policyholder());
        for status in [
            ProofStatus::Generating,
            ProofStatus::NotVerified,
            ProofStatus::Verified,
        ] {
            let err = dash.generate_proof(&incident(status)).await.unwrap_err();
            assert!(matches!(
                err,
                ClientError::Lifecycle(LifecycleError::InvalidTransition { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_duplicate_generate_is_refused() {
        let dash = dashboard(Session::policyholder());
        let target = incident(ProofStatus::NeedProof);
        let _held = dash
            .in_flight()
            .acquire(LifecycleAction::GenerateProof, &target.incident_id)
            .unwrap();

        let err = dash.generate_proof(&target).await.unwrap_err();
        assert!(matches!(err, ClientError::InFlight { .. }));
    }

    #[tokio::test]
    async fn test_guard_released_after_failed_request() {
        let dash = dashboard(Session::policyholder());
        let target = incident(ProofStatus::NeedProof);

        let err = dash.generate_proof(&target).await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
        assert_eq!(dash.in_flight().active_count(), 0);
    }

    #[tokio::test]
    async fn test_insurer_listing_needs_company() {
        let dash = dashboard(Session::insurer());
        assert!(matches!(
            dash.list_incidents().await,
            Err(ClientError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_links() {
        let dash = dashboard(Session::policyholder());
        let tx = HexDigest::from_bytes([0xab; 32]);
        assert_eq!(
            dash.explorer_url(&tx),
            format!("https://devnet.aztecscan.xyz/tx-effects/{tx}")
        );
        assert_eq!(dash.proof_json_url(&incident(ProofStatus::NeedProof)), None);
    }
}
