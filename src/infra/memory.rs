//! In-memory incident store
//!
//! Used when no `DATABASE_URL` is configured and throughout the tests.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::{Company, CompanyId, Incident, IncidentId, ProofStatus};
use crate::infra::{IncidentStore, Result, ServiceError};

#[derive(Default)]
struct Tables {
    companies: HashMap<CompanyId, Company>,
    incidents: HashMap<IncidentId, Incident>,
}

impl Tables {
    fn resolve(&self, incident: &Incident) -> Incident {
        let mut incident = incident.clone();
        incident.company_name = self
            .companies
            .get(&incident.company_id)
            .map(|c| c.company_name.clone());
        incident
    }

    fn sorted<'a>(&self, incidents: impl Iterator<Item = &'a Incident>) -> Vec<Incident> {
        let mut result: Vec<Incident> = incidents.map(|i| self.resolve(i)).collect();
        result.sort_by(|a, b| {
            a.detected_at
                .cmp(&b.detected_at)
                .then_with(|| a.incident_id.as_str().cmp(b.incident_id.as_str()))
        });
        result
    }
}

/// In-memory incident store for development and testing
pub struct InMemoryIncidentStore {
    tables: RwLock<Tables>,
}

impl InMemoryIncidentStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for InMemoryIncidentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IncidentStore for InMemoryIncidentStore {
    async fn upsert_company(&self, company: Company) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.companies.insert(company.company_id.clone(), company);
        Ok(())
    }

    async fn get_company(&self, company_id: &CompanyId) -> Result<Option<Company>> {
        let tables = self.tables.read().await;
        Ok(tables.companies.get(company_id).cloned())
    }

    async fn list_companies(&self) -> Result<Vec<Company>> {
        let tables = self.tables.read().await;
        let mut companies: Vec<Company> = tables.companies.values().cloned().collect();
        companies.sort_by(|a, b| a.company_id.as_str().cmp(b.company_id.as_str()));
        Ok(companies)
    }

    async fn insert_incident(&self, incident: Incident) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.incidents.contains_key(&incident.incident_id) {
            return Err(ServiceError::DuplicateIncident(incident.incident_id));
        }
        let mut incident = incident;
        incident.company_name = None;
        tables
            .incidents
            .insert(incident.incident_id.clone(), incident);
        Ok(())
    }

    async fn get_incident(&self, incident_id: &IncidentId) -> Result<Option<Incident>> {
        let tables = self.tables.read().await;
        Ok(tables.incidents.get(incident_id).map(|i| tables.resolve(i)))
    }

    async fn list_incidents(&self) -> Result<Vec<Incident>> {
        let tables = self.tables.read().await;
        Ok(tables.sorted(tables.incidents.values()))
    }

    async fn list_company_incidents(&self, company_id: &CompanyId) -> Result<Vec<Incident>> {
        let tables = self.tables.read().await;
        Ok(tables.sorted(
            tables
                .incidents
                .values()
                .filter(|i| &i.company_id == company_id),
        ))
    }

    async fn count_incidents(&self) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables.incidents.len() as u64)
    }

    async fn update_incident(&self, incident: &Incident, expected: ProofStatus) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .incidents
            .get_mut(&incident.incident_id)
            .ok_or_else(|| ServiceError::IncidentNotFound(incident.incident_id.clone()))?;

        if stored.proof_status != expected {
            return Ok(false);
        }

        stored.proof_status = incident.proof_status;
        stored.proof = incident.proof.clone();
        Ok(true)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HexDigest;
    use chrono::{TimeZone, Utc};

    fn incident(id: &str, company: &str, minute: u32) -> Incident {
        Incident::new(
            id.into(),
            company.into(),
            HexDigest::from_bytes([1; 32]),
            Utc.with_ymd_and_hms(2025, 11, 23, 10, minute, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get_resolves_company_name() {
        let store = InMemoryIncidentStore::new();
        store
            .upsert_company(Company::new("acme", "Acme Corp"))
            .await
            .unwrap();
        store.insert_incident(incident("INC-1", "acme", 0)).await.unwrap();

        let fetched = store.get_incident(&"INC-1".into()).await.unwrap().unwrap();
        assert_eq!(fetched.company_name.as_deref(), Some("Acme Corp"));
        assert!(store.get_incident(&"INC-2".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_incident_rejected() {
        let store = InMemoryIncidentStore::new();
        store.insert_incident(incident("INC-1", "acme", 0)).await.unwrap();
        let err = store
            .insert_incident(incident("INC-1", "acme", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateIncident(_)));
    }

    #[tokio::test]
    async fn test_listing_is_ordered_and_scoped() {
        let store = InMemoryIncidentStore::new();
        store.insert_incident(incident("INC-3", "acme", 30)).await.unwrap();
        store.insert_incident(incident("INC-1", "acme", 10)).await.unwrap();
        store.insert_incident(incident("INC-2", "other", 20)).await.unwrap();

        let all: Vec<_> = store
            .list_incidents()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.incident_id.0)
            .collect();
        assert_eq!(all, vec!["INC-1", "INC-2", "INC-3"]);

        let acme = store.list_company_incidents(&"acme".into()).await.unwrap();
        assert_eq!(acme.len(), 2);
        assert_eq!(store.count_incidents().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_is_compare_and_set() {
        let store = InMemoryIncidentStore::new();
        store.insert_incident(incident("INC-1", "acme", 0)).await.unwrap();

        let mut generating = incident("INC-1", "acme", 0);
        generating.begin_generation().unwrap();

        assert!(store
            .update_incident(&generating, ProofStatus::NeedProof)
            .await
            .unwrap());
        // Second writer loses the race
        assert!(!store
            .update_incident(&generating, ProofStatus::NeedProof)
            .await
            .unwrap());

        let stored = store.get_incident(&"INC-1".into()).await.unwrap().unwrap();
        assert_eq!(stored.proof_status, ProofStatus::Generating);
    }

    #[tokio::test]
    async fn test_update_missing_incident() {
        let store = InMemoryIncidentStore::new();
        let err = store
            .update_incident(&incident("INC-404", "acme", 0), ProofStatus::NeedProof)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::IncidentNotFound(_)));
    }
}
