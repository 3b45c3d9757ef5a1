//! Demo data
//!
//! Five insured companies and ten incidents covering every proof state.
//! Proofs for already-proven incidents are produced by the configured proof
//! engine so that they verify.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::info;

use crate::crypto::compute_incident_commitment;
use crate::domain::{Company, Incident, ProofStatus, Severity};
use crate::infra::{IncidentStore, ProofEngine, Result, ServiceError};

const COMPANIES: [(&str, &str); 5] = [
    ("techflow", "TechFlow Analytics"),
    ("cloudsync", "CloudSync Ltd."),
    ("rideshare", "RideShare Mobility"),
    ("contenthub", "ContentHub Media"),
    ("webspace", "WebSpace Hosting"),
];

struct SeedIncident {
    company: &'static str,
    status: ProofStatus,
    severity: Severity,
    event_count: u32,
    agent_version: &'static str,
}

const fn seed(
    company: &'static str,
    status: ProofStatus,
    severity: Severity,
    event_count: u32,
    agent_version: &'static str,
) -> SeedIncident {
    SeedIncident {
        company,
        status,
        severity,
        event_count,
        agent_version,
    }
}

const INCIDENTS: [SeedIncident; 10] = [
    seed("techflow", ProofStatus::NeedProof, Severity::Low, 12, "1.0.0"),
    seed("techflow", ProofStatus::Generating, Severity::Medium, 47, "1.0.0"),
    seed("techflow", ProofStatus::Verified, Severity::High, 103, "1.1.0"),
    seed("techflow", ProofStatus::NotVerified, Severity::Critical, 256, "1.1.0"),
    seed("cloudsync", ProofStatus::NeedProof, Severity::Medium, 34, "2.0.0"),
    seed("cloudsync", ProofStatus::Verified, Severity::High, 89, "2.1.0"),
    seed("contenthub", ProofStatus::NeedProof, Severity::Low, 18, "3.0.0"),
    seed("contenthub", ProofStatus::NotVerified, Severity::Medium, 52, "3.1.0"),
    seed("contenthub", ProofStatus::Verified, Severity::High, 131, "3.2.0"),
    seed("webspace", ProofStatus::NeedProof, Severity::Medium, 41, "1.0.5"),
];

/// Day the demo incidents were detected
fn seed_day() -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2025, 11, 23, 9, 0, 0)
        .single()
        .ok_or_else(|| ServiceError::Internal("invalid seed timestamp".to_string()))
}

/// Insert demo data if the store holds no incidents.
///
/// Returns the number of incidents inserted.
pub async fn seed_demo_data(store: &dyn IncidentStore, prover: &dyn ProofEngine) -> Result<usize> {
    if store.count_incidents().await? > 0 {
        info!("Store already populated, skipping demo seed");
        return Ok(0);
    }

    for (id, name) in COMPANIES {
        store.upsert_company(Company::new(id, name)).await?;
    }

    let day = seed_day()?;
    for (n, entry) in INCIDENTS.iter().enumerate() {
        let incident_id = format!("{}-{:04}", day.format("%Y%m%d"), n + 1);
        let detected_at = day + Duration::minutes(37 * n as i64);
        let commitment = compute_incident_commitment(
            &incident_id,
            entry.company,
            &detected_at.to_rfc3339(),
            entry.event_count,
        );

        let mut incident = Incident::new(
            incident_id.into(),
            entry.company.into(),
            commitment,
            detected_at,
        )
        .with_severity(entry.severity)
        .with_event_count(entry.event_count)
        .with_agent_version(entry.agent_version);

        advance(&mut incident, entry.status, prover).await?;
        store.insert_incident(incident).await?;
    }

    info!(
        companies = COMPANIES.len(),
        incidents = INCIDENTS.len(),
        "Seeded demo data"
    );
    Ok(INCIDENTS.len())
}

/// Walk a fresh incident through the lifecycle up to `target`
async fn advance(incident: &mut Incident, target: ProofStatus, prover: &dyn ProofEngine) -> Result<()> {
    if target == ProofStatus::NeedProof {
        return Ok(());
    }

    incident.begin_generation()?;
    if target == ProofStatus::Generating {
        return Ok(());
    }

    let artifact = prover.generate(incident).await?;
    incident.complete_generation(artifact)?;
    if target == ProofStatus::Verified {
        incident.mark_verified()?;
        incident.settle_transaction(true)?;
    }
    Ok(())
}
