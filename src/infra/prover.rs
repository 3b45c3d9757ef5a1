//! Local proof engine
//!
//! Deterministic stand-in for the external prover. Proofs are hash chains
//! over the incident commitment, so verification can recompute them.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::crypto::{compute_proof_hash, compute_transaction_hash};
use crate::domain::{Incident, ProofArtifact, ProofSummary};
use crate::infra::{ProofEngine, Result};

/// Deterministic local prover and verifier
#[derive(Debug, Clone, Default)]
pub struct LocalProofEngine {
    latency: Duration,
}

impl LocalProofEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate prover latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Public inputs: the commitment and the event count as field elements
    pub fn public_inputs(incident: &Incident) -> Vec<String> {
        vec![
            incident.commitment.to_string(),
            format!("0x{:x}", incident.event_count.unwrap_or(0)),
        ]
    }
}

#[async_trait]
impl ProofEngine for LocalProofEngine {
    async fn generate(&self, incident: &Incident) -> Result<ProofArtifact> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let public_inputs = Self::public_inputs(incident);
        let proof_hash = compute_proof_hash(
            &incident.commitment,
            incident.incident_id.as_str(),
            &public_inputs,
        );
        let transaction_hash = compute_transaction_hash(&proof_hash, incident.incident_id.as_str());

        debug!(
            incident_id = %incident.incident_id,
            proof_hash = %proof_hash.preview(),
            "Generated proof"
        );

        Ok(ProofArtifact {
            proof_hash,
            public_inputs,
            transaction_hash,
        })
    }

    async fn verify(&self, incident: &Incident, proof: &ProofSummary) -> Result<bool> {
        if proof.commitment != incident.commitment {
            return Ok(false);
        }

        let expected = compute_proof_hash(
            &incident.commitment,
            incident.incident_id.as_str(),
            &proof.public_inputs,
        );

        Ok(expected == proof.proof_hash && proof.public_inputs == Self::public_inputs(incident))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HexDigest;
    use chrono::Utc;

    fn incident() -> Incident {
        Incident::new(
            "INC-100".into(),
            "acme".into(),
            HexDigest::from_bytes([5; 32]),
            Utc::now(),
        )
        .with_event_count(42)
    }

    #[tokio::test]
    async fn test_generate_is_deterministic() {
        let engine = LocalProofEngine::new();
        let a = engine.generate(&incident()).await.unwrap();
        let b = engine.generate(&incident()).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.public_inputs[1], "0x2a");
    }

    #[tokio::test]
    async fn test_generated_proof_verifies() {
        let engine = LocalProofEngine::new();
        let incident = incident();
        let artifact = engine.generate(&incident).await.unwrap();
        let summary = ProofSummary::from_artifact(artifact, incident.commitment);
        assert!(engine.verify(&incident, &summary).await.unwrap());
    }

    #[tokio::test]
    async fn test_tampered_proof_rejected() {
        let engine = LocalProofEngine::new();
        let incident = incident();
        let artifact = engine.generate(&incident).await.unwrap();

        let mut summary = ProofSummary::from_artifact(artifact, incident.commitment);
        summary.proof_hash = HexDigest::from_bytes([0; 32]);
        assert!(!engine.verify(&incident, &summary).await.unwrap());

        let mut other = incident.clone();
        other.commitment = HexDigest::from_bytes([6; 32]);
        let artifact = engine.generate(&incident).await.unwrap();
        let summary = ProofSummary::from_artifact(artifact, incident.commitment);
        assert!(!engine.verify(&other, &summary).await.unwrap());
    }
}
