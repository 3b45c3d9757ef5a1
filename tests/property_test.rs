//! Property-based tests using proptest.
//!
//! These tests verify lifecycle invariants that should hold for any
//! sequence of actions and any role.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use protectorium::api::types::{IncidentDetailResponse, IncidentListItem};
use protectorium::client::mappers::{map_incident_detail, map_incident_summary};
use protectorium::crypto::compute_incident_commitment;
use protectorium::domain::{
    authorize, can_generate, can_verify, is_visible, HexDigest, Incident, LifecycleAction,
    ProofArtifact, ProofStatus, Role, Session,
};

// ============================================================================
// Custom Strategies
// ============================================================================

fn arb_status() -> impl Strategy<Value = ProofStatus> {
    prop::sample::select(ProofStatus::ALL.to_vec())
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Policyholder), Just(Role::Insurer)]
}

fn arb_hash256() -> impl Strategy<Value = [u8; 32]> {
    any::<[u8; 32]>()
}

/// Lifecycle steps applied blindly to an incident
#[derive(Debug, Clone, Copy)]
enum Step {
    Begin,
    Complete,
    Abort,
    Verify,
    Settle(bool),
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Begin),
        Just(Step::Complete),
        Just(Step::Abort),
        Just(Step::Verify),
        any::<bool>().prop_map(Step::Settle),
    ]
}

fn fresh_incident(id: &str, company: &str, events: u32) -> Incident {
    let detected_at = Utc.with_ymd_and_hms(2025, 11, 23, 9, 0, 0).single().unwrap();
    let commitment = compute_incident_commitment(id, company, &detected_at.to_rfc3339(), events);
    Incident::new(id.into(), company.into(), commitment, detected_at)
}

fn artifact(seed: [u8; 32]) -> ProofArtifact {
    ProofArtifact {
        proof_hash: HexDigest::from_bytes(seed),
        public_inputs: vec!["0x01".to_string()],
        transaction_hash: HexDigest::from_bytes([seed[0] ^ 0xff; 32]),
    }
}

fn rank(status: ProofStatus) -> u8 {
    match status {
        ProofStatus::NeedProof => 0,
        ProofStatus::Generating => 1,
        ProofStatus::NotVerified => 2,
        ProofStatus::Verified => 3,
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_proof_presence_invariant_holds(
        steps in prop::collection::vec(arb_step(), 0..24),
        seed in arb_hash256(),
    ) {
        let mut incident = fresh_incident("INC-100", "acme", 12);
        let commitment = incident.commitment;
        let mut verified = false;

        for step in steps {
            let before = incident.proof_status;
            let result = match step {
                Step::Begin => incident.begin_generation().is_ok(),
                Step::Complete => incident.complete_generation(artifact(seed)).is_ok(),
                Step::Abort => { incident.abort_generation(); true }
                Step::Verify => incident.mark_verified().is_ok(),
                Step::Settle(ok) => incident.settle_transaction(ok).is_ok(),
            };

            prop_assert!(incident.is_consistent());
            prop_assert_eq!(incident.commitment, commitment);

            // A rejected step leaves the status alone
            if !result {
                prop_assert_eq!(incident.proof_status, before);
            }

            // Verified is terminal
            if verified {
                prop_assert_eq!(incident.proof_status, ProofStatus::Verified);
            }
            verified = incident.proof_status == ProofStatus::Verified;

            // Only abort moves backwards, and only out of Generating
            if rank(incident.proof_status) < rank(before) {
                prop_assert_eq!(before, ProofStatus::Generating);
                prop_assert_eq!(incident.proof_status, ProofStatus::NeedProof);
            }
        }
    }

    #[test]
    fn prop_authorize_matches_predicates(
        status in arb_status(),
        role in arb_role(),
    ) {
        let mut incident = fresh_incident("INC-7", "acme", 1);
        incident.proof_status = status;
        let session = Session::new(role).with_company("acme");

        let generate = authorize(&session, LifecycleAction::GenerateProof, &incident).is_ok();
        let verify = authorize(&session, LifecycleAction::VerifyProof, &incident).is_ok();

        prop_assert_eq!(generate, can_generate(role, status) && is_visible(role, status));
        prop_assert_eq!(verify, can_verify(role, status));
        prop_assert_eq!(verify, role == Role::Insurer && status == ProofStatus::NotVerified);
    }

    #[test]
    fn prop_insurer_never_sees_need_proof(statuses in prop::collection::vec(arb_status(), 0..32)) {
        let session = Session::insurer();
        let visible: Vec<_> = statuses.into_iter().filter(|s| session.can_see(*s)).collect();
        prop_assert!(visible.iter().all(|s| *s != ProofStatus::NeedProof));
    }

    #[test]
    fn prop_commitment_is_fixed_format(
        id in "[A-Za-z0-9-]{1,32}",
        company in "[a-z]{1,16}",
        events in any::<u32>(),
    ) {
        let incident = fresh_incident(&id, &company, events);
        let text = incident.commitment.to_string();

        prop_assert_eq!(text.len(), 66);
        prop_assert!(text.starts_with("0x"));
        prop_assert!(text[2..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        prop_assert_eq!(text.parse::<HexDigest>().unwrap(), incident.commitment);
    }

    #[test]
    fn prop_detail_wire_format_preserves_incident(
        status in arb_status(),
        seed in arb_hash256(),
    ) {
        let mut incident = fresh_incident("INC-42", "acme", 5).with_company_name("Acme Corp");
        if status != ProofStatus::NeedProof {
            incident.begin_generation().unwrap();
        }
        if status.has_proof() {
            incident.complete_generation(artifact(seed)).unwrap();
        }
        if status == ProofStatus::Verified {
            incident.mark_verified().unwrap();
        }

        let wire = IncidentDetailResponse::from(&incident);
        let json = serde_json::to_string(&wire).unwrap();
        let decoded: IncidentDetailResponse = serde_json::from_str(&json).unwrap();
        let mapped = map_incident_detail(decoded).unwrap();

        prop_assert_eq!(mapped, incident);
    }

    #[test]
    fn prop_unknown_status_strings_are_rejected(raw in "[A-Z_]{1,20}") {
        let item = IncidentListItem {
            incident_id: "INC-1".to_string(),
            detected_at: "2025-11-23T09:00:00Z".to_string(),
            proof_status: raw,
        };
        prop_assert!(map_incident_summary(item).is_err());
    }
}
