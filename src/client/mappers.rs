//! Response-shape mappers: wire types into domain values.
//!
//! Every enum-valued string is matched exhaustively; unknown values are
//! decode errors rather than silently defaulted.

use chrono::{DateTime, NaiveDateTime, Utc};

use super::error::{ClientError, Result};
use crate::api::types::{
    IncidentDetailResponse, IncidentListItem, PortfolioItem, ProofStatusResponse,
    BLOCKCHAIN_STATUS_NONE,
};
use crate::domain::{
    BlockchainStatus, CompanyId, HexDigest, Incident, IncidentId, IncidentSummary,
    PortfolioEntry, ProofStatus, ProofSummary, Severity,
};

fn decode(field: &str, reason: impl std::fmt::Display) -> ClientError {
    ClientError::Decode(format!("{field}: {reason}"))
}

pub fn map_proof_status(raw: &str) -> Result<ProofStatus> {
    raw.parse().map_err(|e| decode("proof_status", e))
}

/// `none` (or absent) means no transaction on record
pub fn map_blockchain_status(raw: Option<&str>) -> Result<Option<BlockchainStatus>> {
    match raw {
        None | Some(BLOCKCHAIN_STATUS_NONE) => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|e| decode("blockchain_status", e)),
    }
}

/// RFC 3339, or a naive timestamp taken as UTC
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| decode("detected_at", e))
}

fn parse_digest(field: &str, raw: &str) -> Result<HexDigest> {
    raw.parse().map_err(|e| decode(field, e))
}

pub fn map_incident_summary(item: IncidentListItem) -> Result<IncidentSummary> {
    Ok(IncidentSummary {
        incident_id: IncidentId::new(item.incident_id),
        detected_at: parse_timestamp(&item.detected_at)?,
        proof_status: map_proof_status(&item.proof_status)?,
    })
}

pub fn map_incident_summaries(items: Vec<IncidentListItem>) -> Result<Vec<IncidentSummary>> {
    items.into_iter().map(map_incident_summary).collect()
}

/// Map a detail response, enforcing that a proof is present exactly when
/// the status says one exists.
pub fn map_incident_detail(detail: IncidentDetailResponse) -> Result<Incident> {
    let proof_status = map_proof_status(&detail.proof_status)?;
    let commitment = parse_digest("commitment", &detail.commitment)?;
    let blockchain_status = map_blockchain_status(detail.blockchain_status.as_deref())?;

    let proof = match (proof_status.has_proof(), detail.proof_summary) {
        (true, Some(summary)) => {
            let tx = summary
                .transaction_hash
                .as_deref()
                .or(detail.transaction_hash.as_deref())
                .map(|h| parse_digest("transaction_hash", h))
                .transpose()?;
            Some(ProofSummary {
                proof_hash: parse_digest("proof_hash", &summary.proof_hash)?,
                public_inputs: summary.public_inputs,
                commitment: parse_digest("proof_summary.commitment", &summary.commitment)?,
                transaction_hash: tx,
                blockchain_status,
            })
        }
        (true, None) => {
            return Err(ClientError::Decode(format!(
                "incident {} is {} but carries no proof_summary",
                detail.incident_id, proof_status
            )))
        }
        // Transient or pre-proof states never expose a proof
        (false, _) => None,
    };

    let severity = detail
        .severity
        .as_deref()
        .map(str::parse::<Severity>)
        .transpose()
        .map_err(|e| decode("severity", e))?;

    Ok(Incident {
        incident_id: IncidentId::new(detail.incident_id),
        company_id: CompanyId::new(detail.company_id),
        company_name: detail.company_name,
        detected_at: parse_timestamp(&detail.detected_at)?,
        commitment,
        proof_status,
        proof,
        severity,
        event_count: detail.event_count,
        agent_version: detail.agent_version,
    })
}

pub fn map_portfolio(items: Vec<PortfolioItem>) -> Vec<PortfolioEntry> {
    items
        .into_iter()
        .map(|item| PortfolioEntry {
            company_id: CompanyId::new(item.company_id),
            company_name: item.company_name,
            incident_count: item.incident_count,
        })
        .collect()
}

pub fn map_proof_status_response(response: ProofStatusResponse) -> Result<(IncidentId, ProofStatus)> {
    Ok((
        IncidentId::new(response.incident_id),
        map_proof_status(&response.proof_status)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::ProofSummaryDto;

    fn hex(b: u8) -> String {
        HexDigest::from_bytes([b; 32]).to_string()
    }

    fn detail(status: &str, proof: Option<ProofSummaryDto>) -> IncidentDetailResponse {
        IncidentDetailResponse {
            incident_id: "INC-100".to_string(),
            company_id: "acme".to_string(),
            company_name: Some("Acme Corp".to_string()),
            detected_at: "2025-11-23T09:00:00Z".to_string(),
            commitment: hex(1),
            proof_status: status.to_string(),
            transaction_hash: proof.as_ref().and_then(|p| p.transaction_hash.clone()),
            blockchain_status: Some(if proof.is_some() { "pending" } else { "none" }.to_string()),
            proof_summary: proof,
            severity: Some("critical".to_string()),
            event_count: Some(256),
            agent_version: Some("1.1.0".to_string()),
        }
    }

    fn proof() -> ProofSummaryDto {
        ProofSummaryDto {
            proof_hash: hex(2),
            public_inputs: vec!["0x01".to_string(), "0x02".to_string()],
            commitment: hex(1),
            transaction_hash: Some(hex(3)),
        }
    }

    #[test]
    fn test_map_detail_with_proof() {
        let incident = map_incident_detail(detail("not_verified", Some(proof()))).unwrap();
        assert_eq!(incident.proof_status, ProofStatus::NotVerified);
        assert!(incident.is_consistent());
        let p = incident.proof.unwrap();
        assert_eq!(p.blockchain_status, Some(BlockchainStatus::Pending));
        assert_eq!(p.transaction_hash, Some(HexDigest::from_bytes([3; 32])));
        assert_eq!(incident.severity, Some(Severity::Critical));
    }

    #[test]
    fn test_map_detail_requires_proof() {
        let err = map_incident_detail(detail("verified", None)).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_generating_hides_proof() {
        let incident = map_incident_detail(detail("generating", Some(proof()))).unwrap();
        assert!(incident.proof.is_none());
        assert!(incident.is_consistent());
    }

    #[test]
    fn test_unknown_status_is_decode_error() {
        let item = IncidentListItem {
            incident_id: "INC-1".to_string(),
            detected_at: "2025-11-23T09:00:00Z".to_string(),
            proof_status: "PROOF_READY".to_string(),
        };
        assert!(matches!(
            map_incident_summary(item),
            Err(ClientError::Decode(_))
        ));
    }

    #[test]
    fn test_naive_timestamps_are_utc() {
        let ts = parse_timestamp("2025-11-23T09:00:00.123456").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-11-23T09:00:00.123456+00:00");
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_blockchain_status_values() {
        assert_eq!(map_blockchain_status(Some("none")).unwrap(), None);
        assert_eq!(map_blockchain_status(None).unwrap(), None);
        assert_eq!(
            map_blockchain_status(Some("confirmed")).unwrap(),
            Some(BlockchainStatus::Confirmed)
        );
        assert!(map_blockchain_status(Some("settled")).is_err());
    }
}
