//! Deterministic hashing with domain separation
//!
//! Every preimage starts with a fixed domain prefix so that digests produced
//! for different purposes can never collide. Strings are length-prefixed.

use sha2::{Digest, Sha256};

use crate::domain::HexDigest;

// ============================================================================
// Domain Separation Constants
// ============================================================================

/// Domain prefix for incident commitments
pub const DOMAIN_INCIDENT_COMMITMENT: &[u8] = b"PROTECTORIUM_INCIDENT_COMMITMENT_V1";

/// Domain prefix for proof hashes produced by the local proof engine
pub const DOMAIN_PROOF_HASH: &[u8] = b"PROTECTORIUM_PROOF_HASH_V1";

/// Domain prefix for proof transaction hashes
pub const DOMAIN_PROOF_TX: &[u8] = b"PROTECTORIUM_PROOF_TX_V1";

// ============================================================================
// Binary Encoding Helpers
// ============================================================================

/// Encode a u32 as 4 bytes big-endian
#[inline]
pub fn u32_be(n: u32) -> [u8; 4] {
    n.to_be_bytes()
}

/// Encode a string as length-prefixed UTF-8 bytes
/// Format: U32_BE(len) || UTF8_bytes
pub fn encode_string(s: &str) -> Vec<u8> {
    let utf8_bytes = s.as_bytes();
    let mut result = Vec::with_capacity(4 + utf8_bytes.len());
    result.extend_from_slice(&u32_be(utf8_bytes.len() as u32));
    result.extend_from_slice(utf8_bytes);
    result
}

// ============================================================================
// Incident hashes
// ============================================================================

/// Commitment over the detected incident data
///
/// ```text
/// SHA256(DOMAIN_INCIDENT_COMMITMENT || ENC_STR(incident_id) ||
///        ENC_STR(company_id) || ENC_STR(detected_at) || U32_BE(event_count))
/// ```
pub fn compute_incident_commitment(
    incident_id: &str,
    company_id: &str,
    detected_at_rfc3339: &str,
    event_count: u32,
) -> HexDigest {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_INCIDENT_COMMITMENT);
    hasher.update(encode_string(incident_id));
    hasher.update(encode_string(company_id));
    hasher.update(encode_string(detected_at_rfc3339));
    hasher.update(u32_be(event_count));
    HexDigest::from_bytes(hasher.finalize().into())
}

/// Hash binding a proof to its commitment and public inputs
pub fn compute_proof_hash(
    commitment: &HexDigest,
    incident_id: &str,
    public_inputs: &[String],
) -> HexDigest {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_PROOF_HASH);
    hasher.update(commitment.as_bytes());
    hasher.update(encode_string(incident_id));
    hasher.update(u32_be(public_inputs.len() as u32));
    for input in public_inputs {
        hasher.update(encode_string(input));
    }
    HexDigest::from_bytes(hasher.finalize().into())
}

/// Transaction hash for posting `proof_hash` on-chain
pub fn compute_transaction_hash(proof_hash: &HexDigest, incident_id: &str) -> HexDigest {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_PROOF_TX);
    hasher.update(proof_hash.as_bytes());
    hasher.update(encode_string(incident_id));
    HexDigest::from_bytes(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_string() {
        assert_eq!(encode_string("ab"), vec![0, 0, 0, 2, b'a', b'b']);
    }

    #[test]
    fn test_commitment_is_deterministic() {
        let a = compute_incident_commitment("INC-1", "acme", "2025-11-23T00:00:00Z", 12);
        let b = compute_incident_commitment("INC-1", "acme", "2025-11-23T00:00:00Z", 12);
        assert_eq!(a, b);
    }

    #[test]
    fn test_commitment_changes_with_inputs() {
        let a = compute_incident_commitment("INC-1", "acme", "2025-11-23T00:00:00Z", 12);
        let b = compute_incident_commitment("INC-1", "acme", "2025-11-23T00:00:00Z", 13);
        let c = compute_incident_commitment("INC-2", "acme", "2025-11-23T00:00:00Z", 12);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_length_prefix_prevents_ambiguity() {
        let a = compute_incident_commitment("ab", "c", "t", 0);
        let b = compute_incident_commitment("a", "bc", "t", 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_domains_are_separated() {
        let commitment = HexDigest::from_bytes([9; 32]);
        let proof = compute_proof_hash(&commitment, "INC-1", &[]);
        let tx = compute_transaction_hash(&commitment, "INC-1");
        assert_ne!(proof, tx);
    }
}
