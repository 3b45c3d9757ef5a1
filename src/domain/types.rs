//! Core identifier and digest types for Protectorium
//!
//! Incident and company identifiers are opaque strings assigned by the
//! detection system. Commitments, proof hashes and transaction hashes are
//! fixed-format 32-byte digests rendered as `0x`-prefixed lowercase hex.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 32-byte hash (SHA-256)
pub type Hash256 = [u8; 32];

/// Opaque incident identifier, unique and stable across roles
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(pub String);

impl IncidentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IncidentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for IncidentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Company identifier (the policyholder organisation that owns incidents)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub String);

impl CompanyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CompanyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CompanyId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Error parsing a hex digest
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Fixed-format 32-byte digest, displayed as `0x` + 64 lowercase hex chars
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HexDigest(#[serde(with = "hash256_hex_0x")] pub Hash256);

impl HexDigest {
    pub fn from_bytes(bytes: Hash256) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &Hash256 {
        &self.0
    }

    /// Shortened form used in list views, e.g. `0x3f21b293…`
    pub fn preview(&self) -> String {
        format!("0x{}…", &hex::encode(self.0)[..8])
    }
}

impl fmt::Display for HexDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for HexDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexDigest({self})")
    }
}

impl FromStr for HexDigest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_str = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(hex_str).map_err(|e| DigestParseError::InvalidHex(e.to_string()))?;
        let len = bytes.len();
        let arr: Hash256 = bytes
            .try_into()
            .map_err(|_| DigestParseError::InvalidLength(len))?;
        Ok(Self(arr))
    }
}

/// Serde module for Hash256 with 0x prefix
pub mod hash256_hex_0x {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let hex_str = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(hex_str).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes for Hash256"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_display_is_prefixed_lowercase() {
        let digest = HexDigest::from_bytes([0xAB; 32]);
        let s = digest.to_string();
        assert!(s.starts_with("0x"));
        assert_eq!(s.len(), 66);
        assert_eq!(s, s.to_lowercase());
    }

    #[test]
    fn test_digest_parse_accepts_missing_prefix() {
        let with_prefix: HexDigest = format!("0x{}", "11".repeat(32)).parse().unwrap();
        let without_prefix: HexDigest = "11".repeat(32).parse().unwrap();
        assert_eq!(with_prefix, without_prefix);
    }

    #[test]
    fn test_digest_parse_rejects_wrong_length() {
        let err = "0xabc1230001".parse::<HexDigest>().unwrap_err();
        assert_eq!(err, DigestParseError::InvalidLength(5));
    }

    #[test]
    fn test_digest_parse_rejects_non_hex() {
        let err = format!("0x{}", "zz".repeat(32)).parse::<HexDigest>().unwrap_err();
        assert!(matches!(err, DigestParseError::InvalidHex(_)));
    }

    #[test]
    fn test_digest_json_shape() {
        let digest = HexDigest::from_bytes([1; 32]);
        let json = serde_json::to_value(digest).unwrap();
        assert_eq!(json, serde_json::json!(format!("0x{}", "01".repeat(32))));
    }

    #[test]
    fn test_preview() {
        let digest = HexDigest::from_bytes([0x3f; 32]);
        assert_eq!(digest.preview(), "0x3f3f3f3f…");
    }
}
