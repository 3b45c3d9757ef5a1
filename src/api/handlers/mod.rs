//! REST API handlers organized by role.

pub mod health;
pub mod insurer;
pub mod policyholder;

pub use health::*;
pub use insurer::*;
pub use policyholder::*;

use crate::api::error::{validation_error, ApiError};
use crate::domain::{CompanyId, IncidentId};

/// Longest identifier accepted in a path segment
const MAX_ID_LEN: usize = 64;

fn validate_id(field: &str, raw: &str) -> Result<(), ApiError> {
    if raw.is_empty() || raw.len() > MAX_ID_LEN {
        return Err(validation_error(
            field,
            format!("{field} must be 1-{MAX_ID_LEN} characters"),
        ));
    }
    if !raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(validation_error(
            field,
            format!("{field} contains invalid characters"),
        ));
    }
    Ok(())
}

pub(crate) fn parse_incident_id(raw: String) -> Result<IncidentId, ApiError> {
    validate_id("incident_id", &raw)?;
    Ok(IncidentId::new(raw))
}

pub(crate) fn parse_company_id(raw: String) -> Result<CompanyId, ApiError> {
    validate_id("company_id", &raw)?;
    Ok(CompanyId::new(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorCode;

    #[test]
    fn test_id_validation() {
        assert!(parse_incident_id("20251123-0001".to_string()).is_ok());
        assert!(parse_company_id("techflow".to_string()).is_ok());

        let err = parse_incident_id(String::new()).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidFieldValue);
        assert!(parse_incident_id("a b".to_string()).is_err());
        assert!(parse_company_id("x".repeat(65)).is_err());
    }
}
