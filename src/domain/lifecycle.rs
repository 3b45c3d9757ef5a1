//! Incident proof lifecycle: roles, sessions, gating predicates and transitions
//!
//! Who may do what:
//!
//! | action          | role                   | from state    |
//! |-----------------|------------------------|---------------|
//! | generate proof  | Policyholder, Insurer  | `NeedProof`   |
//! | verify proof    | Insurer                | `NotVerified` |
//!
//! Insurers never see incidents that are still in `NeedProof`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::incident::{BlockchainStatus, Incident, ProofArtifact, ProofStatus, ProofSummary};
use super::types::{CompanyId, IncidentId};

// ============================================================================
// Roles and sessions
// ============================================================================

/// Dashboard role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Policyholder,
    Insurer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Policyholder => "Policyholder",
            Role::Insurer => "Insurer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "policyholder" => Ok(Role::Policyholder),
            "insurer" => Ok(Role::Insurer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Explicit session context passed to every lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub role: Role,
    /// Connected wallet, if any
    pub wallet_address: Option<String>,
    /// Company the session is scoped to. For insurers this is the portfolio
    /// company currently being reviewed.
    pub company_id: Option<CompanyId>,
}

impl Session {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            wallet_address: None,
            company_id: None,
        }
    }

    pub fn policyholder() -> Self {
        Self::new(Role::Policyholder)
    }

    pub fn insurer() -> Self {
        Self::new(Role::Insurer)
    }

    pub fn with_wallet(mut self, address: impl Into<String>) -> Self {
        self.wallet_address = Some(address.into());
        self
    }

    pub fn with_company(mut self, company_id: impl Into<CompanyId>) -> Self {
        self.company_id = Some(company_id.into());
        self
    }

    pub fn is_wallet_connected(&self) -> bool {
        self.wallet_address.is_some()
    }

    pub fn can_see(&self, status: ProofStatus) -> bool {
        is_visible(self.role, status)
    }

    pub fn can_generate(&self, status: ProofStatus) -> bool {
        can_generate(self.role, status)
    }

    pub fn can_verify(&self, status: ProofStatus) -> bool {
        can_verify(self.role, status)
    }
}

// ============================================================================
// Predicates
// ============================================================================

/// Both roles may trigger generation for incidents they can see.
pub fn can_generate(_role: Role, status: ProofStatus) -> bool {
    status == ProofStatus::NeedProof
}

pub fn can_verify(role: Role, status: ProofStatus) -> bool {
    role == Role::Insurer && status == ProofStatus::NotVerified
}

pub fn is_visible(role: Role, status: ProofStatus) -> bool {
    match role {
        Role::Policyholder => true,
        Role::Insurer => status != ProofStatus::NeedProof,
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Lifecycle actions a session can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    GenerateProof,
    VerifyProof,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleAction::GenerateProof => write!(f, "generate proof"),
            LifecycleAction::VerifyProof => write!(f, "verify proof"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("cannot {action} for incident {incident_id} in state {from}")]
    InvalidTransition {
        incident_id: IncidentId,
        action: LifecycleAction,
        from: ProofStatus,
    },

    #[error("role {role} may not {action}")]
    RoleNotPermitted { role: Role, action: LifecycleAction },

    #[error("incident {incident_id} is not visible to role {role}")]
    NotVisible { incident_id: IncidentId, role: Role },

    #[error("incident {incident_id} belongs to company {actual}, not {expected}")]
    CompanyMismatch {
        incident_id: IncidentId,
        expected: CompanyId,
        actual: CompanyId,
    },

    #[error("incident {incident_id} has no transaction awaiting settlement")]
    NoPendingTransaction { incident_id: IncidentId },
}

/// Check that `session` may perform `action` on `incident`.
///
/// Evaluated before any remote call; the backend re-checks state on its side.
pub fn authorize(
    session: &Session,
    action: LifecycleAction,
    incident: &Incident,
) -> Result<(), LifecycleError> {
    let status = incident.proof_status;

    if !session.can_see(status) {
        return Err(LifecycleError::NotVisible {
            incident_id: incident.incident_id.clone(),
            role: session.role,
        });
    }

    if let Some(expected) = &session.company_id {
        if session.role == Role::Insurer && expected != &incident.company_id {
            return Err(LifecycleError::CompanyMismatch {
                incident_id: incident.incident_id.clone(),
                expected: expected.clone(),
                actual: incident.company_id.clone(),
            });
        }
    }

    let allowed = match action {
        LifecycleAction::GenerateProof => session.can_generate(status),
        LifecycleAction::VerifyProof => {
            if session.role != Role::Insurer {
                return Err(LifecycleError::RoleNotPermitted {
                    role: session.role,
                    action,
                });
            }
            session.can_verify(status)
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition {
            incident_id: incident.incident_id.clone(),
            action,
            from: status,
        })
    }
}

// ============================================================================
// Transitions
// ============================================================================

impl Incident {
    fn invalid(&self, action: LifecycleAction) -> LifecycleError {
        LifecycleError::InvalidTransition {
            incident_id: self.incident_id.clone(),
            action,
            from: self.proof_status,
        }
    }

    /// `NeedProof → Generating`
    pub fn begin_generation(&mut self) -> Result<(), LifecycleError> {
        match self.proof_status {
            ProofStatus::NeedProof => {
                self.proof_status = ProofStatus::Generating;
                Ok(())
            }
            ProofStatus::Generating | ProofStatus::NotVerified | ProofStatus::Verified => {
                Err(self.invalid(LifecycleAction::GenerateProof))
            }
        }
    }

    /// `Generating → NotVerified`, attaching the proof
    pub fn complete_generation(&mut self, artifact: ProofArtifact) -> Result<(), LifecycleError> {
        match self.proof_status {
            ProofStatus::Generating => {
                self.proof = Some(ProofSummary::from_artifact(artifact, self.commitment));
                self.proof_status = ProofStatus::NotVerified;
                Ok(())
            }
            ProofStatus::NeedProof | ProofStatus::NotVerified | ProofStatus::Verified => {
                Err(self.invalid(LifecycleAction::GenerateProof))
            }
        }
    }

    /// `Generating → NeedProof` after a failed generation. No-op otherwise.
    pub fn abort_generation(&mut self) {
        if self.proof_status == ProofStatus::Generating {
            self.proof_status = ProofStatus::NeedProof;
            self.proof = None;
        }
    }

    /// `NotVerified → Verified`
    pub fn mark_verified(&mut self) -> Result<(), LifecycleError> {
        match self.proof_status {
            ProofStatus::NotVerified => {
                self.proof_status = ProofStatus::Verified;
                Ok(())
            }
            ProofStatus::NeedProof | ProofStatus::Generating | ProofStatus::Verified => {
                Err(self.invalid(LifecycleAction::VerifyProof))
            }
        }
    }

    /// Settle the proof transaction: `Pending → Confirmed | Failed`.
    ///
    /// Independent of the proof status; only requires a pending transaction.
    pub fn settle_transaction(&mut self, confirmed: bool) -> Result<(), LifecycleError> {
        let pending = self
            .proof
            .as_mut()
            .filter(|p| p.blockchain_status == Some(BlockchainStatus::Pending));

        match pending {
            Some(proof) => {
                proof.blockchain_status = Some(if confirmed {
                    BlockchainStatus::Confirmed
                } else {
                    BlockchainStatus::Failed
                });
                Ok(())
            }
            None => Err(LifecycleError::NoPendingTransaction {
                incident_id: self.incident_id.clone(),
            }),
        }
    }
}
