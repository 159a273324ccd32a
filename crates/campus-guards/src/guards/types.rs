//! Guard decision vocabulary
//!
//! A guard evaluation ends in exactly one of four allow reasons or one
//! violation. Adapters (HTTP middleware, CLI) translate these into their own
//! surfaces; the policy itself never builds responses.

use super::claims::CallerClaims;
use campus_core::{BranchId, CampusError, ErrorCode, RoleName};
use serde::{Deserialize, Serialize};

/// Why a request was let through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "value", rename_all = "snake_case")]
pub enum AllowReason {
    /// Path matched a public prefix or the health substring.
    PublicPath,
    /// Caller holds a role exempt from branch scoping.
    PrivilegedRole(RoleName),
    /// Selected branch is one of the caller's permitted branches.
    BranchMatched(BranchId),
    /// Caller carries no branch claim, so scoping does not apply.
    Unscoped,
}

impl AllowReason {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            AllowReason::PublicPath => "public_path",
            AllowReason::PrivilegedRole(_) => "privileged_role",
            AllowReason::BranchMatched(_) => "branch_matched",
            AllowReason::Unscoped => "unscoped",
        }
    }
}

/// Structured denial reasons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BranchViolation {
    /// Caller is branch-scoped but sent no branch-selector header.
    #[error("Branch selection required")]
    BranchSelectionRequired,
    /// Selected branch is not among the caller's permitted branches.
    #[error("Forbidden for selected branch")]
    ForbiddenForBranch {
        /// Trimmed header value the caller asked for.
        requested: BranchId,
    },
    /// Token present but unusable, only under `InvalidTokenPolicy::Reject`.
    #[error("Invalid bearer token")]
    InvalidToken {
        /// Why the token was rejected.
        reason: String,
    },
}

impl BranchViolation {
    /// HTTP status the violation maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            BranchViolation::BranchSelectionRequired
            | BranchViolation::ForbiddenForBranch { .. } => 403,
            BranchViolation::InvalidToken { .. } => 401,
        }
    }

    /// Reason phrase for `status_code`.
    pub fn status_text(&self) -> &'static str {
        match self.status_code() {
            401 => "Unauthorized",
            _ => "Forbidden",
        }
    }
}

impl ErrorCode for BranchViolation {
    fn code(&self) -> &'static str {
        match self {
            BranchViolation::BranchSelectionRequired => "BRANCH_SELECTION_REQUIRED",
            BranchViolation::ForbiddenForBranch { .. } => "FORBIDDEN_FOR_BRANCH",
            BranchViolation::InvalidToken { .. } => "INVALID_TOKEN",
        }
    }
}

impl From<BranchViolation> for CampusError {
    fn from(violation: BranchViolation) -> Self {
        match violation {
            BranchViolation::InvalidToken { .. } => {
                CampusError::unauthenticated(violation.to_string())
            }
            _ => CampusError::permission_denied(violation.to_string()),
        }
    }
}

/// Decision from guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "detail", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Request may proceed.
    Allow(AllowReason),
    /// Request is rejected.
    Deny(BranchViolation),
}

impl GuardDecision {
    /// Returns `true` if the decision allows the request.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    /// Returns `true` if the decision denies the request.
    pub fn is_denied(&self) -> bool {
        !self.is_allowed()
    }

    /// Returns the denial reason, if denied.
    pub fn denial_reason(&self) -> Option<&BranchViolation> {
        match self {
            Self::Allow(_) => None,
            Self::Deny(reason) => Some(reason),
        }
    }

    /// Convert into a `Result` for `?`-style callers.
    pub fn into_result(self) -> Result<AllowReason, BranchViolation> {
        match self {
            Self::Allow(reason) => Ok(reason),
            Self::Deny(violation) => Err(violation),
        }
    }
}

/// Decision plus the inputs adapters forward downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardEvaluation {
    /// The allow/deny outcome.
    pub decision: GuardDecision,
    /// Claims the decision was made on; anonymous for public paths.
    pub claims: CallerClaims,
    /// Trimmed branch-selector value, if one was supplied.
    pub branch: Option<BranchId>,
}
