//! Campus Guards prelude.
//!
//! Curated re-exports for wiring the guard into a request pipeline.

pub use crate::guards::{
    AllowReason, BranchAccessGuard, BranchViolation, CallerClaims, GuardConfig, GuardDecision,
    GuardEvaluation, GuardRequest, HeaderLookup,
};
pub use campus_core::{BranchId, CampusConfig, ErrorCode, RoleName};
