//! Branch access guard components.

pub mod branch;
pub mod claims;
pub mod config;
pub mod headers;
pub mod token;
pub mod types;

pub use branch::BranchAccessGuard;
pub use claims::{BranchClaimFields, BranchScope, CallerClaims};
pub use config::{GuardConfig, InvalidTokenPolicy, VerificationConfig, VerificationMode};
pub use headers::{GuardRequest, HeaderLookup, RequestHeaders, AUTHORIZATION};
pub use token::{
    ClaimsProvider, FixedTimeSource, Hs256ClaimsVerifier, SystemTimeSource, TimeSource,
    TokenError, UnverifiedClaimsDecoder, BEARER_PREFIX,
};
pub use types::{AllowReason, BranchViolation, GuardDecision, GuardEvaluation};
