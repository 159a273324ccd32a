//! Branch Access Guard
//!
//! Decides, per request, whether the caller may proceed. Branch isolation is
//! enforced only for callers whose claims carry a permitted-branch list.
//!
//! # Decision order
//!
//! ```text
//! public path? ──yes──► Allow(PublicPath)
//!      │no
//! resolve claims ──invalid token + Reject──► Deny(InvalidToken)
//!      │
//! privileged role? ──yes──► Allow(PrivilegedRole)
//!      │no
//! branch scope
//!   Unscoped ─────────────► Allow(Unscoped)
//!   Scoped, no header ────► Deny(BranchSelectionRequired)
//!   Scoped, not listed ───► Deny(ForbiddenForBranch)
//!   Scoped, listed ───────► Allow(BranchMatched)
//! ```
//!
//! Unusable tokens degrade to anonymous claims under the default
//! `InvalidTokenPolicy::Anonymous`, which lands anonymous callers on
//! `Allow(Unscoped)`. Downstream handlers keep their own narrower checks.
//!
//! The guard is immutable after construction and holds no per-request
//! state, so one instance is shared across all requests.

use super::claims::{BranchClaimFields, CallerClaims};
use super::config::{GuardConfig, InvalidTokenPolicy};
use super::headers::{GuardRequest, HeaderLookup};
use super::token::{ClaimsProvider, UnverifiedClaimsDecoder};
use super::types::{AllowReason, BranchViolation, GuardDecision, GuardEvaluation};
use campus_core::{BranchId, RoleName};
use std::sync::Arc;
use tracing::debug;

/// Per-request branch access guard.
#[derive(Debug, Clone)]
pub struct BranchAccessGuard {
    public_path_prefixes: Vec<String>,
    health_substring: String,
    privileged_roles: Vec<RoleName>,
    branch_header_name: String,
    branch_claim_fields: BranchClaimFields,
    invalid_token: InvalidTokenPolicy,
    provider: Arc<dyn ClaimsProvider>,
}

impl BranchAccessGuard {
    /// Guard using the unverified decoder.
    ///
    /// Does not validate `config`; prefer `GuardConfig::build_guard`.
    pub fn unverified(config: &GuardConfig) -> Self {
        Self::with_provider(config, Arc::new(UnverifiedClaimsDecoder))
    }

    /// Guard with an explicit claims provider.
    pub fn with_provider(config: &GuardConfig, provider: Arc<dyn ClaimsProvider>) -> Self {
        Self {
            public_path_prefixes: config.public_path_prefixes.clone(),
            health_substring: config.health_substring.clone(),
            privileged_roles: config
                .privileged_roles
                .iter()
                .map(RoleName::new)
                .collect(),
            branch_header_name: config.branch_header_name.clone(),
            branch_claim_fields: config.claim_fields(),
            invalid_token: config.invalid_token,
            provider,
        }
    }

    /// Lower-case name of the branch-selector header.
    pub fn branch_header_name(&self) -> &str {
        &self.branch_header_name
    }

    /// Claim fields consulted for permitted branches.
    pub fn branch_claim_fields(&self) -> &BranchClaimFields {
        &self.branch_claim_fields
    }

    /// Returns `true` if `path` bypasses the guard entirely.
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_path_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
            || path.contains(self.health_substring.as_str())
    }

    /// Resolve claims through the provider, applying the invalid-token policy.
    pub fn resolve_claims(&self, authorization: Option<&str>) -> Result<CallerClaims, BranchViolation> {
        match self.provider.resolve(authorization, &self.branch_claim_fields) {
            Ok(claims) => Ok(claims),
            Err(err) => match self.invalid_token {
                InvalidTokenPolicy::Anonymous => {
                    debug!(kind = err.kind(), error = %err, "unusable token, continuing anonymously");
                    Ok(CallerClaims::anonymous())
                }
                InvalidTokenPolicy::Reject => {
                    debug!(kind = err.kind(), error = %err, "unusable token rejected");
                    Err(BranchViolation::InvalidToken {
                        reason: err.to_string(),
                    })
                }
            },
        }
    }

    /// Trim a raw branch-selector value; blank counts as absent.
    pub fn selected_branch(raw: Option<&str>) -> Option<BranchId> {
        raw.map(str::trim)
            .filter(|value| !value.is_empty())
            .map(BranchId::from)
    }

    /// Role and branch policy over already-resolved claims.
    ///
    /// This is the entry point for callers that authenticate tokens
    /// elsewhere and hold trusted `CallerClaims`.
    pub fn decide_claims(&self, claims: &CallerClaims, branch: Option<&BranchId>) -> GuardDecision {
        if let Some(role) = claims.privileged_role(&self.privileged_roles) {
            debug!(role = %role, "privileged role bypasses branch scoping");
            return GuardDecision::Allow(AllowReason::PrivilegedRole(role.clone()));
        }

        if !claims.branches().is_scoped() {
            debug!("caller carries no branch claim");
            return GuardDecision::Allow(AllowReason::Unscoped);
        }

        let Some(branch) = branch else {
            debug!("branch-scoped caller sent no branch selection");
            return GuardDecision::Deny(BranchViolation::BranchSelectionRequired);
        };

        if claims.branches().permits(branch) {
            debug!(branch = %branch, "branch selection permitted");
            GuardDecision::Allow(AllowReason::BranchMatched(branch.clone()))
        } else {
            debug!(branch = %branch, "branch selection outside caller scope");
            GuardDecision::Deny(BranchViolation::ForbiddenForBranch {
                requested: branch.clone(),
            })
        }
    }

    /// Full evaluation of one request.
    pub fn evaluate(&self, request: &GuardRequest<'_>) -> GuardEvaluation {
        let branch = Self::selected_branch(request.branch_selector);

        if self.is_public_path(request.path) {
            debug!(path = request.path, "public path exempt from branch guard");
            return GuardEvaluation {
                decision: GuardDecision::Allow(AllowReason::PublicPath),
                claims: CallerClaims::anonymous(),
                branch,
            };
        }

        let claims = match self.resolve_claims(request.authorization) {
            Ok(claims) => claims,
            Err(violation) => {
                return GuardEvaluation {
                    decision: GuardDecision::Deny(violation),
                    claims: CallerClaims::anonymous(),
                    branch,
                }
            }
        };

        let decision = self.decide_claims(&claims, branch.as_ref());
        GuardEvaluation {
            decision,
            claims,
            branch,
        }
    }

    /// Evaluate straight from a header map.
    pub fn evaluate_headers<H: HeaderLookup>(&self, path: &str, headers: &H) -> GuardEvaluation {
        let request = GuardRequest::from_headers(path, headers, &self.branch_header_name);
        self.evaluate(&request)
    }

    /// Decision only.
    pub fn decide(&self, request: &GuardRequest<'_>) -> GuardDecision {
        self.evaluate(request).decision
    }

    /// Decision as a `Result`.
    pub fn check(&self, request: &GuardRequest<'_>) -> Result<AllowReason, BranchViolation> {
        self.decide(request).into_result()
    }
}

impl Default for BranchAccessGuard {
    fn default() -> Self {
        Self::unverified(&GuardConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guards::headers::RequestHeaders;
    use crate::guards::token::encode_unsigned;
    use serde_json::{json, Value};

    fn bearer(claims: Value) -> String {
        format!("Bearer {}", encode_unsigned(&claims))
    }

    #[test]
    fn public_prefix_and_health_substring() {
        let guard = BranchAccessGuard::default();
        assert!(guard.is_public_path("/api-docs/swagger.json"));
        assert!(guard.is_public_path("/v1/health/live"));
        assert!(!guard.is_public_path("/students"));
        assert!(!guard.is_public_path("/v1/api-docs"));
    }

    #[test]
    fn public_path_skips_claims() {
        let guard = BranchAccessGuard::default();
        let auth = bearer(json!({"branchIds": ["b1"]}));
        let request = GuardRequest::new("/api-docs").with_authorization(&auth);
        let evaluation = guard.evaluate(&request);
        assert_eq!(
            evaluation.decision,
            GuardDecision::Allow(AllowReason::PublicPath)
        );
        assert!(evaluation.claims.is_anonymous());
    }

    #[test]
    fn privileged_role_first_in_token_order() {
        let guard = BranchAccessGuard::default();
        let auth = bearer(json!({"roles": ["teacher", "principal", "admin"], "branchIds": ["b1"]}));
        let request = GuardRequest::new("/students").with_authorization(&auth);
        assert_eq!(
            guard.decide(&request),
            GuardDecision::Allow(AllowReason::PrivilegedRole(RoleName::new("principal")))
        );
    }

    #[test]
    fn role_match_is_case_sensitive() {
        let guard = BranchAccessGuard::default();
        let auth = bearer(json!({"roles": ["Admin"], "branchIds": ["b1"]}));
        let request = GuardRequest::new("/students").with_authorization(&auth);
        assert_eq!(
            guard.decide(&request),
            GuardDecision::Deny(BranchViolation::BranchSelectionRequired)
        );
    }

    #[test]
    fn blank_branch_header_counts_as_missing() {
        let guard = BranchAccessGuard::default();
        let auth = bearer(json!({"branchIds": ["b1"]}));
        let request = GuardRequest::new("/students")
            .with_authorization(&auth)
            .with_branch_selector("   ");
        let evaluation = guard.evaluate(&request);
        assert_eq!(evaluation.branch, None);
        assert_eq!(
            evaluation.decision,
            GuardDecision::Deny(BranchViolation::BranchSelectionRequired)
        );
    }

    #[test]
    fn evaluation_carries_claims_and_branch() {
        let guard = BranchAccessGuard::default();
        let auth = bearer(json!({"sub": "t-1", "branchIds": ["b1", "b2"]}));
        let headers = RequestHeaders::new()
            .with("Authorization", auth)
            .with("X-Branch-Id", "b2");
        let evaluation = guard.evaluate_headers("/attendance", &headers);
        assert_eq!(
            evaluation.decision,
            GuardDecision::Allow(AllowReason::BranchMatched(BranchId::new("b2")))
        );
        assert_eq!(evaluation.claims.subject(), Some("t-1"));
        assert_eq!(evaluation.branch, Some(BranchId::new("b2")));
    }

    #[test]
    fn reject_policy_denies_unusable_tokens_only() {
        let config = GuardConfig {
            invalid_token: InvalidTokenPolicy::Reject,
            ..GuardConfig::default()
        };
        let guard = BranchAccessGuard::unverified(&config);

        let request = GuardRequest::new("/invoices").with_authorization("Bearer not-a-jwt");
        assert!(matches!(
            guard.check(&request),
            Err(BranchViolation::InvalidToken { .. })
        ));

        let anonymous = GuardRequest::new("/invoices");
        assert_eq!(guard.check(&anonymous), Ok(AllowReason::Unscoped));

        let docs = GuardRequest::new("/api-docs").with_authorization("Bearer not-a-jwt");
        assert_eq!(guard.check(&docs), Ok(AllowReason::PublicPath));
    }

    #[test]
    fn decide_claims_on_trusted_claims() {
        use crate::guards::claims::BranchScope;

        let guard = BranchAccessGuard::default();
        let claims = CallerClaims::new(
            Some("svc".into()),
            vec![RoleName::new("accountant")],
            BranchScope::Scoped(vec![BranchId::new("north")]),
        );
        assert!(guard
            .decide_claims(&claims, Some(&BranchId::new("north")))
            .is_allowed());
        assert!(guard
            .decide_claims(&claims, Some(&BranchId::new("south")))
            .is_denied());
    }

    #[test]
    fn custom_configuration() {
        let config = GuardConfig {
            public_path_prefixes: vec!["/docs".into(), "/public".into()],
            health_substring: "/ping".into(),
            privileged_roles: vec!["owner".into()],
            branch_header_name: "x-campus-id".into(),
            branch_claim_fields: vec!["campuses".into()],
            ..GuardConfig::default()
        };
        let guard = BranchAccessGuard::unverified(&config);
        assert!(guard.is_public_path("/public/logo.png"));
        assert!(guard.is_public_path("/internal/ping"));
        assert!(!guard.is_public_path("/api-docs"));

        let auth = bearer(json!({"roles": ["admin"], "campuses": ["c1"]}));
        let headers = RequestHeaders::new()
            .with("authorization", auth)
            .with("x-campus-id", "c2");
        assert_eq!(
            guard.evaluate_headers("/fees", &headers).decision,
            GuardDecision::Deny(BranchViolation::ForbiddenForBranch {
                requested: BranchId::new("c2")
            })
        );
    }
}
