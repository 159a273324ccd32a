//! Caller claims
//!
//! `CallerClaims` is the canonical, policy-facing view of a bearer token's
//! payload. The permitted-branch list may arrive under several claim field
//! names; `BranchClaimFields` resolves it once, at construction, into a
//! single `BranchScope`.

use campus_core::{BranchId, RoleName};
use serde::Serialize;
use serde_json::{Map, Value};

const SUBJECT_CLAIM: &str = "sub";
const ROLES_CLAIM: &str = "roles";

/// Priority-ordered claim field names that may carry permitted branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchClaimFields(Vec<String>);

impl BranchClaimFields {
    /// Build from an ordered list of field names; earlier names win.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    /// Field names in priority order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns `true` if `name` is one of the candidates.
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|field| field == name)
    }

    /// Resolve the branch scope from a claims payload.
    ///
    /// Candidates are tried in order; a missing, `null` or empty-array
    /// field defers to the next one. The first other value decides:
    ///
    /// - array: its string entries. Non-string entries are dropped, but
    ///   the scope stays `Scoped` so they can never widen access.
    /// - non-empty string: a single permitted branch.
    /// - anything else: `Scoped` with no branches, denying every selection.
    pub fn resolve(&self, payload: &Map<String, Value>) -> BranchScope {
        for name in self.names() {
            match payload.get(name) {
                None | Some(Value::Null) => continue,
                Some(Value::Array(entries)) if entries.is_empty() => continue,
                Some(Value::Array(entries)) => {
                    let branches = entries
                        .iter()
                        .filter_map(Value::as_str)
                        .map(BranchId::from)
                        .collect();
                    return BranchScope::Scoped(branches);
                }
                Some(Value::String(branch)) if !branch.is_empty() => {
                    return BranchScope::Scoped(vec![BranchId::new(branch.as_str())]);
                }
                Some(_) => return BranchScope::Scoped(Vec::new()),
            }
        }
        BranchScope::Unscoped
    }
}

impl Default for BranchClaimFields {
    fn default() -> Self {
        Self::new(["branchIds", "branch_ids"])
    }
}

/// Branch restriction carried by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "scope", content = "branches", rename_all = "snake_case")]
pub enum BranchScope {
    /// No branch claim; branch scoping does not apply.
    #[default]
    Unscoped,
    /// Caller may only act on these branches.
    Scoped(Vec<BranchId>),
}

impl BranchScope {
    /// Returns `true` when the caller is restricted to a branch list.
    pub fn is_scoped(&self) -> bool {
        matches!(self, Self::Scoped(_))
    }

    /// Exact match of `branch` against the permitted list.
    ///
    /// Always `false` for `Unscoped`; callers decide what unscoped means.
    pub fn permits(&self, branch: &BranchId) -> bool {
        match self {
            Self::Unscoped => false,
            Self::Scoped(branches) => branches.contains(branch),
        }
    }

    /// Permitted branches, empty when unscoped.
    pub fn branches(&self) -> &[BranchId] {
        match self {
            Self::Unscoped => &[],
            Self::Scoped(branches) => branches,
        }
    }
}

/// Decoded caller claims.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CallerClaims {
    subject: Option<String>,
    roles: Vec<RoleName>,
    branches: BranchScope,
    extra: Map<String, Value>,
}

impl CallerClaims {
    /// Claims for a caller without a usable token.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Build claims from explicit parts (verified providers, tests).
    pub fn new(subject: Option<String>, roles: Vec<RoleName>, branches: BranchScope) -> Self {
        Self {
            subject,
            roles,
            branches,
            extra: Map::new(),
        }
    }

    /// Lift a decoded JSON payload into claims.
    ///
    /// `roles` that is missing or not an array counts as empty; non-string
    /// roles are skipped. Consumed fields do not reappear in `extra`.
    pub fn from_payload(mut payload: Map<String, Value>, fields: &BranchClaimFields) -> Self {
        let branches = fields.resolve(&payload);

        let subject = match payload.remove(SUBJECT_CLAIM) {
            Some(Value::String(sub)) => Some(sub),
            _ => None,
        };
        let roles = match payload.remove(ROLES_CLAIM) {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(Value::as_str)
                .map(RoleName::from)
                .collect(),
            _ => Vec::new(),
        };
        payload.retain(|key, _| !fields.contains(key));

        Self {
            subject,
            roles,
            branches,
            extra: payload,
        }
    }

    /// `sub` claim.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Roles in token order.
    pub fn roles(&self) -> &[RoleName] {
        &self.roles
    }

    /// Resolved branch scope.
    pub fn branches(&self) -> &BranchScope {
        &self.branches
    }

    /// Claim fields the policy ignores.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// First role (in token order) that appears in `privileged`.
    pub fn privileged_role<'a>(&'a self, privileged: &[RoleName]) -> Option<&'a RoleName> {
        self.roles.iter().find(|role| privileged.contains(role))
    }

    /// Returns `true` when no claim survived decoding.
    pub fn is_anonymous(&self) -> bool {
        self.subject.is_none()
            && self.roles.is_empty()
            && !self.branches.is_scoped()
            && self.extra.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn primary_branch_field_wins() {
        let claims = CallerClaims::from_payload(
            payload(json!({"branchIds": ["b1"], "branch_ids": ["b2"]})),
            &BranchClaimFields::default(),
        );
        assert_eq!(
            claims.branches(),
            &BranchScope::Scoped(vec![BranchId::new("b1")])
        );
    }

    #[test]
    fn falls_back_to_alternate_field() {
        let claims = CallerClaims::from_payload(
            payload(json!({"branch_ids": ["b2", "b3"]})),
            &BranchClaimFields::default(),
        );
        assert_eq!(claims.branches().branches().len(), 2);
        assert!(claims.branches().permits(&BranchId::new("b3")));
    }

    #[test]
    fn empty_primary_defers_to_alternate() {
        let claims = CallerClaims::from_payload(
            payload(json!({"branchIds": [], "branch_ids": ["b2"]})),
            &BranchClaimFields::default(),
        );
        assert_eq!(
            claims.branches(),
            &BranchScope::Scoped(vec![BranchId::new("b2")])
        );
    }

    #[test]
    fn string_branch_claim_scopes_to_that_branch() {
        let claims = CallerClaims::from_payload(
            payload(json!({"branchIds": "b1"})),
            &BranchClaimFields::default(),
        );
        assert_eq!(
            claims.branches(),
            &BranchScope::Scoped(vec![BranchId::new("b1")])
        );
        assert!(!claims.branches().permits(&BranchId::new("b9")));
    }

    #[test]
    fn malformed_branch_claim_denies_every_branch() {
        for value in [json!(""), json!(7), json!(true), json!({"id": "b1"})] {
            let claims = CallerClaims::from_payload(
                payload(json!({"branchIds": value, "branch_ids": ["b1"]})),
                &BranchClaimFields::default(),
            );
            assert_eq!(claims.branches(), &BranchScope::Scoped(Vec::new()));
        }
    }

    #[test]
    fn null_branch_claim_defers_to_alternate() {
        let claims = CallerClaims::from_payload(
            payload(json!({"branchIds": null, "branch_ids": ["b2"]})),
            &BranchClaimFields::default(),
        );
        assert_eq!(
            claims.branches(),
            &BranchScope::Scoped(vec![BranchId::new("b2")])
        );
    }

    #[test]
    fn non_string_branches_keep_scope_but_never_match() {
        let claims = CallerClaims::from_payload(
            payload(json!({"branchIds": [1, 2]})),
            &BranchClaimFields::default(),
        );
        assert!(claims.branches().is_scoped());
        assert!(!claims.branches().permits(&BranchId::new("1")));
    }

    #[test]
    fn roles_subject_and_extra() {
        let claims = CallerClaims::from_payload(
            payload(json!({
                "sub": "u-17",
                "roles": ["teacher", 7, "admin"],
                "branchIds": ["b1"],
                "tenant": "north"
            })),
            &BranchClaimFields::default(),
        );
        assert_eq!(claims.subject(), Some("u-17"));
        assert_eq!(
            claims.roles(),
            &[RoleName::new("teacher"), RoleName::new("admin")]
        );
        assert_eq!(claims.extra().len(), 1);
        assert_eq!(claims.extra()["tenant"], "north");

        let privileged = [RoleName::new("admin"), RoleName::new("principal")];
        assert_eq!(
            claims.privileged_role(&privileged),
            Some(&RoleName::new("admin"))
        );
    }

    #[test]
    fn missing_roles_are_empty() {
        let claims = CallerClaims::from_payload(
            payload(json!({"roles": "admin"})),
            &BranchClaimFields::default(),
        );
        assert!(claims.roles().is_empty());
        assert!(claims.is_anonymous());
    }

    #[test]
    fn custom_field_order() {
        let fields = BranchClaimFields::new(["campuses"]);
        let claims = CallerClaims::from_payload(
            payload(json!({"campuses": ["c1"], "branchIds": ["b1"]})),
            &fields,
        );
        assert_eq!(
            claims.branches(),
            &BranchScope::Scoped(vec![BranchId::new("c1")])
        );
        assert!(claims.extra().contains_key("branchIds"));
    }
}
