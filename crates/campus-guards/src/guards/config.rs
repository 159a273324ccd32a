//! Guard runtime configuration.

use super::branch::BranchAccessGuard;
use super::claims::BranchClaimFields;
use super::token::{ClaimsProvider, Hs256ClaimsVerifier, UnverifiedClaimsDecoder};
use campus_core::{split_list, CampusConfig, CampusError, CampusResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What to do with a token that is present but unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidTokenPolicy {
    /// Continue with anonymous claims (compatibility default).
    #[default]
    Anonymous,
    /// Deny with `InvalidToken`.
    Reject,
}

impl std::str::FromStr for InvalidTokenPolicy {
    type Err = CampusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "anonymous" => Ok(Self::Anonymous),
            "reject" => Ok(Self::Reject),
            other => Err(CampusError::invalid(format!(
                "invalid_token must be `anonymous` or `reject`, got `{other}`"
            ))),
        }
    }
}

/// How bearer tokens are turned into claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    /// Read the payload without checking the signature.
    #[default]
    Unverified,
    /// Require a valid HMAC-SHA256 signature.
    Hs256,
}

/// Token verification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerificationConfig {
    /// Verification mode.
    pub mode: VerificationMode,
    /// Environment variable holding the HS256 secret.
    pub secret_env: String,
    /// Tolerance applied to `exp`, in seconds.
    pub leeway_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            mode: VerificationMode::Unverified,
            secret_env: "CAMPUS_GUARD_JWT_SECRET".to_string(),
            leeway_secs: Hs256ClaimsVerifier::DEFAULT_LEEWAY_SECS,
        }
    }
}

/// Branch access guard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardConfig {
    /// Paths starting with any of these skip the guard.
    pub public_path_prefixes: Vec<String>,
    /// Paths containing this skip the guard.
    pub health_substring: String,
    /// Roles exempt from branch scoping.
    pub privileged_roles: Vec<String>,
    /// Branch-selector header name (lower case).
    pub branch_header_name: String,
    /// Claim fields that may hold permitted branches, in priority order.
    pub branch_claim_fields: Vec<String>,
    /// Handling of present-but-unusable tokens.
    pub invalid_token: InvalidTokenPolicy,
    /// Token verification.
    pub verification: VerificationConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            public_path_prefixes: vec!["/api-docs".to_string()],
            health_substring: "/health".to_string(),
            privileged_roles: vec![
                "admin".to_string(),
                "super_admin".to_string(),
                "principal".to_string(),
            ],
            branch_header_name: "x-branch-id".to_string(),
            branch_claim_fields: vec!["branchIds".to_string(), "branch_ids".to_string()],
            invalid_token: InvalidTokenPolicy::Anonymous,
            verification: VerificationConfig::default(),
        }
    }
}

fn is_header_token_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || "!#$%&'*+-.^_`|~".contains(c)
}

impl CampusConfig for GuardConfig {
    const ENV_PREFIX: &'static str = "CAMPUS_GUARD_";

    fn validate(&self) -> CampusResult<()> {
        if self.health_substring.is_empty() {
            return Err(CampusError::invalid(
                "health_substring must not be empty; it would exempt every path",
            ));
        }
        if self.public_path_prefixes.iter().any(String::is_empty) {
            return Err(CampusError::invalid(
                "public_path_prefixes must not contain an empty prefix",
            ));
        }
        if self.privileged_roles.iter().any(String::is_empty) {
            return Err(CampusError::invalid(
                "privileged_roles must not contain an empty role",
            ));
        }
        if self.branch_header_name.is_empty()
            || !self.branch_header_name.chars().all(is_header_token_char)
        {
            return Err(CampusError::invalid(format!(
                "branch_header_name `{}` is not a lower-case HTTP header name",
                self.branch_header_name
            )));
        }
        if self.branch_claim_fields.is_empty() {
            return Err(CampusError::invalid(
                "branch_claim_fields needs at least one field name",
            ));
        }
        if self.branch_claim_fields.iter().any(String::is_empty) {
            return Err(CampusError::invalid(
                "branch_claim_fields must not contain an empty field name",
            ));
        }
        if self.verification.mode == VerificationMode::Hs256
            && self.verification.secret_env.is_empty()
        {
            return Err(CampusError::invalid(
                "verification.secret_env is required in hs256 mode",
            ));
        }
        Ok(())
    }

    fn set_from_string(&mut self, key: &str, value: &str) -> CampusResult<()> {
        match key {
            "public_path_prefixes" => self.public_path_prefixes = split_list(value),
            "health_substring" => self.health_substring = value.trim().to_string(),
            "privileged_roles" => self.privileged_roles = split_list(value),
            "branch_header_name" => {
                self.branch_header_name = value.trim().to_ascii_lowercase();
            }
            "branch_claim_fields" => self.branch_claim_fields = split_list(value),
            "invalid_token" => self.invalid_token = value.parse()?,
            other => {
                return Err(CampusError::not_found(format!(
                    "unknown guard setting `{other}`"
                )))
            }
        }
        Ok(())
    }
}

impl GuardConfig {
    /// Validate and build a guard, reading the HS256 secret from the
    /// configured environment variable when needed.
    pub fn build_guard(&self) -> CampusResult<BranchAccessGuard> {
        let provider = self.claims_provider()?;
        Ok(BranchAccessGuard::with_provider(self, provider))
    }

    /// Validate and build a guard with an explicit HS256 secret.
    pub fn build_guard_with_secret(&self, secret: Option<&[u8]>) -> CampusResult<BranchAccessGuard> {
        let provider = self.claims_provider_with_secret(secret)?;
        Ok(BranchAccessGuard::with_provider(self, provider))
    }

    /// Validate and build the configured claims provider, reading the
    /// HS256 secret from the environment when needed.
    pub fn claims_provider(&self) -> CampusResult<Arc<dyn ClaimsProvider>> {
        let secret = self.secret_from_env()?;
        self.claims_provider_with_secret(secret.as_deref())
    }

    /// Validate and build the configured claims provider.
    pub fn claims_provider_with_secret(
        &self,
        secret: Option<&[u8]>,
    ) -> CampusResult<Arc<dyn ClaimsProvider>> {
        self.validate()?;
        match self.verification.mode {
            VerificationMode::Unverified => Ok(Arc::new(UnverifiedClaimsDecoder)),
            VerificationMode::Hs256 => {
                let secret = secret
                    .filter(|secret| !secret.is_empty())
                    .ok_or_else(|| CampusError::invalid("hs256 verification needs a non-empty secret"))?;
                Ok(Arc::new(
                    Hs256ClaimsVerifier::new(secret)
                        .with_leeway_secs(self.verification.leeway_secs),
                ))
            }
        }
    }

    /// Branch claim fields as the guard will resolve them.
    pub fn claim_fields(&self) -> BranchClaimFields {
        BranchClaimFields::new(self.branch_claim_fields.iter().cloned())
    }

    fn secret_from_env(&self) -> CampusResult<Option<Vec<u8>>> {
        match self.verification.mode {
            VerificationMode::Unverified => Ok(None),
            VerificationMode::Hs256 => std::env::var(&self.verification.secret_env)
                .map(|secret| Some(secret.into_bytes()))
                .map_err(|_| {
                    CampusError::invalid(format!(
                        "hs256 verification needs a secret in ${}",
                        self.verification.secret_env
                    ))
                }),
        }
    }
}
