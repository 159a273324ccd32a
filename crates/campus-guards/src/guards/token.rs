//! Bearer token claims providers
//!
//! A `ClaimsProvider` turns the raw `Authorization` header into
//! `CallerClaims`. Two providers ship:
//!
//! - `UnverifiedClaimsDecoder`: reads the payload segment without checking
//!   the signature. This is the compatibility default.
//! - `Hs256ClaimsVerifier`: checks an HMAC-SHA256 signature and `exp`
//!   before trusting the payload.
//!
//! Providers report every unusable token as a `TokenError`; whether that
//! denies the request or degrades to anonymous claims is the guard's
//! `InvalidTokenPolicy`, not the provider's.

use super::claims::{BranchClaimFields, CallerClaims};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;
use std::sync::Arc;

/// Scheme prefix expected on the `Authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Accepts URL-safe input with or without padding (standard-alphabet
/// characters are mapped over first).
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Why a presented token could not be turned into claims.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Header present but not `Bearer <token>`.
    #[error("authorization header does not use the Bearer scheme")]
    MissingBearerScheme,
    /// Too few `.`-separated segments.
    #[error("token is not a dotted JWT")]
    MalformedToken,
    /// Segment is not base64 or not UTF-8.
    #[error("token segment is not valid base64 text: {0}")]
    InvalidEncoding(String),
    /// Segment text is not JSON.
    #[error("token segment is not valid JSON: {0}")]
    InvalidJson(String),
    /// Segment is JSON but not an object.
    #[error("token segment is not a JSON object")]
    NotAnObject,
    /// JOSE header names an algorithm the verifier does not accept.
    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),
    /// Signature does not match.
    #[error("token signature does not verify")]
    BadSignature,
    /// `exp` is present but not a NumericDate.
    #[error("token exp claim is not numeric: {0}")]
    InvalidExpiry(String),
    /// `exp` is in the past.
    #[error("token expired at {exp}")]
    Expired {
        /// Expiry, whole seconds since the Unix epoch (rounded down).
        exp: i64,
    },
}

impl TokenError {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::MissingBearerScheme => "missing_bearer_scheme",
            TokenError::MalformedToken => "malformed_token",
            TokenError::InvalidEncoding(_) => "invalid_encoding",
            TokenError::InvalidJson(_) => "invalid_json",
            TokenError::NotAnObject => "not_an_object",
            TokenError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            TokenError::BadSignature => "bad_signature",
            TokenError::InvalidExpiry(_) => "invalid_expiry",
            TokenError::Expired { .. } => "expired",
        }
    }
}

/// Source of caller claims for the guard.
pub trait ClaimsProvider: Send + Sync + std::fmt::Debug {
    /// Resolve claims from the raw `Authorization` header value.
    ///
    /// `None` (no header) must resolve to anonymous claims.
    fn resolve(
        &self,
        authorization: Option<&str>,
        fields: &BranchClaimFields,
    ) -> Result<CallerClaims, TokenError>;
}

/// Strip the `Bearer ` scheme.
pub fn bearer_token(authorization: &str) -> Result<&str, TokenError> {
    authorization
        .strip_prefix(BEARER_PREFIX)
        .ok_or(TokenError::MissingBearerScheme)
}

/// Decode one base64 JWT segment into bytes.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    let normalized: String = segment
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    LENIENT_BASE64
        .decode(normalized.as_bytes())
        .map_err(|e| TokenError::InvalidEncoding(e.to_string()))
}

/// Decode one base64 JWT segment into a JSON object.
pub fn decode_json_segment(segment: &str) -> Result<Map<String, Value>, TokenError> {
    let bytes = decode_segment(segment)?;
    let text =
        std::str::from_utf8(&bytes).map_err(|e| TokenError::InvalidEncoding(e.to_string()))?;
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(TokenError::NotAnObject),
        Err(e) => Err(TokenError::InvalidJson(e.to_string())),
    }
}

/// Reads the claims segment without verifying the signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnverifiedClaimsDecoder;

impl UnverifiedClaimsDecoder {
    /// Decode a bare token (no scheme prefix).
    pub fn decode_token(
        &self,
        token: &str,
        fields: &BranchClaimFields,
    ) -> Result<CallerClaims, TokenError> {
        let mut segments = token.split('.');
        let _header = segments.next();
        let payload = segments.next().ok_or(TokenError::MalformedToken)?;
        let payload = decode_json_segment(payload)?;
        Ok(CallerClaims::from_payload(payload, fields))
    }
}

impl ClaimsProvider for UnverifiedClaimsDecoder {
    fn resolve(
        &self,
        authorization: Option<&str>,
        fields: &BranchClaimFields,
    ) -> Result<CallerClaims, TokenError> {
        let Some(authorization) = authorization else {
            return Ok(CallerClaims::anonymous());
        };
        self.decode_token(bearer_token(authorization)?, fields)
    }
}

/// Wall-clock source for expiry checks.
pub trait TimeSource: Send + Sync + std::fmt::Debug {
    /// Seconds since the Unix epoch.
    fn now_unix_secs(&self) -> u64;
}

/// `SystemTime`-backed clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_unix_secs(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource(pub u64);

impl TimeSource for FixedTimeSource {
    fn now_unix_secs(&self) -> u64 {
        self.0
    }
}

type HmacSha256 = Hmac<Sha256>;

/// Verifies HS256-signed tokens before trusting their claims.
pub struct Hs256ClaimsVerifier {
    secret: Vec<u8>,
    leeway_secs: u64,
    clock: Arc<dyn TimeSource>,
}

impl Hs256ClaimsVerifier {
    /// Default tolerance applied to `exp`.
    pub const DEFAULT_LEEWAY_SECS: u64 = 30;

    /// Create a verifier for `secret` using the system clock.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            leeway_secs: Self::DEFAULT_LEEWAY_SECS,
            clock: Arc::new(SystemTimeSource),
        }
    }

    /// Override the `exp` tolerance.
    pub fn with_leeway_secs(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    /// Override the clock.
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    fn verify_token(
        &self,
        token: &str,
        fields: &BranchClaimFields,
    ) -> Result<CallerClaims, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header, payload, signature] = segments.as_slice() else {
            return Err(TokenError::MalformedToken);
        };

        let jose = decode_json_segment(header)?;
        match jose.get("alg").and_then(Value::as_str) {
            Some("HS256") => {}
            Some(other) => return Err(TokenError::UnsupportedAlgorithm(other.to_string())),
            None => return Err(TokenError::UnsupportedAlgorithm("none".to_string())),
        }

        let signature = decode_segment(signature)?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| TokenError::BadSignature)?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let payload = decode_json_segment(payload)?;
        if let Some(raw) = payload.get("exp") {
            // NumericDate may be fractional or negative.
            let exp = raw
                .as_f64()
                .ok_or_else(|| TokenError::InvalidExpiry(raw.to_string()))?;
            let now = self.clock.now_unix_secs() as f64;
            if now > exp + self.leeway_secs as f64 {
                return Err(TokenError::Expired {
                    exp: exp.floor() as i64,
                });
            }
        }
        Ok(CallerClaims::from_payload(payload, fields))
    }
}

impl std::fmt::Debug for Hs256ClaimsVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hs256ClaimsVerifier")
            .field("secret", &"<redacted>")
            .field("leeway_secs", &self.leeway_secs)
            .field("clock", &self.clock)
            .finish()
    }
}

impl ClaimsProvider for Hs256ClaimsVerifier {
    fn resolve(
        &self,
        authorization: Option<&str>,
        fields: &BranchClaimFields,
    ) -> Result<CallerClaims, TokenError> {
        let Some(authorization) = authorization else {
            return Ok(CallerClaims::anonymous());
        };
        self.verify_token(bearer_token(authorization)?, fields)
    }
}

/// Sign `claims` as an HS256 JWT. Used by the CLI and tests to mint tokens.
pub fn sign_hs256(claims: &Value, secret: &[u8]) -> Result<String, TokenError> {
    let engine = &base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = engine.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = serde_json::to_vec(claims).map_err(|e| TokenError::InvalidJson(e.to_string()))?;
    let payload = engine.encode(payload);

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::BadSignature)?;
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    let signature = engine.encode(mac.finalize().into_bytes());

    Ok(format!("{header}.{payload}.{signature}"))
}

/// Build an unsigned token (`header.payload.`) for the compatibility decoder.
pub fn encode_unsigned(claims: &Value) -> String {
    let engine = &base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = engine.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = engine.encode(claims.to_string());
    format!("{header}.{payload}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use campus_core::{BranchId, RoleName};
    use serde_json::json;

    const SECRET: &[u8] = b"campus-test-secret";

    fn fields() -> BranchClaimFields {
        BranchClaimFields::default()
    }

    #[test]
    fn unverified_decodes_payload() {
        let token = encode_unsigned(&json!({"sub": "u1", "roles": ["teacher"], "branchIds": ["b1"]}));
        let claims = UnverifiedClaimsDecoder
            .resolve(Some(&format!("Bearer {token}")), &fields())
            .unwrap();
        assert_eq!(claims.subject(), Some("u1"));
        assert_eq!(claims.roles(), &[RoleName::new("teacher")]);
        assert!(claims.branches().permits(&BranchId::new("b1")));
    }

    #[test]
    fn unverified_accepts_padded_standard_alphabet() {
        use base64::engine::general_purpose::STANDARD;
        // Encodes with both `+` and `==` padding.
        let payload = STANDARD.encode(r#"{"branchIds":["b>>?"]}"#);
        assert!(payload.contains('+') && payload.ends_with("=="));
        let token = format!("h.{payload}.s");
        let claims = UnverifiedClaimsDecoder.decode_token(&token, &fields()).unwrap();
        assert!(claims.branches().permits(&BranchId::new("b>>?")));
    }

    #[test]
    fn unverified_error_kinds() {
        let decoder = UnverifiedClaimsDecoder;
        assert_eq!(
            decoder.resolve(None, &fields()),
            Ok(CallerClaims::anonymous())
        );
        assert_eq!(
            decoder.resolve(Some("Basic abc"), &fields()),
            Err(TokenError::MissingBearerScheme)
        );
        assert_eq!(
            decoder.resolve(Some("Bearer not-a-jwt"), &fields()),
            Err(TokenError::MalformedToken)
        );
        assert!(matches!(
            decoder.resolve(Some("Bearer a.!!!.c"), &fields()),
            Err(TokenError::InvalidEncoding(_))
        ));
        let not_json = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("nope");
        assert!(matches!(
            decoder.resolve(Some(&format!("Bearer a.{not_json}.c")), &fields()),
            Err(TokenError::InvalidJson(_))
        ));
        let array = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("[1,2]");
        assert_eq!(
            decoder.resolve(Some(&format!("Bearer a.{array}.c")), &fields()),
            Err(TokenError::NotAnObject)
        );
    }

    #[test]
    fn hs256_round_trip() {
        let token = sign_hs256(&json!({"sub": "u2", "branch_ids": ["b4"]}), SECRET).unwrap();
        let verifier = Hs256ClaimsVerifier::new(SECRET);
        let claims = verifier
            .resolve(Some(&format!("Bearer {token}")), &fields())
            .unwrap();
        assert_eq!(claims.subject(), Some("u2"));
        assert!(claims.branches().permits(&BranchId::new("b4")));
    }

    #[test]
    fn hs256_rejects_tampered_payload() {
        let token = sign_hs256(&json!({"branchIds": ["b1"]}), SECRET).unwrap();
        let forged = encode_unsigned(&json!({"roles": ["admin"]}));
        let forged_payload = forged.split('.').nth(1).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = forged_payload;
        let tampered = parts.join(".");

        let verifier = Hs256ClaimsVerifier::new(SECRET);
        assert_eq!(
            verifier.resolve(Some(&format!("Bearer {tampered}")), &fields()),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn hs256_rejects_wrong_secret_and_alg() {
        let token = sign_hs256(&json!({}), b"other-secret").unwrap();
        let verifier = Hs256ClaimsVerifier::new(SECRET);
        assert_eq!(
            verifier.resolve(Some(&format!("Bearer {token}")), &fields()),
            Err(TokenError::BadSignature)
        );

        let unsigned = encode_unsigned(&json!({"roles": ["admin"]}));
        assert_eq!(
            verifier.resolve(Some(&format!("Bearer {unsigned}")), &fields()),
            Err(TokenError::UnsupportedAlgorithm("none".into()))
        );
    }

    #[test]
    fn hs256_checks_expiry_with_leeway() {
        let token = sign_hs256(&json!({"exp": 1_000}), SECRET).unwrap();
        let header = format!("Bearer {token}");

        let within = Hs256ClaimsVerifier::new(SECRET)
            .with_clock(Arc::new(FixedTimeSource(1_020)));
        assert!(within.resolve(Some(&header), &fields()).is_ok());

        let past = Hs256ClaimsVerifier::new(SECRET)
            .with_leeway_secs(0)
            .with_clock(Arc::new(FixedTimeSource(1_001)));
        assert_eq!(
            past.resolve(Some(&header), &fields()),
            Err(TokenError::Expired { exp: 1_000 })
        );
    }

    #[test]
    fn hs256_checks_fractional_and_negative_expiry() {
        let verifier = Hs256ClaimsVerifier::new(SECRET)
            .with_leeway_secs(0)
            .with_clock(Arc::new(FixedTimeSource(999_999)));

        let fractional = sign_hs256(&json!({"exp": 1000.5}), SECRET).unwrap();
        assert_eq!(
            verifier.resolve(Some(&format!("Bearer {fractional}")), &fields()),
            Err(TokenError::Expired { exp: 1_000 })
        );

        let negative = sign_hs256(&json!({"exp": -5}), SECRET).unwrap();
        assert_eq!(
            verifier.resolve(Some(&format!("Bearer {negative}")), &fields()),
            Err(TokenError::Expired { exp: -5 })
        );

        let future = sign_hs256(&json!({"exp": 1_000_000.25}), SECRET).unwrap();
        assert!(verifier
            .resolve(Some(&format!("Bearer {future}")), &fields())
            .is_ok());
    }

    #[test]
    fn hs256_rejects_non_numeric_expiry() {
        let verifier = Hs256ClaimsVerifier::new(SECRET)
            .with_clock(Arc::new(FixedTimeSource(1_000)));
        for exp in [json!("9999999999"), json!(null), json!([1])] {
            let token = sign_hs256(&json!({"exp": exp}), SECRET).unwrap();
            let result = verifier.resolve(Some(&format!("Bearer {token}")), &fields());
            assert!(
                matches!(result, Err(TokenError::InvalidExpiry(_))),
                "{exp}: {result:?}"
            );
        }
    }

    #[test]
    fn verifier_debug_redacts_secret() {
        let rendered = format!("{:?}", Hs256ClaimsVerifier::new(SECRET));
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("campus-test-secret"));
    }
}
