//! Branch guard middleware
//!
//! Evaluates each request before it reaches a handler. Allowed requests carry
//! `AllowReason`, `CallerClaims` and `BranchSelection` in their extensions;
//! denied ones are answered with a `GuardRejection`.

use crate::rejection::GuardRejection;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use campus_core::{BranchId, CampusResult, ErrorCode};
use campus_guards::{BranchAccessGuard, GuardConfig, GuardDecision, HeaderLookup};
use std::sync::Arc;
use tracing::{warn, Instrument};

/// Shared state for the guard middleware.
#[derive(Debug, Clone)]
pub struct GatewayState {
    /// Guard shared by every request.
    pub guard: Arc<BranchAccessGuard>,
}

impl GatewayState {
    /// Wrap an already-built guard.
    pub fn new(guard: BranchAccessGuard) -> Self {
        Self {
            guard: Arc::new(guard),
        }
    }

    /// Validate `config` and build the guard it describes.
    pub fn from_config(config: &GuardConfig) -> CampusResult<Self> {
        Ok(Self::new(config.build_guard()?))
    }
}

/// Branch the caller selected, as seen by downstream handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSelection(pub Option<BranchId>);

/// `HeaderLookup` over an `http::HeaderMap`.
///
/// Non-UTF-8 values read as absent.
#[derive(Debug, Clone, Copy)]
pub struct HttpHeaders<'a>(pub &'a HeaderMap);

impl HeaderLookup for HttpHeaders<'_> {
    fn header(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Run the branch guard for one request.
pub async fn branch_access_middleware(
    State(state): State<GatewayState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let evaluation = state
        .guard
        .evaluate_headers(&path, &HttpHeaders(request.headers()));

    let span = tracing::info_span!(
        "branch_guard",
        path = %path,
        branch = evaluation.branch.as_ref().map(BranchId::as_str).unwrap_or(""),
        subject = evaluation.claims.subject().unwrap_or(""),
    );

    match evaluation.decision {
        GuardDecision::Allow(reason) => {
            span.in_scope(|| tracing::debug!(reason = reason.label(), "request allowed"));
            let extensions = request.extensions_mut();
            extensions.insert(reason);
            extensions.insert(evaluation.claims);
            extensions.insert(BranchSelection(evaluation.branch));
            next.run(request).instrument(span).await
        }
        GuardDecision::Deny(violation) => {
            span.in_scope(|| {
                warn!(
                    code = violation.code(),
                    status = violation.status_code(),
                    "request denied by branch guard"
                );
            });
            GuardRejection::from(violation).into_response()
        }
    }
}

/// Layer the branch guard onto `router`.
pub fn guarded<S>(router: Router<S>, state: GatewayState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(from_fn_with_state(state, branch_access_middleware))
}
