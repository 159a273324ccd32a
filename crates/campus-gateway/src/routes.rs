//! Minimal guarded service surface.
//!
//! `/health` and `/api-docs` exercise the public-path exemptions; `/whoami`
//! echoes what the guard resolved for the caller.

use crate::middleware::{guarded, BranchSelection, GatewayState};
use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use campus_guards::{AllowReason, CallerClaims};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

/// Router with the guard layered over every route.
pub fn router(state: GatewayState) -> Router {
    let routes = Router::new()
        .route("/health", get(health))
        .route("/api-docs", get(api_docs))
        .route("/whoami", get(whoami))
        .with_state(state.clone());
    guarded(routes, state).layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn api_docs(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "routes": ["/health", "/api-docs", "/whoami"],
        "branchHeader": state.guard.branch_header_name(),
    }))
}

async fn whoami(
    Extension(claims): Extension<CallerClaims>,
    Extension(BranchSelection(branch)): Extension<BranchSelection>,
    Extension(reason): Extension<AllowReason>,
) -> Json<Value> {
    Json(json!({
        "claims": claims,
        "branch": branch,
        "allowedBy": reason.label(),
    }))
}
