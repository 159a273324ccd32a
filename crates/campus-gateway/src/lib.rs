//! Campus Gateway - HTTP adapter for the branch access guard
//!
//! Wires `campus_guards::BranchAccessGuard` into an axum router:
//!
//! - `branch_access_middleware` evaluates every request and either forwards
//!   it (with `CallerClaims` and `BranchSelection` in the request
//!   extensions) or answers with a `GuardRejection`.
//! - `routes::router` is a small service surface used by the CLI's demo
//!   server and by the integration tests.

#![forbid(unsafe_code)]

/// Guard middleware and shared state.
pub mod middleware;
/// JSON rendering of denials.
pub mod rejection;
/// Demo routes behind the guard.
pub mod routes;

pub use middleware::{branch_access_middleware, guarded, BranchSelection, GatewayState, HttpHeaders};
pub use rejection::GuardRejection;
