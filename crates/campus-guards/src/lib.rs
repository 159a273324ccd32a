#![deny(clippy::await_holding_lock)]
//! # Campus Guards - branch-scoped request authorization
//!
//! Decodes bearer-token claims and decides whether a request may proceed,
//! enforcing branch isolation for callers that are not privileged.
//! Framework adapters live in `campus-gateway`; this crate has no HTTP
//! dependency.

pub mod guards;
pub mod prelude;

pub use guards::*;
