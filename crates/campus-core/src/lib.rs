//! Campus Core - shared foundation for branch-scoped access control
//!
//! This crate holds the vocabulary every other Campus crate speaks:
//!
//! - `CampusError` / `CampusResult`: the unified error type
//! - `BranchId` / `RoleName`: typed identifiers lifted out of token claims
//! - `CampusConfig`: file + environment configuration loading
//!
//! It contains no request handling and no policy; those live in
//! `campus-guards` and `campus-gateway`.

#![forbid(unsafe_code)]

/// Configuration loading, merging and validation traits
pub mod config;

/// Unified error handling
pub mod errors;

/// Branch and role identifiers
pub mod identifiers;

pub use config::{split_list, CampusConfig};
pub use errors::{CampusError, CampusResult, ErrorCode};
pub use identifiers::{BranchId, RoleName};
