//! Configuration traits for Campus components
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables under a per-type prefix, then validation.

mod traits;

pub use traits::{split_list, CampusConfig};
