// Shared helpers for subcommands

use campus_core::{CampusConfig, CampusResult};
use campus_guards::GuardConfig;
use std::path::Path;
use tracing::debug;

/// Load the guard configuration: file (if present), then environment, then
/// validation.
pub fn load_config(path: &Path) -> CampusResult<GuardConfig> {
    debug!(path = %path.display(), "loading guard configuration");
    let mut config = GuardConfig::load_or_default(path)?;
    config.merge_with_env()?;
    config.validate()?;
    Ok(config)
}
