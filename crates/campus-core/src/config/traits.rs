//! Core configuration trait

use crate::{CampusError, CampusResult};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

/// Core trait for Campus configuration types
pub trait CampusConfig: Clone + Default + Send + Sync + DeserializeOwned + 'static {
    /// Prefix for environment overrides, e.g. `CAMPUS_GUARD_`.
    const ENV_PREFIX: &'static str;

    /// Load configuration from a TOML file
    fn load_from_file(path: &Path) -> CampusResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            CampusError::invalid(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise start from defaults
    fn load_or_default(path: &Path) -> CampusResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!(path = %path.display(), "config file absent, using defaults");
            Ok(Self::default())
        }
    }

    /// Merge with process environment variables
    fn merge_with_env(&mut self) -> CampusResult<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Merge with an explicit set of variables.
    ///
    /// Keys without `ENV_PREFIX` are skipped, as are prefixed keys the
    /// config does not recognise. Recognised keys with bad values fail.
    fn merge_with_vars<I>(&mut self, vars: I) -> CampusResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(field) = key.strip_prefix(Self::ENV_PREFIX) else {
                continue;
            };
            match self.set_from_string(&field.to_ascii_lowercase(), &value) {
                Ok(()) => debug!(key = %key, "applied environment override"),
                Err(err) if err.is_not_found() => {
                    debug!(key = %key, "ignoring unknown environment override");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Validate the configuration
    fn validate(&self) -> CampusResult<()>;

    /// Set a configuration value from a string (env or CLI overrides).
    ///
    /// Returns `CampusError::NotFound` for keys the type does not know.
    fn set_from_string(&mut self, key: &str, value: &str) -> CampusResult<()>;
}

/// Split a comma separated override into trimmed, non-empty items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    struct Sample {
        name: String,
        tags: Vec<String>,
    }

    impl CampusConfig for Sample {
        const ENV_PREFIX: &'static str = "SAMPLE_";

        fn validate(&self) -> CampusResult<()> {
            if self.name.is_empty() {
                return Err(CampusError::invalid("name must not be empty"));
            }
            Ok(())
        }

        fn set_from_string(&mut self, key: &str, value: &str) -> CampusResult<()> {
            match key {
                "name" => self.name = value.to_string(),
                "tags" => self.tags = split_list(value),
                other => return Err(CampusError::not_found(format!("unknown key {other}"))),
            }
            Ok(())
        }
    }

    #[test]
    fn split_list_trims_and_drops_blanks() {
        assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn merge_applies_prefixed_and_skips_unknown() {
        let mut sample = Sample::default();
        let vars = vec![
            ("SAMPLE_NAME".to_string(), "campus".to_string()),
            ("SAMPLE_TAGS".to_string(), "x,y".to_string()),
            ("SAMPLE_COLOUR".to_string(), "red".to_string()),
            ("OTHER_NAME".to_string(), "ignored".to_string()),
        ];
        match sample.merge_with_vars(vars) {
            Ok(()) => {}
            Err(err) => panic!("merge failed: {err}"),
        }
        assert_eq!(sample.name, "campus");
        assert_eq!(sample.tags, vec!["x", "y"]);
        assert!(sample.validate().is_ok());
    }

    #[test]
    fn load_from_file_and_missing_file_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = \"north\"\ntags = [\"a\"]").unwrap();
        let loaded = Sample::load_from_file(file.path()).unwrap();
        assert_eq!(loaded.name, "north");
        assert_eq!(loaded.tags, vec!["a"]);

        let dir = tempfile::tempdir().unwrap();
        let fallback = Sample::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert!(fallback.name.is_empty());
    }

    #[test]
    fn load_from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = [").unwrap();
        let err = Sample::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, CampusError::Invalid { .. }));
    }
}
