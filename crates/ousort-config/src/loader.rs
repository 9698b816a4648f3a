//! Configuration path resolution and YAML loading.
//!
//! # Design
//! - Precedence: explicit path, then `OUSORT_CONFIG`, then the default path.
//! - Parsing and validation happen once; warnings are returned to the caller,
//!   which logs them once a subscriber is installed.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::AppConfig;
use crate::validate::{ValidationWarning, validate};

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV_VAR: &str = "OUSORT_CONFIG";

/// Validated configuration plus load diagnostics.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The validated configuration value.
    pub config: AppConfig,
    /// File the configuration was read from.
    pub source: PathBuf,
    /// Non-fatal findings from validation.
    pub warnings: Vec<ValidationWarning>,
}

/// Pick the configuration path from an explicit argument, the environment, or the default.
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>, env_value: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match env_value.map(str::trim) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(defaults::CONFIG_PATH),
    }
}

/// Read, parse and validate a configuration file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read,
/// [`ConfigError::Parse`] for malformed YAML or unknown keys, and
/// [`ConfigError::InvalidField`] when validation fails.
pub fn load_from_path(path: &Path) -> ConfigResult<LoadedConfig> {
    debug!(path = %path.display(), "loading configuration");
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "config.read",
        path: path.to_path_buf(),
        source,
    })?;
    let (config, warnings) = parse_document(&raw, &path.display().to_string())?;
    Ok(LoadedConfig {
        config,
        source: path.to_path_buf(),
        warnings,
    })
}

/// Parse and validate an in-memory configuration document.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] or [`ConfigError::InvalidField`].
pub fn parse_str(raw: &str) -> ConfigResult<AppConfig> {
    parse_document(raw, "<inline>").map(|(config, _)| config)
}

fn parse_document(raw: &str, origin: &str) -> ConfigResult<(AppConfig, Vec<ValidationWarning>)> {
    let config: AppConfig = serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
        origin: origin.to_string(),
        source,
    })?;
    let warnings = validate(&config)?;
    Ok((config, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins_over_environment() {
        let explicit = PathBuf::from("/tmp/explicit.yaml");
        assert_eq!(
            resolve_config_path(Some(&explicit), Some("/tmp/env.yaml")),
            explicit
        );
        assert_eq!(
            resolve_config_path(None, Some("/tmp/env.yaml")),
            PathBuf::from("/tmp/env.yaml")
        );
        assert_eq!(
            resolve_config_path(None, Some("  ")),
            PathBuf::from(defaults::CONFIG_PATH)
        );
        assert_eq!(
            resolve_config_path(None, None),
            PathBuf::from(defaults::CONFIG_PATH)
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let raw = r#"
directory:
  url: ldap://dc01.example.com
  bind_dn: CN=svc,DC=example,DC=com
  base_dn: DC=example,DC=com
polling:
  interval_minute: 5
rules:
  - pattern: ".*"
    destination: OU=Quarantine,DC=example,DC=com
"#;
        assert!(matches!(parse_str(raw), Err(ConfigError::Parse { .. })));
    }
}
