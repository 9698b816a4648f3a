//! Cross-field validation for loaded configuration documents.

use std::fmt;

use regex::RegexBuilder;
use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{AppConfig, RuleConfig};

/// Names a catch-all rule must accept.
const CATCH_ALL_PROBES: [&str; 5] = ["A", "z", "0", "PC-01", "_"];

/// Non-fatal configuration finding surfaced at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Section containing the field.
    pub section: &'static str,
    /// Field the warning concerns.
    pub field: String,
    /// Operator-facing description.
    pub message: String,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.section, self.field, self.message)
    }
}

/// Validate a parsed configuration.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for the first invalid field found.
pub fn validate(config: &AppConfig) -> ConfigResult<Vec<ValidationWarning>> {
    let mut warnings = Vec::new();
    validate_logging(config)?;
    validate_polling(config, &mut warnings)?;
    validate_markers(config)?;
    validate_directory(config)?;
    validate_rules(&config.rules, &mut warnings)?;
    Ok(warnings)
}

fn validate_logging(config: &AppConfig) -> ConfigResult<()> {
    let logging = &config.logging;
    if logging.file_name.trim().is_empty() {
        return Err(ConfigError::invalid(
            "logging",
            "file_name",
            None,
            "must not be empty",
        ));
    }
    if logging.rotate_bytes == 0 {
        return Err(ConfigError::invalid(
            "logging",
            "rotate_bytes",
            Some("0".into()),
            "must be positive",
        ));
    }
    Ok(())
}

fn validate_polling(config: &AppConfig, warnings: &mut Vec<ValidationWarning>) -> ConfigResult<()> {
    let polling = &config.polling;
    if polling.interval_minutes == 0 {
        return Err(ConfigError::invalid(
            "polling",
            "interval_minutes",
            Some("0".into()),
            "must be positive",
        ));
    }
    if polling.lookback_minutes <= polling.interval_minutes {
        return Err(ConfigError::invalid(
            "polling",
            "lookback_minutes",
            Some(polling.lookback_minutes.to_string()),
            "must exceed interval_minutes",
        ));
    }
    if polling.lookback_minutes < polling.interval_minutes.saturating_mul(2) {
        warnings.push(ValidationWarning {
            section: "polling",
            field: "lookback_minutes".into(),
            message: format!(
                "lookback of {} minutes is less than twice the {} minute interval; late replication may be missed",
                polling.lookback_minutes, polling.interval_minutes
            ),
        });
    }
    if polling.replica_timeout_secs == 0 {
        return Err(ConfigError::invalid(
            "polling",
            "replica_timeout_secs",
            Some("0".into()),
            "must be positive",
        ));
    }

    let retry = &config.retry;
    if retry.enabled {
        if retry.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "retry",
                "max_attempts",
                Some("0".into()),
                "must be at least 1 when retry is enabled",
            ));
        }
        if retry.interval_minutes == 0 {
            return Err(ConfigError::invalid(
                "retry",
                "interval_minutes",
                Some("0".into()),
                "must be positive when retry is enabled",
            ));
        }
    }
    Ok(())
}

fn validate_markers(config: &AppConfig) -> ConfigResult<()> {
    let markers = &config.markers;
    if markers.attribute.trim().is_empty() {
        return Err(ConfigError::invalid(
            "markers",
            "attribute",
            None,
            "must not be empty",
        ));
    }
    if markers.retention_days == 0 {
        return Err(ConfigError::invalid(
            "markers",
            "retention_days",
            Some("0".into()),
            "must be at least 1 day",
        ));
    }
    Ok(())
}

fn validate_directory(config: &AppConfig) -> ConfigResult<()> {
    let directory = &config.directory;
    let url = Url::parse(&directory.url).map_err(|_| {
        ConfigError::invalid(
            "directory",
            "url",
            Some(directory.url.clone()),
            "must be an absolute URL",
        )
    })?;
    if url.scheme() != "ldap" {
        return Err(ConfigError::invalid(
            "directory",
            "url",
            Some(directory.url.clone()),
            "scheme must be ldap",
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::invalid(
            "directory",
            "url",
            Some(directory.url.clone()),
            "must name a host",
        ));
    }
    for (field, value) in [
        ("bind_dn", &directory.bind_dn),
        ("base_dn", &directory.base_dn),
        ("object_class", &directory.object_class),
        ("bind_password_env", &directory.bind_password_env),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::invalid(
                "directory",
                field,
                None,
                "must not be empty",
            ));
        }
    }
    if directory.connect_timeout_secs == 0 {
        return Err(ConfigError::invalid(
            "directory",
            "connect_timeout_secs",
            Some("0".into()),
            "must be positive",
        ));
    }
    if let Some(index) = directory
        .replicas
        .iter()
        .position(|replica| replica.trim().is_empty())
    {
        return Err(ConfigError::invalid(
            "directory",
            format!("replicas[{index}]"),
            None,
            "must not be empty",
        ));
    }
    Ok(())
}

fn validate_rules(rules: &[RuleConfig], warnings: &mut Vec<ValidationWarning>) -> ConfigResult<()> {
    if rules.is_empty() {
        return Err(ConfigError::invalid(
            "rules",
            "rules",
            None,
            "at least one rule is required",
        ));
    }
    let mut last_is_catch_all = false;
    for (index, rule) in rules.iter().enumerate() {
        let regex = RegexBuilder::new(&rule.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|_| {
                ConfigError::invalid(
                    "rules",
                    format!("[{index}].pattern"),
                    Some(rule.pattern.clone()),
                    "must be a valid regular expression",
                )
            })?;
        if rule.destination.trim().is_empty() {
            return Err(ConfigError::invalid(
                "rules",
                format!("[{index}].destination"),
                None,
                "must not be empty",
            ));
        }
        last_is_catch_all = CATCH_ALL_PROBES.iter().all(|probe| regex.is_match(probe));
    }
    if !last_is_catch_all {
        warnings.push(ValidationWarning {
            section: "rules",
            field: format!("[{}]", rules.len() - 1),
            message: "last rule is not a catch-all; unmatched objects will be skipped".into(),
        });
    }
    Ok(())
}
