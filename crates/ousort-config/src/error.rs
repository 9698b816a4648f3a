//! Error types for configuration loading and validation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration file failed.
    #[error("configuration file unreadable")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path that was accessed.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The document is not valid YAML for the configuration model.
    #[error("configuration document invalid")]
    Parse {
        /// Origin of the document (path or `<inline>`).
        origin: String,
        /// Source parse error.
        source: serde_yaml::Error,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: String,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// A secret referenced by the configuration was not provided.
    #[error("configuration secret missing")]
    MissingSecret {
        /// Environment variable expected to carry the secret.
        variable: String,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        field: impl Into<String>,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field: field.into(),
            value,
            reason,
        }
    }

    /// Render the error together with its context for operator output.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Io {
                operation,
                path,
                source,
            } => format!("{self}: {operation} {}: {source}", path.display()),
            Self::Parse { origin, source } => format!("{self}: {origin}: {source}"),
            Self::InvalidField {
                section,
                field,
                value,
                reason,
            } => match value {
                Some(value) => format!("{self}: {section}.{field}={value}: {reason}"),
                None => format!("{self}: {section}.{field}: {reason}"),
            },
            Self::MissingSecret { variable } => {
                format!("{self}: environment variable {variable} is not set")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_renders_field_context() {
        let error = ConfigError::invalid(
            "polling",
            "lookback_minutes",
            Some("10".into()),
            "must exceed interval_minutes",
        );
        assert_eq!(
            error.detail(),
            "invalid configuration field: polling.lookback_minutes=10: must exceed interval_minutes"
        );
        let missing = ConfigError::MissingSecret {
            variable: "OUSORT_BIND_PASSWORD".into(),
        };
        assert!(missing.detail().contains("OUSORT_BIND_PASSWORD"));
    }
}
