//! # Design
//!
//! - Centralize invocation-level errors for bootstrap and cycle execution.
//! - Keep error messages constant while carrying the operation and source.
//! - Each variant owns exactly one exit code so schedulers can tell failure
//!   classes apart.

use ousort_config::ConfigError;
use ousort_directory::DirectoryError;
use ousort_engine::EngineError;
use ousort_events::EventRecordError;
use ousort_telemetry::TelemetryError;
use thiserror::Error;

/// Result alias for invocation operations.
pub type AppResult<T> = Result<T, AppError>;

/// Exit code for configuration and usage errors.
pub const EXIT_CONFIG: i32 = 2;
/// Exit code when the directory cannot be reached or bound.
pub const EXIT_CONNECT: i32 = 3;
/// Exit code when replica discovery fails.
pub const EXIT_DISCOVERY: i32 = 4;
/// Exit code when logging or telemetry cannot start.
pub const EXIT_TELEMETRY: i32 = 5;
/// Exit code when an event record cannot be used.
pub const EXIT_EVENT_RECORD: i32 = 6;

/// Invocation-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded or validated.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: ConfigError,
    },
    /// Logging or metrics could not be initialised.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: TelemetryError,
    },
    /// The directory connection or bind failed.
    #[error("directory operation failed")]
    Directory {
        /// Operation identifier.
        operation: &'static str,
        /// Source directory error.
        source: DirectoryError,
    },
    /// The engine refused to build or run.
    #[error("relocation engine operation failed")]
    Engine {
        /// Operation identifier.
        operation: &'static str,
        /// Source engine error.
        source: EngineError,
    },
    /// The change-notification record could not be used.
    #[error("event record operation failed")]
    EventRecord {
        /// Operation identifier.
        operation: &'static str,
        /// Source record error.
        source: EventRecordError,
    },
    /// The cycle summary could not be rendered.
    #[error("output rendering failed")]
    Output {
        /// Source rendering error.
        source: anyhow::Error,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(operation: &'static str, source: TelemetryError) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn directory(operation: &'static str, source: DirectoryError) -> Self {
        Self::Directory { operation, source }
    }

    pub(crate) const fn engine(operation: &'static str, source: EngineError) -> Self {
        Self::Engine { operation, source }
    }

    pub(crate) const fn event_record(operation: &'static str, source: EventRecordError) -> Self {
        Self::EventRecord { operation, source }
    }

    /// Process exit code for the failure class.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => EXIT_CONFIG,
            Self::Telemetry { .. } => EXIT_TELEMETRY,
            Self::Directory { .. } => EXIT_CONNECT,
            Self::Engine { source, .. } => match source {
                EngineError::Discovery { .. } => EXIT_DISCOVERY,
                EngineError::InvalidRule { .. } => EXIT_CONFIG,
                EngineError::ObjectNotFound { .. } | EngineError::Lookup { .. } => 1,
            },
            Self::EventRecord { .. } => EXIT_EVENT_RECORD,
            Self::Output { .. } => 1,
        }
    }

    /// Operator-facing message including context and source detail.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::Config { operation, source } => format!("{self} ({operation}): {}", source.detail()),
            Self::Telemetry { operation, source } => format!("{self} ({operation}): {source}"),
            Self::Directory { operation, source } => {
                format!("{self} ({operation}): {}", source.describe())
            }
            Self::Engine { operation, source } => format!("{self} ({operation}): {}", source.detail()),
            Self::EventRecord { operation, source } => match source {
                EventRecordError::Io { origin, source: io } => {
                    format!("{self} ({operation}): {source}: {origin}: {io}")
                }
                EventRecordError::Malformed { source: json } => {
                    format!("{self} ({operation}): {source}: {json}")
                }
                EventRecordError::UnsupportedEvent { event_id } => {
                    format!("{self} ({operation}): {source}: {event_id}")
                }
                EventRecordError::MissingField { field } => {
                    format!("{self} ({operation}): {source}: {field}")
                }
            },
            Self::Output { source } => format!("{self}: {source:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_failure_class() {
        let config = AppError::config(
            "config.load",
            ConfigError::MissingSecret {
                variable: "OUSORT_BIND_PASSWORD".into(),
            },
        );
        assert_eq!(config.exit_code(), EXIT_CONFIG);

        let connect = AppError::directory(
            "directory.connect",
            DirectoryError::Malformed {
                field: "directory.url",
                value: None,
            },
        );
        assert_eq!(connect.exit_code(), EXIT_CONNECT);

        let discovery = AppError::engine(
            "engine.run_cycle",
            EngineError::Discovery {
                source: DirectoryError::NotFound { name: "dc".into() },
            },
        );
        assert_eq!(discovery.exit_code(), EXIT_DISCOVERY);

        let rule = AppError::engine(
            "engine.new",
            EngineError::InvalidRule {
                index: 0,
                field: "pattern",
                reason: "invalid regular expression",
                value: None,
            },
        );
        assert_eq!(rule.exit_code(), EXIT_CONFIG);

        let record = AppError::event_record(
            "event.read",
            EventRecordError::UnsupportedEvent { event_id: 4624 },
        );
        assert_eq!(record.exit_code(), EXIT_EVENT_RECORD);
    }

    #[test]
    fn display_message_carries_context() {
        let error = AppError::config(
            "config.secret",
            ConfigError::MissingSecret {
                variable: "OUSORT_BIND_PASSWORD".into(),
            },
        );
        assert_eq!(
            error.display_message(),
            "configuration operation failed (config.secret): configuration secret missing: \
             environment variable OUSORT_BIND_PASSWORD is not set"
        );

        let record = AppError::event_record(
            "event.parse",
            EventRecordError::UnsupportedEvent { event_id: 4624 },
        );
        assert_eq!(
            record.display_message(),
            "event record operation failed (event.parse): unsupported event id: 4624"
        );
    }
}
