//! Typed configuration model.
//!
//! # Design
//! - Every section carries serde defaults so a minimal file only names the
//!   directory endpoint and the rules.
//! - Unknown keys are rejected to surface typos at startup.
//! - The value is built once and shared immutably afterwards.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Scheduling and scan window settings.
    #[serde(default)]
    pub polling: PollingConfig,
    /// Processed-marker settings.
    #[serde(default)]
    pub markers: MarkerConfig,
    /// Retry policy for failed moves.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Directory endpoint and search settings.
    pub directory: DirectoryConfig,
    /// Optional metrics export.
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Ordered routing rules; first match wins.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl AppConfig {
    /// Apply a command-line poll interval override.
    ///
    /// The lookback window is raised to twice the new interval when it would
    /// otherwise fall below that.
    #[must_use]
    pub fn with_interval_override(mut self, minutes: u32) -> Self {
        self.polling.interval_minutes = minutes;
        let floor = minutes.saturating_mul(2);
        if self.polling.lookback_minutes < floor {
            self.polling.lookback_minutes = floor;
        }
        self
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-field lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Directory holding the active log, archives and transcripts.
    pub directory: PathBuf,
    /// Active log file name.
    pub file_name: String,
    /// Size threshold that triggers rotation.
    pub rotate_bytes: u64,
    /// Number of rotated archives retained.
    pub keep_files: usize,
    /// Write a per-run transcript file.
    pub transcript: bool,
    /// Default level directive when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(defaults::LOG_DIRECTORY),
            file_name: defaults::LOG_FILE_NAME.to_string(),
            rotate_bytes: defaults::LOG_ROTATE_BYTES,
            keep_files: defaults::LOG_KEEP_FILES,
            transcript: false,
            level: defaults::LOG_LEVEL.to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Scheduling and scan window settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingConfig {
    /// Minutes between scheduled invocations.
    pub interval_minutes: u32,
    /// Minutes before "now" scanned each cycle.
    pub lookback_minutes: u32,
    /// Per-replica scan timeout in seconds.
    pub replica_timeout_secs: u64,
    /// Scan replicas concurrently.
    pub parallel_scans: bool,
}

impl PollingConfig {
    /// Per-replica scan timeout.
    #[must_use]
    pub const fn replica_timeout(&self) -> Duration {
        Duration::from_secs(self.replica_timeout_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_minutes: defaults::POLL_INTERVAL_MINUTES,
            lookback_minutes: defaults::LOOKBACK_MINUTES,
            replica_timeout_secs: defaults::REPLICA_TIMEOUT_SECS,
            parallel_scans: true,
        }
    }
}

/// Processed-marker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkerConfig {
    /// Extended attribute holding the marker.
    pub attribute: String,
    /// Days a marker suppresses reprocessing.
    pub retention_days: u32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            attribute: defaults::MARKER_ATTRIBUTE.to_string(),
            retention_days: defaults::MARKER_RETENTION_DAYS,
        }
    }
}

/// Retry policy for objects whose move failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Allow `failed` objects to be picked up again before marker expiry.
    pub enabled: bool,
    /// Total processing attempts allowed.
    pub max_attempts: u32,
    /// Minutes a failed marker must age before the next attempt.
    pub interval_minutes: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: defaults::RETRY_MAX_ATTEMPTS,
            interval_minutes: defaults::RETRY_INTERVAL_MINUTES,
        }
    }
}

/// Directory endpoint and search settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    /// Primary endpoint, `ldap://host[:port]`.
    pub url: String,
    /// Bind DN.
    pub bind_dn: String,
    /// Environment variable carrying the bind password.
    #[serde(default = "default_bind_password_env")]
    pub bind_password_env: String,
    /// Naming context for object lookups.
    pub base_dn: String,
    /// Subtree scanned for new objects; defaults to `base_dn`.
    #[serde(default)]
    pub search_base: Option<String>,
    /// Object class of relocatable objects.
    #[serde(default = "default_object_class")]
    pub object_class: String,
    /// Static replica host names replacing discovery.
    #[serde(default)]
    pub replicas: Vec<String>,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl DirectoryConfig {
    /// Subtree scanned for new objects.
    #[must_use]
    pub fn search_base(&self) -> &str {
        self.search_base.as_deref().unwrap_or(&self.base_dn)
    }

    /// Connection timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_bind_password_env() -> String {
    defaults::BIND_PASSWORD_ENV.to_string()
}

fn default_object_class() -> String {
    defaults::OBJECT_CLASS.to_string()
}

const fn default_connect_timeout_secs() -> u64 {
    defaults::CONNECT_TIMEOUT_SECS
}

/// Optional metrics export.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Prometheus text-format output file.
    pub textfile: Option<PathBuf>,
}

/// One routing rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Case-insensitive regular expression matched against the object name.
    pub pattern: String,
    /// Destination container DN.
    pub destination: String,
    /// Optional human-readable label.
    #[serde(default)]
    pub label: Option<String>,
}
