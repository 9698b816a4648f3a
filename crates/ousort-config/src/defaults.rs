//! Default values for configuration fields.
//!
//! # Design
//! - Centralize defaults so serde, docs and tests agree.
//! - Time-based defaults stay explicit in their unit.

/// Default configuration file location.
pub const CONFIG_PATH: &str = "/etc/ousort/ousort.yaml";
/// Default log directory.
pub(crate) const LOG_DIRECTORY: &str = "/var/log/ousort";
/// Default active log file name.
pub(crate) const LOG_FILE_NAME: &str = "ousort.log";
/// Rotate the active log once it reaches 10 MiB.
pub(crate) const LOG_ROTATE_BYTES: u64 = 10 * 1024 * 1024;
/// Rotated archives kept on disk.
pub(crate) const LOG_KEEP_FILES: usize = 5;
/// Default log level when `RUST_LOG` is unset.
pub(crate) const LOG_LEVEL: &str = "info";
/// Minutes between scheduled invocations.
pub(crate) const POLL_INTERVAL_MINUTES: u32 = 15;
/// Minutes scanned before "now" on every cycle.
pub(crate) const LOOKBACK_MINUTES: u32 = 60;
/// Per-replica scan timeout.
pub(crate) const REPLICA_TIMEOUT_SECS: u64 = 30;
/// Extended attribute carrying the processed marker.
pub(crate) const MARKER_ATTRIBUTE: &str = "extensionAttribute10";
/// Days after which a marker no longer suppresses processing.
pub(crate) const MARKER_RETENTION_DAYS: u32 = 30;
/// Maximum processing attempts for `failed` objects when retry is enabled.
pub(crate) const RETRY_MAX_ATTEMPTS: u32 = 3;
/// Minutes a `failed` marker must age before a retry.
pub(crate) const RETRY_INTERVAL_MINUTES: u32 = 60;
/// Environment variable carrying the bind password.
pub(crate) const BIND_PASSWORD_ENV: &str = "OUSORT_BIND_PASSWORD";
/// Object class of relocatable objects.
pub(crate) const OBJECT_CLASS: &str = "computer";
/// Directory connection timeout.
pub(crate) const CONNECT_TIMEOUT_SECS: u64 = 10;
