#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, unused)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Telemetry primitives for the relocation service.
//!
//! Logging goes to stderr and a size-rotated file (plus an optional per-run
//! transcript); cycle metrics are kept in a Prometheus registry and can be
//! exported in text format.

pub mod context;
pub mod error;
pub mod init;
pub mod log_file;
pub mod metrics;

pub use context::{GlobalContextGuard, cycle_span, new_run_id};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, LoggingHandle, build_sha, init_logging};
pub use log_file::RotatingFile;
pub use metrics::{Metrics, MetricsSnapshot};
