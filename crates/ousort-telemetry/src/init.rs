//! Telemetry initialisation primitives and logging configuration.
//!
//! # Design
//! - Centralises logging setup (fmt or JSON) with a single entry point.
//! - Records the build identifier once to avoid inconsistencies across modules.
//! - Fans every event out to stderr, the rotating log file and, when enabled,
//!   a per-run transcript; `RUST_LOG` overrides the configured level.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use once_cell::sync::OnceCell;
use tracing_subscriber::field::RecordFields;
use tracing_subscriber::fmt::format::{DefaultFields, Writer};
use tracing_subscriber::fmt::{FormatFields, MakeWriter};
use tracing_subscriber::registry::Registry;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};
use crate::log_file::RotatingFile;

/// Default logging target when `RUST_LOG` is not provided.
pub const DEFAULT_LOG_LEVEL: &str = "info";

static BUILD_SHA: OnceCell<String> = OnceCell::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Log level string (e.g., `info`, `debug`).
    pub level: &'a str,
    /// Output format selection for the tracing subscriber.
    pub format: LogFormat,
    /// Build identifier recorded in structured logs.
    pub build_sha: &'a str,
    /// Directory for the log file and transcripts; `None` logs to stderr only.
    pub directory: Option<&'a Path>,
    /// Active log file name inside `directory`.
    pub file_name: &'a str,
    /// Rotation threshold in bytes.
    pub rotate_bytes: u64,
    /// Rotated archives kept.
    pub keep_files: usize,
    /// Write a per-run transcript copy.
    pub transcript: bool,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
            build_sha: build_sha(),
            directory: None,
            file_name: "ousort.log",
            rotate_bytes: 10 * 1024 * 1024,
            keep_files: 5,
            transcript: false,
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Emit logs as structured JSON objects.
    Json,
    /// Emit human-readable log lines.
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Files opened by [`init_logging`].
#[derive(Debug, Clone, Default)]
pub struct LoggingHandle {
    log_path: Option<PathBuf>,
    transcript_path: Option<PathBuf>,
}

impl LoggingHandle {
    /// Active rotating log file, when file logging is on.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Transcript for this run, when enabled.
    #[must_use]
    pub fn transcript_path(&self) -> Option<&Path> {
        self.transcript_path.as_deref()
    }
}

/// Access the build identifier recorded during logging initialisation.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or("dev", String::as_str)
}

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the log directory or files cannot be opened, or if the
/// subscriber cannot be installed (for example, because another subscriber
/// has already been set globally).
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingHandle> {
    BUILD_SHA
        .set(config.build_sha.to_string())
        .ok()
        .or(Some(()));

    let (layers, handle) = build_layers(config)?;
    tracing_subscriber::registry()
        .with(layers)
        .with(build_env_filter(config.level))
        .try_init()
        .map_err(|source| TelemetryError::SubscriberInstall { source })?;
    Ok(handle)
}

fn build_layers(config: &LoggingConfig) -> Result<(Vec<BoxedLayer>, LoggingHandle)> {
    let mut layers = vec![fmt_layer(config.format, std::io::stderr, true)];
    let mut handle = LoggingHandle::default();

    let Some(directory) = config.directory else {
        return Ok((layers, handle));
    };
    fs::create_dir_all(directory).map_err(|source| TelemetryError::LogDirectory {
        path: directory.to_path_buf(),
        source,
    })?;

    let rotating = RotatingFile::open(
        directory,
        config.file_name,
        config.rotate_bytes,
        config.keep_files,
    )
    .map_err(|source| TelemetryError::LogFile {
        path: directory.join(config.file_name),
        source,
    })?;
    handle.log_path = Some(rotating.path().to_path_buf());
    layers.push(fmt_layer(config.format, rotating, false));

    if config.transcript {
        let path = transcript_path(directory);
        let file = File::create(&path).map_err(|source| TelemetryError::LogFile {
            path: path.clone(),
            source,
        })?;
        layers.push(fmt_layer(config.format, Mutex::new(file), false));
        handle.transcript_path = Some(path);
    }
    Ok((layers, handle))
}

fn fmt_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_ansi(ansi)
        .with_writer(writer);
    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Pretty if ansi => layer.boxed(),
        LogFormat::Pretty => layer.fmt_fields(PlainFields(DefaultFields::new())).boxed(),
    }
}

/// Field formatter for file sinks.
///
/// Span fields are cached per formatter type, so file layers need a type of
/// their own or they reuse the colourised text rendered for stderr.
#[derive(Debug)]
struct PlainFields(DefaultFields);

impl<'writer> FormatFields<'writer> for PlainFields {
    fn format_fields<R: RecordFields>(&self, writer: Writer<'writer>, fields: R) -> std::fmt::Result {
        self.0.format_fields(writer, fields)
    }
}

fn transcript_path(directory: &Path) -> PathBuf {
    directory.join(format!(
        "transcript-{}.log",
        Utc::now().format("%Y%m%dT%H%M%SZ")
    ))
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
