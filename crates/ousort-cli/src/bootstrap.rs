//! Invocation wiring: configuration, logging, directory connection, engine.
//!
//! # Design
//! - Steps run in a fixed order and each maps onto its own exit code:
//!   configuration, logging, event record, directory bind, cycle.
//! - Configuration is loaded once into an immutable value and passed by
//!   reference from here on.
//! - The metrics textfile is best effort; a write failure is logged only.

use std::path::Path;
use std::sync::Arc;

use ousort_config::{AppConfig, ConfigError, LoadedConfig, load_from_path, resolve_config_path};
use ousort_directory::{DirectoryService, LdapDirectory, LdapSettings};
use ousort_engine::{CycleResult, RelocationEngine};
use ousort_events::{NewObjectNotice, read_record};
use ousort_telemetry::{GlobalContextGuard, LoggingConfig, LoggingHandle, Metrics, init_logging};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// What a single invocation should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RunMode {
    /// Scan the lookback window across all replicas.
    Poll,
    /// Process the object named by a change notification.
    Event(NewObjectNotice),
}

impl RunMode {
    pub(crate) const fn label(&self) -> &'static str {
        match self {
            Self::Poll => "poll",
            Self::Event(_) => "event",
        }
    }
}

/// Load and validate configuration, applying the interval override.
pub(crate) fn load_config(
    explicit: Option<&Path>,
    interval_override: Option<u32>,
) -> AppResult<LoadedConfig> {
    let path = resolve_config_path(explicit, None);
    let mut loaded =
        load_from_path(&path).map_err(|err| AppError::config("config.load", err))?;
    if let Some(minutes) = interval_override {
        loaded.config = loaded.config.with_interval_override(minutes);
    }
    Ok(loaded)
}

/// Install logging as configured.
pub(crate) fn start_logging(config: &AppConfig) -> AppResult<LoggingHandle> {
    let logging = &config.logging;
    let settings = LoggingConfig {
        level: &logging.level,
        format: match logging.format {
            ousort_config::LogFormat::Pretty => ousort_telemetry::LogFormat::Pretty,
            ousort_config::LogFormat::Json => ousort_telemetry::LogFormat::Json,
        },
        directory: Some(logging.directory.as_path()),
        file_name: &logging.file_name,
        rotate_bytes: logging.rotate_bytes,
        keep_files: logging.keep_files,
        transcript: logging.transcript,
        ..LoggingConfig::default()
    };
    init_logging(&settings).map_err(|err| AppError::telemetry("telemetry.init_logging", err))
}

/// Log the warnings collected while validating configuration.
pub(crate) fn report_warnings(loaded: &LoadedConfig) {
    for warning in &loaded.warnings {
        warn!(
            config = %loaded.source.display(),
            section = warning.section,
            field = %warning.field,
            "{}",
            warning.message
        );
    }
}

/// Read the change-notification record named on the command line.
pub(crate) fn read_notice(source: &Path) -> AppResult<NewObjectNotice> {
    read_record(source)
        .and_then(ousort_events::AccountCreatedRecord::into_notice)
        .map_err(|err| AppError::event_record("event.read", err))
}

/// Resolve the bind password from the value of its environment variable.
pub(crate) fn bind_password(variable: &str, value: Option<String>) -> AppResult<String> {
    value
        .filter(|secret| !secret.is_empty())
        .ok_or_else(|| {
            AppError::config(
                "config.bind_password",
                ConfigError::MissingSecret {
                    variable: variable.to_string(),
                },
            )
        })
}

/// Map configuration onto LDAP connection settings.
pub(crate) fn ldap_settings(config: &AppConfig, bind_password: String) -> LdapSettings {
    let directory = &config.directory;
    LdapSettings {
        url: directory.url.clone(),
        bind_dn: directory.bind_dn.clone(),
        bind_password,
        base_dn: directory.base_dn.clone(),
        object_class: directory.object_class.clone(),
        replicas: directory.replicas.clone(),
        connect_timeout: directory.connect_timeout(),
    }
}

/// Run one invocation end to end against the LDAP directory.
pub(crate) async fn run_invocation(
    loaded: &LoadedConfig,
    mode: &RunMode,
    simulate: bool,
) -> AppResult<CycleResult> {
    let config = &loaded.config;
    let _context = GlobalContextGuard::new(mode.label());
    info!(
        config = %loaded.source.display(),
        warnings = loaded.warnings.len(),
        simulate,
        "ousort starting"
    );

    let variable = &config.directory.bind_password_env;
    let password = bind_password(variable, std::env::var(variable).ok())?;
    let directory = Arc::new(
        LdapDirectory::connect(ldap_settings(config, password))
            .await
            .map_err(|err| AppError::directory("directory.connect", err))?,
    );

    let result = run_with_directory(directory.clone(), config, mode, simulate).await;
    directory.close().await;
    result
}

/// Build the engine over `directory`, run the requested mode and export metrics.
pub(crate) async fn run_with_directory(
    directory: Arc<dyn DirectoryService>,
    config: &AppConfig,
    mode: &RunMode,
    simulate: bool,
) -> AppResult<CycleResult> {
    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let engine = RelocationEngine::new(directory, config, metrics.clone())
        .map_err(|err| AppError::engine("engine.new", err))?
        .simulate(simulate);

    let result = match mode {
        RunMode::Poll => engine
            .run_cycle()
            .await
            .map_err(|err| AppError::engine("engine.run_cycle", err))?,
        RunMode::Event(notice) => {
            info!(
                name = %notice.name,
                domain = notice.domain.as_deref().unwrap_or("-"),
                "processing object from change notification"
            );
            engine.process_single(&notice.name).await
        }
    };

    if let Some(path) = &config.metrics.textfile
        && let Err(err) = metrics.write_textfile(path)
    {
        warn!(path = %path.display(), error = %err, "metrics textfile not written");
    }
    Ok(result)
}
