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

//! File-backed configuration for the relocation service.
//!
//! Layout: `model.rs` (typed sections with serde defaults), `defaults.rs`
//! (default values), `loader.rs` (path resolution and YAML parsing),
//! `validate.rs` (cross-field validation producing warnings or errors).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_ENV_VAR, LoadedConfig, load_from_path, parse_str, resolve_config_path};
pub use model::{
    AppConfig, DirectoryConfig, LogFormat, LoggingConfig, MarkerConfig, MetricsConfig,
    PollingConfig, RetryConfig, RuleConfig,
};
pub use validate::{ValidationWarning, validate};
