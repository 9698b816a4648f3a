//! # Design
//!
//! - Structured, constant-message errors for the relocation pipeline.
//! - Only enumeration failures abort a cycle; everything else is folded into a
//!   per-replica or per-object outcome by the orchestrator.

use std::time::Duration;

use ousort_directory::DirectoryError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors produced by the relocation engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A routing rule could not be compiled.
    #[error("engine invalid rule")]
    InvalidRule {
        /// Position of the rule in the configured list.
        index: usize,
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// Replica enumeration failed; nothing can be scanned.
    #[error("engine replica discovery failed")]
    Discovery {
        /// Underlying directory error.
        source: DirectoryError,
    },
    /// A fresh lookup found no object with the given name.
    #[error("object not found")]
    ObjectNotFound {
        /// Name that was looked up.
        name: String,
    },
    /// A directory read needed to decide an outcome failed.
    #[error("engine directory lookup failed")]
    Lookup {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Object name or path involved.
        target: String,
        /// Underlying directory error.
        source: DirectoryError,
    },
}

impl EngineError {
    pub(crate) fn lookup(
        operation: &'static str,
        target: impl Into<String>,
        source: DirectoryError,
    ) -> Self {
        Self::Lookup {
            operation,
            target: target.into(),
            source,
        }
    }

    /// Operator-facing detail including context and source.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidRule {
                index,
                field,
                reason,
                value,
            } => format!(
                "{self}: rules[{index}].{field}={}: {reason}",
                value.as_deref().unwrap_or("<none>")
            ),
            Self::Discovery { source } => format!("{self}: {}", source.describe()),
            Self::ObjectNotFound { .. } => self.to_string(),
            Self::Lookup {
                operation,
                target,
                source,
            } => format!("{self}: {operation} {target}: {}", source.describe()),
        }
    }
}

/// Why one replica contributed no candidates.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scan did not finish within the per-replica timeout.
    #[error("replica scan timed out")]
    Timeout {
        /// Configured timeout.
        after: Duration,
    },
    /// The directory reported an error.
    #[error("replica scan failed")]
    Directory {
        /// Underlying directory error.
        source: DirectoryError,
    },
    /// The scan task panicked or was cancelled.
    #[error("replica scan aborted")]
    Aborted {
        /// Join error rendered as text.
        detail: String,
    },
}

impl ScanError {
    /// Operator-facing detail.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Timeout { after } => format!("{self} after {}s", after.as_secs_f64()),
            Self::Directory { source } => format!("{self}: {}", source.describe()),
            Self::Aborted { detail } => format!("{self}: {detail}"),
        }
    }
}
