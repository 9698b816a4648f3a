//! # Design
//!
//! - Constant error messages; the target and operation travel as fields.
//! - Provider errors are boxed so test doubles and the LDAP adapter share one type.
//! - `describe` renders the context for log lines and outcome details.

use std::error::Error;

use thiserror::Error;

/// Result alias for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors surfaced by a directory service implementation.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory endpoint could not be reached or the bind failed at transport level.
    #[error("directory connection failed")]
    Connection {
        /// Endpoint or replica the connection targeted.
        target: String,
        /// Underlying provider error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A request reached the directory but failed in transit.
    #[error("directory operation failed")]
    Operation {
        /// Operation identifier.
        operation: &'static str,
        /// Object, path, or replica the operation targeted.
        target: String,
        /// Underlying provider error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The directory answered with a non-success result code.
    #[error("directory operation rejected")]
    Rejected {
        /// Operation identifier.
        operation: &'static str,
        /// Object, path, or replica the operation targeted.
        target: String,
        /// Result code returned by the directory.
        code: u32,
        /// Diagnostic text returned by the directory.
        message: String,
    },
    /// The named object does not exist.
    #[error("directory object not found")]
    NotFound {
        /// Name that was looked up.
        name: String,
    },
    /// A directory response did not carry an expected value.
    #[error("directory response malformed")]
    Malformed {
        /// Attribute or field that was missing or invalid.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl DirectoryError {
    pub(crate) fn connection(
        target: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            target: target.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn operation(
        operation: &'static str,
        target: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self::Operation {
            operation,
            target: target.into(),
            source: Box::new(source),
        }
    }

    /// Whether the error means the target object or path does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
            || matches!(self, Self::Rejected { code: 32, .. })
    }

    /// Render the error together with its context fields and source chain.
    #[must_use]
    pub fn describe(&self) -> String {
        let context = match self {
            Self::Connection { target, .. } => format!("target={target}"),
            Self::Operation {
                operation, target, ..
            } => format!("operation={operation} target={target}"),
            Self::Rejected {
                operation,
                target,
                code,
                message,
            } => format!("operation={operation} target={target} code={code} message={message}"),
            Self::NotFound { name } => format!("name={name}"),
            Self::Malformed { field, value } => format!(
                "field={field} value={}",
                value.as_deref().unwrap_or("<none>")
            ),
        };
        let mut rendered = format!("{self} ({context})");
        let mut source = self.source();
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        rendered
    }
}
