//! Record parsing error primitives.

use std::io;

use thiserror::Error;

/// Errors raised while reading or interpreting a change-notification record.
#[derive(Debug, Error)]
pub enum EventRecordError {
    /// The record source could not be read.
    #[error("event record unreadable")]
    Io {
        /// Path or `-` for stdin.
        origin: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The record is not valid JSON for the expected shape.
    #[error("event record malformed")]
    Malformed {
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// The record describes a different audit event.
    #[error("unsupported event id")]
    UnsupportedEvent {
        /// Event id carried by the record.
        event_id: u32,
    },
    /// No usable object name could be derived.
    #[error("event record missing field")]
    MissingField {
        /// Field that was expected to carry the value.
        field: &'static str,
    },
}

/// Result wrapper for record operations.
pub type EventRecordResult<T> = Result<T, EventRecordError>;
