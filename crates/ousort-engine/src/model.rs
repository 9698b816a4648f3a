//! Per-object outcomes and cycle reports.
//!
//! # Design
//! - Outcomes are a closed tagged set; each maps to a marker outcome and a
//!   metrics label.
//! - A cycle report is built once and handed to logging, metrics and the
//!   exit-status decision.

use std::time::Duration;

use chrono::{DateTime, Utc};
use ousort_directory::ReplicaId;
use serde::Serialize;
use uuid::Uuid;

use crate::marker::MarkerOutcome;

/// Terminal outcome for one object within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectOutcome {
    /// Moved, simulated, or already in place.
    Success,
    /// No rule matched the name; skipped, not failed.
    NoRuleMatched,
    /// The rule's destination container does not exist.
    DestinationMissing,
    /// The directory rejected the move, or the object vanished before it.
    MoveFailed,
    /// Any other failure, such as a lookup that could not complete.
    UnexpectedError,
}

impl ObjectOutcome {
    /// Metrics and log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NoRuleMatched => "no_rule_matched",
            Self::DestinationMissing => "destination_missing",
            Self::MoveFailed => "move_failed",
            Self::UnexpectedError => "unexpected_error",
        }
    }

    /// Whether the outcome makes the cycle report failure.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(
            self,
            Self::DestinationMissing | Self::MoveFailed | Self::UnexpectedError
        )
    }

    /// Outcome recorded in the processed marker.
    #[must_use]
    pub const fn marker_outcome(self) -> MarkerOutcome {
        match self {
            Self::Success => MarkerOutcome::Moved,
            Self::NoRuleMatched => MarkerOutcome::NoRuleMatched,
            Self::DestinationMissing => MarkerOutcome::DestinationMissing,
            Self::MoveFailed => MarkerOutcome::Failed,
            Self::UnexpectedError => MarkerOutcome::Error,
        }
    }
}

/// What the relocator did for an object with a resolved destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelocationOutcome {
    /// The object was moved.
    Moved {
        /// Path before the move.
        from: String,
        /// Destination container.
        to: String,
    },
    /// Simulate mode: the move was only logged.
    Simulated {
        /// Current path.
        from: String,
        /// Destination container.
        to: String,
    },
    /// The object already lies under the destination.
    AlreadyInPlace {
        /// Current path.
        path: String,
    },
    /// The destination container does not exist.
    DestinationMissing {
        /// Destination container.
        destination: String,
    },
    /// The directory rejected the move.
    MoveFailed {
        /// Current path.
        from: String,
        /// Provider error detail.
        detail: String,
    },
}

impl RelocationOutcome {
    /// Map onto the terminal object outcome.
    #[must_use]
    pub const fn object_outcome(&self) -> ObjectOutcome {
        match self {
            Self::Moved { .. } | Self::Simulated { .. } | Self::AlreadyInPlace { .. } => {
                ObjectOutcome::Success
            }
            Self::DestinationMissing { .. } => ObjectOutcome::DestinationMissing,
            Self::MoveFailed { .. } => ObjectOutcome::MoveFailed,
        }
    }
}

/// Per-object record in a cycle report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectReport {
    /// Object name.
    pub name: String,
    /// Terminal outcome.
    pub outcome: ObjectOutcome,
    /// Relocator result when a rule matched and the object was found.
    pub relocation: Option<RelocationOutcome>,
    /// Destination of the matching rule.
    pub destination: Option<String>,
    /// Label (or pattern) of the matching rule.
    pub rule: Option<String>,
    /// Failure detail.
    pub detail: Option<String>,
    /// Attempt number recorded in the marker.
    pub attempt: u32,
    /// Whether the marker write succeeded.
    pub marker_written: bool,
    /// Processing latency.
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

/// Per-replica scan record in a cycle report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicaReport {
    /// Replica scanned.
    pub replica: ReplicaId,
    /// Candidates returned (zero on failure).
    pub candidates: usize,
    /// Scan latency.
    #[serde(serialize_with = "serialize_millis")]
    pub latency: Duration,
    /// Failure detail when the scan failed or timed out.
    pub error: Option<String>,
}

/// Overall cycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// No failure outcome.
    Success,
    /// At least one object failed.
    Failure,
}

impl CycleStatus {
    /// Process exit code for the status.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }
}

/// Result of one cycle or one event-triggered run.
#[derive(Debug, Clone, Serialize)]
pub struct CycleResult {
    /// Identifier of the run.
    pub run_id: Uuid,
    /// Whether moves and marker writes were suppressed.
    pub simulate: bool,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Lower bound of the scan window; `None` for event-triggered runs.
    pub since: Option<DateTime<Utc>>,
    /// Per-replica scan results in enumeration order.
    pub replicas: Vec<ReplicaReport>,
    /// Candidates observed before de-duplication.
    pub observed: usize,
    /// Distinct candidates after de-duplication.
    pub unique: usize,
    /// Candidates skipped because a fresh marker exists.
    pub already_processed: usize,
    /// Per-object results in processing order.
    pub objects: Vec<ObjectReport>,
    /// Wall-clock duration.
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl CycleResult {
    /// Objects with the given outcome.
    #[must_use]
    pub fn count(&self, outcome: ObjectOutcome) -> usize {
        self.objects
            .iter()
            .filter(|report| report.outcome == outcome)
            .count()
    }

    /// Objects that ended in `Success`.
    #[must_use]
    pub fn successes(&self) -> usize {
        self.count(ObjectOutcome::Success)
    }

    /// Objects that ended in a failure outcome.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.objects
            .iter()
            .filter(|report| report.outcome.is_failure())
            .count()
    }

    /// Objects skipped because no rule matched.
    #[must_use]
    pub fn no_matches(&self) -> usize {
        self.count(ObjectOutcome::NoRuleMatched)
    }

    /// Replicas whose scan failed.
    #[must_use]
    pub fn failed_replicas(&self) -> usize {
        self.replicas
            .iter()
            .filter(|replica| replica.error.is_some())
            .count()
    }

    /// Overall status; any failure outcome fails the cycle.
    #[must_use]
    pub fn status(&self) -> CycleStatus {
        if self.failures() > 0 {
            CycleStatus::Failure
        } else {
            CycleStatus::Success
        }
    }

    /// Objects processed per second of wall-clock time.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput(&self) -> f64 {
        let seconds = self.duration.as_secs_f64();
        if seconds <= f64::EPSILON {
            return 0.0;
        }
        self.objects.len() as f64 / seconds
    }
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u128(duration.as_millis())
}
