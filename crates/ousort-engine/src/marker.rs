//! Processed markers stored on the objects themselves.
//!
//! # Design
//! - Encoded as `v1|<rfc3339 timestamp>|<outcome>|<attempts>|<destination>` in a
//!   single-valued attribute.
//! - Reads fail open: anything but a fresh, parsable marker means "not processed".
//! - Storage sits behind [`MarkerBackend`] so the directory attribute can be
//!   swapped for another store without touching the orchestrator.
//! - No lock is taken; concurrent writers race benignly, last write wins.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use ousort_config::{MarkerConfig, RetryConfig};
use ousort_directory::{DirectoryResult, DirectoryService};
use tracing::{debug, warn};

const MARKER_VERSION: &str = "v1";

/// Outcome recorded in a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOutcome {
    /// Object was moved or already in place.
    Moved,
    /// No rule matched.
    NoRuleMatched,
    /// Destination container was missing.
    DestinationMissing,
    /// The move was rejected.
    Failed,
    /// Unexpected failure.
    Error,
}

impl MarkerOutcome {
    /// Wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Moved => "moved",
            Self::NoRuleMatched => "no_rule_matched",
            Self::DestinationMissing => "destination_missing",
            Self::Failed => "failed",
            Self::Error => "error",
        }
    }
}

impl FromStr for MarkerOutcome {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "moved" => Ok(Self::Moved),
            "no_rule_matched" => Ok(Self::NoRuleMatched),
            "destination_missing" => Ok(Self::DestinationMissing),
            "failed" => Ok(Self::Failed),
            "error" => Ok(Self::Error),
            _ => Err(()),
        }
    }
}

/// Decoded marker value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// When the object was last processed.
    pub processed_at: DateTime<Utc>,
    /// Outcome of that attempt.
    pub outcome: MarkerOutcome,
    /// Attempts made so far, including that one.
    pub attempts: u32,
    /// Destination chosen, if any.
    pub destination: Option<String>,
}

impl Marker {
    /// Parse the attribute value; `None` for anything malformed.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().splitn(5, '|');
        if parts.next()? != MARKER_VERSION {
            return None;
        }
        let processed_at = DateTime::parse_from_rfc3339(parts.next()?)
            .ok()?
            .with_timezone(&Utc);
        let outcome = parts.next()?.parse().ok()?;
        let attempts = parts.next()?.parse().ok()?;
        let destination = parts
            .next()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Some(Self {
            processed_at,
            outcome,
            attempts,
            destination,
        })
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{MARKER_VERSION}|{}|{}|{}|{}",
            self.processed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.outcome.as_str(),
            self.attempts,
            self.destination.as_deref().unwrap_or_default()
        )
    }
}

/// Bounded retry for `failed` markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Minimum marker age before another attempt.
    pub interval: Duration,
    /// Total attempts allowed.
    pub max_attempts: u32,
}

/// Expiry and retry rules applied to markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerPolicy {
    /// Markers older than this no longer suppress processing.
    pub retention: Duration,
    /// Retry rule for `failed` markers; `None` keeps them until expiry.
    pub retry: Option<RetryPolicy>,
}

impl MarkerPolicy {
    /// Build from configuration sections.
    #[must_use]
    pub fn from_config(markers: &MarkerConfig, retry: &RetryConfig) -> Self {
        Self {
            retention: Duration::days(i64::from(markers.retention_days)),
            retry: retry.enabled.then(|| RetryPolicy {
                interval: Duration::minutes(i64::from(retry.interval_minutes)),
                max_attempts: retry.max_attempts,
            }),
        }
    }

    /// Classify a decoded marker at `now`.
    #[must_use]
    pub fn evaluate(&self, marker: Marker, now: DateTime<Utc>) -> MarkerState {
        let age = now.signed_duration_since(marker.processed_at);
        if age > self.retention {
            return MarkerState::Expired(marker);
        }
        if let Some(retry) = self.retry
            && marker.outcome == MarkerOutcome::Failed
            && age >= retry.interval
            && marker.attempts < retry.max_attempts
        {
            return MarkerState::RetryDue(marker);
        }
        MarkerState::Fresh(marker)
    }
}

/// Result of checking an object's marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerState {
    /// No marker attribute (or no object).
    Absent,
    /// The marker could not be read.
    Unreadable,
    /// The attribute holds something that is not a marker.
    Invalid,
    /// The marker is older than the retention horizon.
    Expired(Marker),
    /// A `failed` marker eligible for another attempt.
    RetryDue(Marker),
    /// A current marker; the object is handled.
    Fresh(Marker),
}

impl MarkerState {
    /// Whether the object should be skipped.
    #[must_use]
    pub const fn is_processed(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }

    /// Attempts already spent that count toward the next marker.
    #[must_use]
    pub const fn prior_attempts(&self) -> u32 {
        match self {
            Self::RetryDue(marker) => marker.attempts,
            _ => 0,
        }
    }
}

/// Storage seam for marker values.
#[async_trait]
pub trait MarkerBackend: Send + Sync {
    /// Read the raw marker for `name`.
    async fn read(&self, name: &str) -> DirectoryResult<Option<String>>;

    /// Replace the raw marker for `name`.
    async fn write(&self, name: &str, value: &str) -> DirectoryResult<()>;
}

/// Marker backend storing values in a directory attribute.
pub struct DirectoryMarkerBackend {
    directory: Arc<dyn DirectoryService>,
    attribute: String,
}

impl DirectoryMarkerBackend {
    /// Store markers in `attribute` of each object.
    #[must_use]
    pub fn new(directory: Arc<dyn DirectoryService>, attribute: impl Into<String>) -> Self {
        Self {
            directory,
            attribute: attribute.into(),
        }
    }
}

#[async_trait]
impl MarkerBackend for DirectoryMarkerBackend {
    async fn read(&self, name: &str) -> DirectoryResult<Option<String>> {
        self.directory.read_attribute(name, &self.attribute).await
    }

    async fn write(&self, name: &str, value: &str) -> DirectoryResult<()> {
        self.directory
            .write_attribute(name, &self.attribute, value)
            .await
    }
}

/// Reads and writes processed markers.
#[derive(Clone)]
pub struct MarkerStore {
    backend: Arc<dyn MarkerBackend>,
    policy: MarkerPolicy,
}

impl MarkerStore {
    /// Build a store over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn MarkerBackend>, policy: MarkerPolicy) -> Self {
        Self { backend, policy }
    }

    /// Fresh point read and classification of `name`'s marker.
    pub async fn check(&self, name: &str, now: DateTime<Utc>) -> MarkerState {
        match self.backend.read(name).await {
            Ok(None) => MarkerState::Absent,
            Ok(Some(raw)) if raw.trim().is_empty() => MarkerState::Absent,
            Ok(Some(raw)) => Marker::parse(&raw).map_or_else(
                || {
                    debug!(name, value = %raw, "marker unparsable; treating as unprocessed");
                    MarkerState::Invalid
                },
                |marker| self.policy.evaluate(marker, now),
            ),
            Err(error) if error.is_not_found() => {
                debug!(name, "object not found while reading marker");
                MarkerState::Absent
            }
            Err(error) => {
                warn!(name, error = %error.describe(), "marker read failed; treating as unprocessed");
                MarkerState::Unreadable
            }
        }
    }

    /// Whether `name` already carries a fresh marker.
    pub async fn is_processed(&self, name: &str, now: DateTime<Utc>) -> bool {
        self.check(name, now).await.is_processed()
    }

    /// Record an attempt; failures are logged and reported as `false`.
    pub async fn mark_processed(
        &self,
        name: &str,
        outcome: MarkerOutcome,
        destination: Option<&str>,
        attempts: u32,
    ) -> bool {
        let marker = Marker {
            processed_at: Utc::now(),
            outcome,
            attempts,
            destination: destination.map(str::to_string),
        };
        let value = marker.to_string();
        match self.backend.write(name, &value).await {
            Ok(()) => {
                debug!(name, marker = %value, "marker written");
                true
            }
            Err(error) => {
                warn!(name, error = %error.describe(), "marker write failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use ousort_directory::DirectoryError;

    #[derive(Default)]
    struct MapBackend {
        values: Mutex<HashMap<String, String>>,
        fail_reads: bool,
    }

    #[async_trait]
    impl MarkerBackend for MapBackend {
        async fn read(&self, name: &str) -> DirectoryResult<Option<String>> {
            if self.fail_reads {
                return Err(DirectoryError::Rejected {
                    operation: "map.read",
                    target: name.to_string(),
                    code: 80,
                    message: "boom".into(),
                });
            }
            Ok(self
                .values
                .lock()
                .map_err(|_| DirectoryError::NotFound { name: name.into() })?
                .get(name)
                .cloned())
        }

        async fn write(&self, name: &str, value: &str) -> DirectoryResult<()> {
            self.values
                .lock()
                .map_err(|_| DirectoryError::NotFound { name: name.into() })?
                .insert(name.to_string(), value.to_string());
            Ok(())
        }
    }

    fn policy(retry: Option<RetryPolicy>) -> MarkerPolicy {
        MarkerPolicy {
            retention: Duration::days(30),
            retry,
        }
    }

    fn marker(age: Duration, outcome: MarkerOutcome, attempts: u32) -> (Marker, DateTime<Utc>) {
        let now = Utc::now();
        (
            Marker {
                processed_at: now - age,
                outcome,
                attempts,
                destination: Some("OU=Alpha,DC=example,DC=com".into()),
            },
            now,
        )
    }

    #[test]
    fn marker_text_form_parses_back() {
        let (original, _) = marker(Duration::zero(), MarkerOutcome::Failed, 2);
        let encoded = original.to_string();
        assert!(encoded.starts_with("v1|"));
        assert!(encoded.ends_with("|failed|2|OU=Alpha,DC=example,DC=com"));
        let decoded = Marker::parse(&encoded);
        assert_eq!(
            decoded.as_ref().map(|m| (m.outcome, m.attempts)),
            Some((MarkerOutcome::Failed, 2))
        );
        assert_eq!(
            decoded.and_then(|m| m.destination),
            original.destination
        );
    }

    #[test]
    fn malformed_markers_do_not_parse() {
        for raw in [
            "",
            "processed",
            "v2|2024-01-01T00:00:00Z|moved|1|",
            "v1|yesterday|moved|1|",
            "v1|2024-01-01T00:00:00Z|teleported|1|",
            "v1|2024-01-01T00:00:00Z|moved|many|",
            "v1|2024-01-01T00:00:00Z|moved",
        ] {
            assert!(Marker::parse(raw).is_none(), "parsed {raw:?}");
        }
        let parsed = Marker::parse("v1|2024-01-01T00:00:00Z|no_rule_matched|1|");
        assert_eq!(parsed.and_then(|m| m.destination), None);
    }

    #[test]
    fn stale_marker_expires() {
        let (old, now) = marker(Duration::days(40), MarkerOutcome::Moved, 1);
        assert!(matches!(
            policy(None).evaluate(old, now),
            MarkerState::Expired(_)
        ));
        let (recent, now) = marker(Duration::days(5), MarkerOutcome::Moved, 1);
        assert!(policy(None).evaluate(recent, now).is_processed());
    }

    #[test]
    fn failed_marker_sticks_without_retry() {
        let (failed, now) = marker(Duration::days(2), MarkerOutcome::Failed, 1);
        assert!(policy(None).evaluate(failed, now).is_processed());
    }

    #[test]
    fn failed_marker_retries_within_bounds() {
        let retry = Some(RetryPolicy {
            interval: Duration::minutes(60),
            max_attempts: 3,
        });
        let (due, now) = marker(Duration::minutes(90), MarkerOutcome::Failed, 1);
        let state = policy(retry).evaluate(due, now);
        assert!(!state.is_processed());
        assert_eq!(state.prior_attempts(), 1);

        let (too_soon, now) = marker(Duration::minutes(10), MarkerOutcome::Failed, 1);
        assert!(policy(retry).evaluate(too_soon, now).is_processed());

        let (exhausted, now) = marker(Duration::minutes(90), MarkerOutcome::Failed, 3);
        assert!(policy(retry).evaluate(exhausted, now).is_processed());

        let (moved, now) = marker(Duration::minutes(90), MarkerOutcome::Moved, 1);
        assert!(policy(retry).evaluate(moved, now).is_processed());
    }

    #[tokio::test]
    async fn store_fails_open() {
        let backend = Arc::new(MapBackend::default());
        let store = MarkerStore::new(backend.clone(), policy(None));
        let now = Utc::now();
        assert_eq!(store.check("PC1", now).await, MarkerState::Absent);

        if let Ok(mut values) = backend.values.lock() {
            values.insert("PC1".into(), "garbage".into());
            values.insert("PC2".into(), "   ".into());
        }
        assert_eq!(store.check("PC1", now).await, MarkerState::Invalid);
        assert_eq!(store.check("PC2", now).await, MarkerState::Absent);

        let failing = MarkerStore::new(
            Arc::new(MapBackend {
                fail_reads: true,
                ..MapBackend::default()
            }),
            policy(None),
        );
        assert_eq!(failing.check("PC1", now).await, MarkerState::Unreadable);
        assert!(!failing.is_processed("PC1", now).await);
    }

    #[tokio::test]
    async fn mark_then_check_reports_processed() {
        let store = MarkerStore::new(Arc::new(MapBackend::default()), policy(None));
        assert!(
            store
                .mark_processed("PC1", MarkerOutcome::Moved, Some("OU=A"), 1)
                .await
        );
        assert!(store.is_processed("PC1", Utc::now()).await);
    }
}
