//! Per-replica candidate scans.
//!
//! # Design
//! - Each replica is queried independently under its own timeout; one slow or
//!   failing replica never blocks or fails the others.
//! - Parallel scans run on a [`JoinSet`]; results are slotted back into
//!   enumeration order so aggregation stays deterministic.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use ousort_directory::{CandidateObject, DirectoryService, ReplicaId, SearchScope};
use ousort_telemetry::Metrics;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::model::ReplicaReport;

/// Outcome of scanning one replica.
#[derive(Debug)]
pub struct ScanResult {
    /// Replica scanned.
    pub replica: ReplicaId,
    /// Candidates returned, or why none were.
    pub outcome: Result<Vec<CandidateObject>, ScanError>,
    /// Time spent on the scan.
    pub latency: Duration,
}

impl ScanResult {
    /// Summary for the cycle report.
    #[must_use]
    pub fn report(&self) -> ReplicaReport {
        ReplicaReport {
            replica: self.replica.clone(),
            candidates: self.outcome.as_ref().map_or(0, Vec::len),
            latency: self.latency,
            error: self.outcome.as_ref().err().map(ScanError::detail),
        }
    }
}

/// Fans candidate queries out over replicas.
#[derive(Clone)]
pub struct Scanner {
    directory: Arc<dyn DirectoryService>,
    scope: SearchScope,
    timeout: Duration,
    parallel: bool,
    metrics: Metrics,
}

impl Scanner {
    /// Build a scanner over `directory`.
    #[must_use]
    pub fn new(
        directory: Arc<dyn DirectoryService>,
        scope: SearchScope,
        timeout: Duration,
        parallel: bool,
        metrics: Metrics,
    ) -> Self {
        Self {
            directory,
            scope,
            timeout,
            parallel,
            metrics,
        }
    }

    /// Query every replica for objects created since `since`.
    ///
    /// Results come back in the order of `replicas`.
    pub async fn scan(&self, replicas: &[ReplicaId], since: DateTime<Utc>) -> Vec<ScanResult> {
        let results = if self.parallel {
            self.scan_parallel(replicas, since).await
        } else {
            let mut results = Vec::with_capacity(replicas.len());
            for replica in replicas {
                results.push(self.scan_one(replica.clone(), since).await);
            }
            results
        };
        for result in &results {
            self.record(result);
        }
        results
    }

    async fn scan_parallel(&self, replicas: &[ReplicaId], since: DateTime<Utc>) -> Vec<ScanResult> {
        let mut slots: Vec<Option<ScanResult>> = replicas.iter().map(|_| None).collect();
        let mut tasks = JoinSet::new();
        for (index, replica) in replicas.iter().enumerate() {
            let scanner = self.clone();
            let replica = replica.clone();
            tasks.spawn(async move { (index, scanner.scan_one(replica, since).await) });
        }

        let mut aborted = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(result);
                    }
                }
                Err(error) => aborted.push(error.to_string()),
            }
        }

        let mut aborted = aborted.into_iter();
        slots
            .into_iter()
            .zip(replicas)
            .map(|(slot, replica)| {
                slot.unwrap_or_else(|| ScanResult {
                    replica: replica.clone(),
                    outcome: Err(ScanError::Aborted {
                        detail: aborted
                            .next()
                            .unwrap_or_else(|| "scan task lost".to_string()),
                    }),
                    latency: Duration::ZERO,
                })
            })
            .collect()
    }

    async fn scan_one(&self, replica: ReplicaId, since: DateTime<Utc>) -> ScanResult {
        let started = Instant::now();
        let query = self
            .directory
            .query_created_since(&replica, since, &self.scope);
        let outcome = match tokio::time::timeout(self.timeout, query).await {
            Ok(Ok(candidates)) => Ok(candidates),
            Ok(Err(source)) => Err(ScanError::Directory { source }),
            Err(_) => Err(ScanError::Timeout {
                after: self.timeout,
            }),
        };
        ScanResult {
            replica,
            outcome,
            latency: started.elapsed(),
        }
    }

    fn record(&self, result: &ScanResult) {
        let replica = result.replica.as_str();
        self.metrics.observe_scan_latency(replica, result.latency);
        match &result.outcome {
            Ok(candidates) => debug!(
                replica,
                candidates = candidates.len(),
                latency_ms = u64::try_from(result.latency.as_millis()).unwrap_or(u64::MAX),
                "replica scanned"
            ),
            Err(error) => {
                self.metrics.inc_scan_failure(replica);
                warn!(replica, error = %error.detail(), "replica scan failed; continuing");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use ousort_test_support::fixtures::{BASE_DN, computer_path, scenario_directory};

    fn scanner(directory: Arc<dyn DirectoryService>, parallel: bool) -> Result<Scanner> {
        Ok(Scanner::new(
            directory,
            SearchScope {
                base: BASE_DN.into(),
                object_class: "computer".into(),
            },
            Duration::from_millis(200),
            parallel,
            Metrics::new()?,
        ))
    }

    #[tokio::test]
    async fn failing_replica_does_not_hide_others() -> Result<()> {
        let directory = Arc::new(scenario_directory());
        let now = Utc::now();
        directory.add_object("ALPHA-1", &computer_path("ALPHA-1"), now);
        directory.fail_replica("R1");
        let replicas = [ReplicaId::from("R1"), ReplicaId::from("R2")];

        for parallel in [true, false] {
            let results = scanner(directory.clone(), parallel)?
                .scan(&replicas, now - chrono::Duration::minutes(5))
                .await;
            assert_eq!(results.len(), 2);
            assert_eq!(results[0].replica.as_str(), "R1");
            assert!(matches!(
                results[0].outcome,
                Err(ScanError::Directory { .. })
            ));
            assert_eq!(results[1].outcome.as_ref().map(Vec::len).ok(), Some(1));
        }
        Ok(())
    }

    #[tokio::test]
    async fn slow_replica_times_out() -> Result<()> {
        let directory = Arc::new(scenario_directory());
        let now = Utc::now();
        directory.add_object("BETA-1", &computer_path("BETA-1"), now);
        directory.delay_replica("R2", Duration::from_secs(5));
        let scanner = scanner(directory.clone(), true)?;
        let results = scanner
            .scan(
                &[ReplicaId::from("R1"), ReplicaId::from("R2")],
                now - chrono::Duration::minutes(5),
            )
            .await;

        assert_eq!(results[0].outcome.as_ref().map(Vec::len).ok(), Some(1));
        assert!(matches!(
            results[1].outcome,
            Err(ScanError::Timeout { .. })
        ));
        let report = results[1].report();
        assert_eq!(report.candidates, 0);
        assert!(report.error.is_some());
        assert_eq!(scanner.metrics.scan_failures("R2"), 1);
        Ok(())
    }
}
