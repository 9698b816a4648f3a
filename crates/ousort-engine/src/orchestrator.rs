//! Cycle driver: enumerate, scan, aggregate, filter, then process survivors.
//!
//! # Design
//! - Only replica enumeration can abort a cycle. Every later failure is folded
//!   into a replica report or an object outcome.
//! - Objects are processed sequentially; each attempt writes a marker unless
//!   running in simulate mode.
//! - Event-triggered runs reuse the same per-object pipeline through
//!   [`RelocationEngine::process_single`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use ousort_config::AppConfig;
use ousort_directory::{DirectoryService, SearchScope};
use ousort_telemetry::{Metrics, cycle_span, new_run_id};
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

use crate::aggregate::aggregate;
use crate::error::{EngineError, EngineResult};
use crate::marker::{DirectoryMarkerBackend, MarkerBackend, MarkerPolicy, MarkerState, MarkerStore};
use crate::model::{CycleResult, ObjectOutcome, ObjectReport, RelocationOutcome};
use crate::relocate::Relocator;
use crate::replicas;
use crate::rules::RuleMatcher;
use crate::scanner::{ScanResult, Scanner};

/// Runs relocation cycles against a directory.
pub struct RelocationEngine {
    directory: Arc<dyn DirectoryService>,
    rules: RuleMatcher,
    markers: MarkerStore,
    marker_policy: MarkerPolicy,
    scope: SearchScope,
    lookback: chrono::Duration,
    replica_timeout: Duration,
    parallel_scans: bool,
    simulate: bool,
    metrics: Metrics,
}

impl RelocationEngine {
    /// Build an engine from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::InvalidRule`] when a routing rule does not compile.
    pub fn new(
        directory: Arc<dyn DirectoryService>,
        config: &AppConfig,
        metrics: Metrics,
    ) -> EngineResult<Self> {
        let rules = RuleMatcher::compile(&config.rules)?;
        let marker_policy = MarkerPolicy::from_config(&config.markers, &config.retry);
        let backend = Arc::new(DirectoryMarkerBackend::new(
            directory.clone(),
            config.markers.attribute.clone(),
        ));
        Ok(Self {
            markers: MarkerStore::new(backend, marker_policy),
            marker_policy,
            rules,
            scope: SearchScope {
                base: config.directory.search_base().to_string(),
                object_class: config.directory.object_class.clone(),
            },
            lookback: chrono::Duration::minutes(i64::from(config.polling.lookback_minutes)),
            replica_timeout: config.polling.replica_timeout(),
            parallel_scans: config.polling.parallel_scans,
            simulate: false,
            directory,
            metrics,
        })
    }

    /// Store markers somewhere other than the directory attribute.
    #[must_use]
    pub fn with_marker_backend(mut self, backend: Arc<dyn MarkerBackend>) -> Self {
        self.markers = MarkerStore::new(backend, self.marker_policy);
        self
    }

    /// Log intended moves instead of issuing them; no markers are written.
    #[must_use]
    pub const fn simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    /// Metrics registry the engine reports into.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run one cycle anchored at the current time.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::Discovery`] when replicas cannot be enumerated.
    pub async fn run_cycle(&self) -> EngineResult<CycleResult> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle with the scan window ending at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::Discovery`] when replicas cannot be enumerated.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> EngineResult<CycleResult> {
        let run_id = new_run_id();
        self.cycle(run_id, now)
            .instrument(cycle_span(run_id, self.simulate))
            .await
    }

    /// Process one named object outside the polling window.
    ///
    /// A fresh marker short-circuits the run; a name that cannot be found
    /// yields a `MoveFailed` outcome.
    pub async fn process_single(&self, name: &str) -> CycleResult {
        let run_id = new_run_id();
        self.single(run_id, name)
            .instrument(cycle_span(run_id, self.simulate))
            .await
    }

    async fn cycle(&self, run_id: Uuid, now: DateTime<Utc>) -> EngineResult<CycleResult> {
        let started = Instant::now();
        let since = now - self.lookback;
        info!(since = %since, simulate = self.simulate, "cycle started");

        let replicas = replicas::enumerate(self.directory.as_ref()).await?;
        let scanner = Scanner::new(
            self.directory.clone(),
            self.scope.clone(),
            self.replica_timeout,
            self.parallel_scans,
            self.metrics.clone(),
        );
        let scans = scanner.scan(&replicas, since).await;
        let merged = aggregate(&scans);

        let mut already_processed = 0;
        let mut survivors = Vec::with_capacity(merged.candidates.len());
        for candidate in &merged.candidates {
            let state = self.markers.check(&candidate.name, now).await;
            if state.is_processed() {
                debug!(name = %candidate.name, "already processed; skipping");
                already_processed += 1;
            } else {
                survivors.push((candidate, state));
            }
        }
        self.metrics.set_candidates(survivors.len());

        let mut objects = Vec::with_capacity(survivors.len());
        for (candidate, state) in survivors {
            objects.push(self.process(&candidate.name, &state).await);
        }

        let result = CycleResult {
            run_id,
            simulate: self.simulate,
            started_at: now,
            since: Some(since),
            replicas: scans.iter().map(ScanResult::report).collect(),
            observed: merged.observed,
            unique: merged.candidates.len(),
            already_processed,
            objects,
            duration: started.elapsed(),
        };
        self.finish(&result);
        Ok(result)
    }

    async fn single(&self, run_id: Uuid, name: &str) -> CycleResult {
        let started = Instant::now();
        let now = Utc::now();
        info!(name, simulate = self.simulate, "single-object run started");

        let state = self.markers.check(name, now).await;
        let mut already_processed = 0;
        let mut objects = Vec::new();
        if state.is_processed() {
            info!(name, "already processed; nothing to do");
            already_processed = 1;
        } else {
            self.metrics.set_candidates(1);
            objects.push(self.process(name, &state).await);
        }

        let result = CycleResult {
            run_id,
            simulate: self.simulate,
            started_at: now,
            since: None,
            replicas: Vec::new(),
            observed: 1,
            unique: 1,
            already_processed,
            objects,
            duration: started.elapsed(),
        };
        self.finish(&result);
        result
    }

    async fn process(&self, name: &str, state: &MarkerState) -> ObjectReport {
        let started = Instant::now();
        let attempt = state.prior_attempts() + 1;
        let matched = self.rules.resolve(name);

        let mut report = ObjectReport {
            name: name.to_string(),
            outcome: ObjectOutcome::NoRuleMatched,
            relocation: None,
            destination: matched.map(|hit| hit.destination.to_string()),
            rule: matched.map(|hit| hit.label.unwrap_or(hit.pattern).to_string()),
            detail: None,
            attempt,
            marker_written: false,
            elapsed: Duration::ZERO,
        };

        match matched {
            None => warn!(name, "no rule matched; object left in place"),
            Some(hit) => match self.relocator().relocate(name, hit.destination).await {
                Ok(relocation) => {
                    report.outcome = relocation.object_outcome();
                    if let RelocationOutcome::MoveFailed { detail, .. } = &relocation {
                        report.detail = Some(detail.clone());
                    }
                    report.relocation = Some(relocation);
                }
                Err(EngineError::ObjectNotFound { .. }) => {
                    warn!(name, "object vanished before it could be moved");
                    report.outcome = ObjectOutcome::MoveFailed;
                    report.detail = Some("object not found".to_string());
                }
                Err(error) => {
                    warn!(name, error = %error.detail(), "object processing failed");
                    report.outcome = ObjectOutcome::UnexpectedError;
                    report.detail = Some(error.detail());
                }
            },
        }

        if !self.simulate {
            report.marker_written = self
                .markers
                .mark_processed(
                    name,
                    report.outcome.marker_outcome(),
                    report.destination.as_deref(),
                    attempt,
                )
                .await;
        }
        self.metrics.inc_object(report.outcome.as_str());
        report.elapsed = started.elapsed();
        debug!(
            name,
            outcome = report.outcome.as_str(),
            attempt,
            marker_written = report.marker_written,
            "object processed"
        );
        report
    }

    fn relocator(&self) -> Relocator {
        Relocator::new(self.directory.clone(), self.simulate)
    }

    fn finish(&self, result: &CycleResult) {
        self.metrics.observe_cycle_duration(result.duration);
        let duration_ms = u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX);
        info!(
            replicas = result.replicas.len(),
            failed_replicas = result.failed_replicas(),
            observed = result.observed,
            unique = result.unique,
            already_processed = result.already_processed,
            processed = result.objects.len(),
            succeeded = result.successes(),
            no_rule_matched = result.no_matches(),
            failed = result.failures(),
            duration_ms,
            throughput = result.throughput(),
            status = ?result.status(),
            "cycle finished"
        );
    }
}
