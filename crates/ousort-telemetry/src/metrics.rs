//! Prometheus-backed cycle metrics.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - A process runs one cycle, so the registry is exported once at exit in
//!   textfile-collector format rather than served.

use std::convert::TryFrom;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use prometheus::{
    Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
    core::Collector,
};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry for one process run.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    objects_total: IntCounterVec,
    replica_scan_failures_total: IntCounterVec,
    replica_scan_latency_ms: IntGaugeVec,
    cycle_duration_ms: IntGauge,
    candidates: IntGauge,
}

/// Point-in-time view of the cycle gauges.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Duration of the last cycle in milliseconds.
    pub cycle_duration_ms: i64,
    /// Candidates that survived aggregation and marker filtering.
    pub candidates: i64,
}

impl Metrics {
    /// Construct a new registry with the cycle collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let objects_total = build(
            "ousort_objects_total",
            IntCounterVec::new(
                Opts::new("ousort_objects_total", "Objects processed by terminal outcome"),
                &["outcome"],
            ),
        )?;
        let replica_scan_failures_total = build(
            "ousort_replica_scan_failures_total",
            IntCounterVec::new(
                Opts::new(
                    "ousort_replica_scan_failures_total",
                    "Replica scans that failed or timed out",
                ),
                &["replica"],
            ),
        )?;
        let replica_scan_latency_ms = build(
            "ousort_replica_scan_latency_ms",
            IntGaugeVec::new(
                Opts::new(
                    "ousort_replica_scan_latency_ms",
                    "Latency of the last scan per replica (ms)",
                ),
                &["replica"],
            ),
        )?;
        let cycle_duration_ms = build(
            "ousort_cycle_duration_ms",
            IntGauge::with_opts(Opts::new(
                "ousort_cycle_duration_ms",
                "Wall-clock duration of the last cycle (ms)",
            )),
        )?;
        let candidates = build(
            "ousort_candidates",
            IntGauge::with_opts(Opts::new(
                "ousort_candidates",
                "Candidates selected for processing in the last cycle",
            )),
        )?;

        register(&registry, "ousort_objects_total", &objects_total)?;
        register(
            &registry,
            "ousort_replica_scan_failures_total",
            &replica_scan_failures_total,
        )?;
        register(
            &registry,
            "ousort_replica_scan_latency_ms",
            &replica_scan_latency_ms,
        )?;
        register(&registry, "ousort_cycle_duration_ms", &cycle_duration_ms)?;
        register(&registry, "ousort_candidates", &candidates)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                objects_total,
                replica_scan_failures_total,
                replica_scan_latency_ms,
                cycle_duration_ms,
                candidates,
            }),
        })
    }

    /// Count one object reaching a terminal outcome.
    pub fn inc_object(&self, outcome: &str) {
        self.inner
            .objects_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Count a failed or timed-out replica scan.
    pub fn inc_scan_failure(&self, replica: &str) {
        self.inner
            .replica_scan_failures_total
            .with_label_values(&[replica])
            .inc();
    }

    /// Record how long a replica scan took.
    pub fn observe_scan_latency(&self, replica: &str, duration: Duration) {
        self.inner
            .replica_scan_latency_ms
            .with_label_values(&[replica])
            .set(duration_to_ms(duration));
    }

    /// Record the overall cycle duration.
    pub fn observe_cycle_duration(&self, duration: Duration) {
        self.inner.cycle_duration_ms.set(duration_to_ms(duration));
    }

    /// Record the number of candidates selected for processing.
    pub fn set_candidates(&self, count: usize) {
        self.inner
            .candidates
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Counter value for one outcome label.
    #[must_use]
    pub fn objects(&self, outcome: &str) -> u64 {
        self.inner
            .objects_total
            .with_label_values(&[outcome])
            .get()
    }

    /// Counter value for one replica's scan failures.
    #[must_use]
    pub fn scan_failures(&self, replica: &str) -> u64 {
        self.inner
            .replica_scan_failures_total
            .with_label_values(&[replica])
            .get()
    }

    /// Render the registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Write the rendered registry to `path`, replacing it atomically.
    ///
    /// # Errors
    ///
    /// Returns an error when rendering fails or the file cannot be written.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let rendered = self.render()?;
        let write_err = |source| TelemetryError::MetricsWrite {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut staging = path.as_os_str().to_os_string();
        staging.push(".tmp");
        fs::write(&staging, rendered.as_bytes()).map_err(write_err)?;
        fs::rename(&staging, path).map_err(write_err)
    }

    /// Take a point-in-time snapshot of the cycle gauges.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycle_duration_ms: self.inner.cycle_duration_ms.get(),
            candidates: self.inner.candidates.get(),
        }
    }
}

fn build<T>(name: &'static str, collector: prometheus::Result<T>) -> Result<T> {
    collector.map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

fn duration_to_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
