//! Cycle summary renderers.

use std::fmt::Write as _;

use anyhow::Context;
use ousort_engine::{CycleResult, ObjectReport};

use crate::cli::OutputFormat;
use crate::error::{AppError, AppResult};

/// Render the run summary printed on stdout.
pub(crate) fn render_cycle(result: &CycleResult, format: OutputFormat) -> AppResult<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)
            .context("failed to format cycle result as JSON")
            .map_err(|source| AppError::Output { source }),
        OutputFormat::Text => Ok(render_text(result)),
    }
}

fn render_text(result: &CycleResult) -> String {
    let mut out = String::new();
    let mode = if result.simulate { " (simulate)" } else { "" };
    let _ = writeln!(out, "run {}{mode}", result.run_id);
    if let Some(since) = result.since {
        let _ = writeln!(out, "window: since {}", since.to_rfc3339());
    }
    for replica in &result.replicas {
        match &replica.error {
            Some(error) => {
                let _ = writeln!(out, "  replica {:<24} FAILED  {error}", replica.replica.as_str());
            }
            None => {
                let _ = writeln!(
                    out,
                    "  replica {:<24} {:>5} candidates  {}ms",
                    replica.replica.as_str(),
                    replica.candidates,
                    replica.latency.as_millis()
                );
            }
        }
    }
    let _ = writeln!(
        out,
        "candidates: {} observed, {} unique, {} already processed",
        result.observed, result.unique, result.already_processed
    );
    for object in &result.objects {
        let _ = writeln!(out, "  {}", object_line(object));
    }
    let _ = writeln!(
        out,
        "processed {}: {} succeeded, {} no rule matched, {} failed in {}ms",
        result.objects.len(),
        result.successes(),
        result.no_matches(),
        result.failures(),
        result.duration.as_millis()
    );
    out
}

fn object_line(object: &ObjectReport) -> String {
    let mut line = format!("{:<20} {:<20}", object.name, object.outcome.as_str());
    if let Some(destination) = &object.destination {
        let _ = write!(line, " -> {destination}");
    }
    if let Some(detail) = &object.detail {
        let _ = write!(line, " ({detail})");
    }
    if object.attempt > 1 {
        let _ = write!(line, " [attempt {}]", object.attempt);
    }
    line.trim_end().to_string()
}
