use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use ousort_config::RetryConfig;
use ousort_engine::{
    EngineError, MarkerOutcome, ObjectOutcome, RelocationEngine, RelocationOutcome,
};
use ousort_telemetry::Metrics;
use ousort_test_support::InMemoryDirectory;
use ousort_test_support::fixtures::{
    MARKER_ATTRIBUTE, OU_ALPHA, OU_BETA, computer_path, rule, sample_config, scenario_directory,
};

fn marker_value(age: chrono::Duration, outcome: &str, attempts: u32) -> String {
    let at = (Utc::now() - age).to_rfc3339_opts(SecondsFormat::Secs, true);
    format!("v1|{at}|{outcome}|{attempts}|{OU_ALPHA}")
}

fn engine(directory: &Arc<InMemoryDirectory>) -> Result<RelocationEngine> {
    Ok(RelocationEngine::new(
        directory.clone(),
        &sample_config(),
        Metrics::new()?,
    )?)
}

#[tokio::test]
async fn object_seen_on_two_replicas_is_processed_once() -> Result<()> {
    let directory = Arc::new(scenario_directory());
    let now = Utc::now();
    directory.add_object("ALPHA-1", &computer_path("ALPHA-1"), now);

    let result = engine(&directory)?.run_cycle_at(now).await?;
    assert_eq!(result.observed, 2);
    assert_eq!(result.unique, 1);
    assert_eq!(result.objects.len(), 1);
    assert_eq!(directory.moves().len(), 1);
    assert_eq!(directory.write_count(), 1);
    Ok(())
}

#[tokio::test]
async fn lagging_replica_still_contributes() -> Result<()> {
    let directory = Arc::new(scenario_directory());
    let now = Utc::now();
    directory.add_object_on("BETA-7", &computer_path("BETA-7"), now, &["R2"]);

    let result = engine(&directory)?.run_cycle_at(now).await?;
    assert_eq!(result.unique, 1);
    assert_eq!(
        directory.object_path("BETA-7"),
        Some(format!("CN=BETA-7,{OU_BETA}"))
    );
    Ok(())
}

#[tokio::test]
async fn second_cycle_skips_marked_objects() -> Result<()> {
    let directory = Arc::new(scenario_directory());
    let now = Utc::now();
    directory.add_object("ALPHA-1", &computer_path("ALPHA-1"), now);
    let engine = engine(&directory)?;

    engine.run_cycle_at(now).await?;
    let second = engine.run_cycle_at(now).await?;
    assert_eq!(second.already_processed, 1);
    assert!(second.objects.is_empty());
    assert_eq!(directory.moves().len(), 1);
    Ok(())
}

#[tokio::test]
async fn expired_marker_is_reprocessed() -> Result<()> {
    let directory = Arc::new(scenario_directory());
    let now = Utc::now();
    directory.add_object("ALPHA-1", &computer_path("ALPHA-1"), now);
    directory.set_attribute(
        "ALPHA-1",
        MARKER_ATTRIBUTE,
        &marker_value(chrono::Duration::days(40), "moved", 1),
    );

    let result = engine(&directory)?.run_cycle_at(now).await?;
    assert_eq!(result.already_processed, 0);
    assert_eq!(result.successes(), 1);
    Ok(())
}

#[tokio::test]
async fn unreadable_or_garbled_markers_fail_open() -> Result<()> {
    let directory = Arc::new(scenario_directory());
    let now = Utc::now();
    for name in ["ALPHA-1", "ALPHA-2"] {
        directory.add_object(name, &computer_path(name), now);
    }
    directory.set_attribute("ALPHA-1", MARKER_ATTRIBUTE, "not-a-marker");
    directory.fail_reads("ALPHA-2");

    let result = engine(&directory)?.run_cycle_at(now).await?;
    assert_eq!(result.already_processed, 0);
    assert_eq!(result.successes(), 2);
    Ok(())
}

#[tokio::test]
async fn missing_destination_fails_cycle_but_writes_marker() -> Result<()> {
    let directory = Arc::new(InMemoryDirectory::with_replicas(&["R1"]));
    let now = Utc::now();
    directory.add_object("ALPHA-1", &computer_path("ALPHA-1"), now);
    let mut config = sample_config();
    config.rules = vec![rule(".*", "OU=Gone,DC=example,DC=com", None)];

    let result = RelocationEngine::new(directory.clone(), &config, Metrics::new()?)?
        .run_cycle_at(now)
        .await?;
    assert_eq!(result.count(ObjectOutcome::DestinationMissing), 1);
    assert_eq!(result.status().exit_code(), 1);
    assert!(directory.moves().is_empty());
    let marker = directory.attribute("ALPHA-1", MARKER_ATTRIBUTE).unwrap_or_default();
    assert!(marker.contains("|destination_missing|1|"));
    Ok(())
}

#[tokio::test]
async fn failing_and_slow_replicas_do_not_stop_the_cycle() -> Result<()> {
    let directory = Arc::new(InMemoryDirectory::with_replicas(&["R1", "R2", "R3"]));
    directory.add_container(OU_ALPHA);
    let now = Utc::now();
    directory.add_object_on("ALPHA-1", &computer_path("ALPHA-1"), now, &["R3"]);
    directory.fail_replica("R1");
    directory.delay_replica("R2", Duration::from_secs(10));

    let engine = engine(&directory)?;
    let result = engine.run_cycle_at(now).await?;
    assert_eq!(result.failed_replicas(), 2);
    assert_eq!(result.successes(), 1);
    assert_eq!(result.status().exit_code(), 0);
    assert_eq!(engine.metrics().scan_failures("R1"), 1);
    assert_eq!(engine.metrics().scan_failures("R2"), 1);
    Ok(())
}

#[tokio::test]
async fn partial_failure_processes_every_object() -> Result<()> {
    let directory = Arc::new(scenario_directory());
    let now = Utc::now();
    for name in ["ALPHA-1", "ALPHA-2", "BETA-3"] {
        directory.add_object(name, &computer_path(name), now);
    }
    directory.deny_move("ALPHA-2");

    let engine = engine(&directory)?;
    let result = engine.run_cycle_at(now).await?;
    assert_eq!(result.objects.len(), 3);
    assert_eq!(result.successes(), 2);
    assert_eq!(result.count(ObjectOutcome::MoveFailed), 1);
    assert_eq!(result.status().exit_code(), 1);
    assert!(result.objects.iter().all(|report| report.marker_written));
    assert_eq!(directory.write_count(), 3);
    assert_eq!(engine.metrics().objects("move_failed"), 1);
    Ok(())
}

#[tokio::test]
async fn marker_write_failure_is_not_fatal() -> Result<()> {
    let directory = Arc::new(scenario_directory());
    let now = Utc::now();
    directory.add_object("ALPHA-1", &computer_path("ALPHA-1"), now);
    directory.fail_writes("ALPHA-1");

    let result = engine(&directory)?.run_cycle_at(now).await?;
    assert_eq!(result.successes(), 1);
    assert!(!result.objects[0].marker_written);
    assert_eq!(result.status().exit_code(), 0);
    Ok(())
}

#[tokio::test]
async fn simulate_moves_nothing_and_writes_no_markers() -> Result<()> {
    let directory = Arc::new(scenario_directory());
    let now = Utc::now();
    directory.add_object("ALPHA-1", &computer_path("ALPHA-1"), now);

    let result = engine(&directory)?
        .simulate(true)
        .run_cycle_at(now)
        .await?;
    assert!(result.simulate);
    assert!(matches!(
        result.objects[0].relocation,
        Some(RelocationOutcome::Simulated { .. })
    ));
    assert!(directory.moves().is_empty());
    assert_eq!(directory.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn failed_marker_is_retried_when_enabled() -> Result<()> {
    let directory = Arc::new(scenario_directory());
    let now = Utc::now();
    directory.add_object("ALPHA-1", &computer_path("ALPHA-1"), now);
    directory.set_attribute(
        "ALPHA-1",
        MARKER_ATTRIBUTE,
        &marker_value(chrono::Duration::hours(2), MarkerOutcome::Failed.as_str(), 1),
    );

    let sticky = engine(&directory)?.run_cycle_at(now).await?;
    assert_eq!(sticky.already_processed, 1);

    let mut config = sample_config();
    config.retry = RetryConfig {
        enabled: true,
        max_attempts: 3,
        interval_minutes: 60,
    };
    let retried = RelocationEngine::new(directory.clone(), &config, Metrics::new()?)?
        .run_cycle_at(now)
        .await?;
    assert_eq!(retried.objects.len(), 1);
    assert_eq!(retried.objects[0].attempt, 2);
    let marker = directory.attribute("ALPHA-1", MARKER_ATTRIBUTE).unwrap_or_default();
    assert!(marker.contains("|moved|2|"));
    Ok(())
}

#[tokio::test]
async fn discovery_failure_aborts_cycle() -> Result<()> {
    let directory = Arc::new(scenario_directory());
    directory.fail_discovery();
    let result = engine(&directory)?.run_cycle().await;
    assert!(matches!(result, Err(EngineError::Discovery { .. })));
    Ok(())
}

#[tokio::test]
async fn single_object_run_uses_the_same_pipeline() -> Result<()> {
    let directory = Arc::new(scenario_directory());
    directory.add_object("ALPHA-9", &computer_path("ALPHA-9"), Utc::now());
    let engine = engine(&directory)?;

    let first = engine.process_single("alpha-9").await;
    assert_eq!(first.successes(), 1);
    assert!(first.since.is_none());

    let second = engine.process_single("ALPHA-9").await;
    assert_eq!(second.already_processed, 1);
    assert!(second.objects.is_empty());

    let missing = engine.process_single("GHOST-1").await;
    assert_eq!(missing.count(ObjectOutcome::MoveFailed), 1);
    assert_eq!(missing.objects[0].detail.as_deref(), Some("object not found"));
    assert_eq!(missing.status().exit_code(), 1);
    Ok(())
}
