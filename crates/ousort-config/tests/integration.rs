use std::error::Error;
use std::io::Write;
use std::path::PathBuf;

use ousort_config::{ConfigError, LogFormat, load_from_path};
use tempfile::NamedTempFile;

const FULL_DOCUMENT: &str = r#"
logging:
  directory: /tmp/ousort-logs
  rotate_bytes: 2048
  keep_files: 2
  transcript: true
  format: json
polling:
  interval_minutes: 10
  lookback_minutes: 30
  parallel_scans: false
markers:
  retention_days: 14
retry:
  enabled: true
  max_attempts: 2
  interval_minutes: 45
directory:
  url: ldap://dc01.example.com:389
  bind_dn: CN=svc-ousort,OU=Service,DC=example,DC=com
  base_dn: DC=example,DC=com
  search_base: CN=Computers,DC=example,DC=com
  replicas: [dc01.example.com, dc02.example.com]
metrics:
  textfile: /tmp/ousort.prom
rules:
  - pattern: "^ALPHA"
    destination: "OU=Alpha,DC=example,DC=com"
    label: alpha workstations
  - pattern: "^BETA"
    destination: "OU=Beta,DC=example,DC=com"
  - pattern: ".*"
    destination: "OU=Quarantine,DC=example,DC=com"
"#;

fn write_config(contents: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn full_document_loads_with_overrides_applied() -> Result<(), Box<dyn Error>> {
    let file = write_config(FULL_DOCUMENT)?;
    let loaded = load_from_path(file.path())?;
    let config = &loaded.config;

    assert_eq!(loaded.source, file.path());
    assert!(loaded.warnings.is_empty());
    assert_eq!(config.logging.directory, PathBuf::from("/tmp/ousort-logs"));
    assert_eq!(config.logging.file_name, "ousort.log");
    assert_eq!(config.logging.rotate_bytes, 2048);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert!(config.logging.transcript);
    assert_eq!(config.polling.interval_minutes, 10);
    assert!(!config.polling.parallel_scans);
    assert_eq!(config.polling.replica_timeout_secs, 30);
    assert_eq!(config.markers.attribute, "extensionAttribute10");
    assert_eq!(config.markers.retention_days, 14);
    assert!(config.retry.enabled);
    assert_eq!(config.directory.bind_password_env, "OUSORT_BIND_PASSWORD");
    assert_eq!(config.directory.search_base(), "CN=Computers,DC=example,DC=com");
    assert_eq!(config.directory.replicas.len(), 2);
    assert_eq!(
        config.metrics.textfile.as_deref(),
        Some(std::path::Path::new("/tmp/ousort.prom"))
    );
    assert_eq!(config.rules.len(), 3);
    assert_eq!(config.rules[0].label.as_deref(), Some("alpha workstations"));
    Ok(())
}

#[test]
fn minimal_document_uses_defaults_and_warns_without_catch_all() -> Result<(), Box<dyn Error>> {
    let file = write_config(
        r#"
directory:
  url: ldap://dc01.example.com
  bind_dn: CN=svc,DC=example,DC=com
  base_dn: DC=example,DC=com
rules:
  - pattern: "^ALPHA"
    destination: "OU=Alpha,DC=example,DC=com"
"#,
    )?;
    let loaded = load_from_path(file.path())?;
    assert_eq!(loaded.config.polling.interval_minutes, 15);
    assert_eq!(loaded.config.polling.lookback_minutes, 60);
    assert_eq!(loaded.config.directory.search_base(), "DC=example,DC=com");
    assert_eq!(loaded.warnings.len(), 1);
    assert_eq!(loaded.warnings[0].section, "rules");
    Ok(())
}

#[test]
fn interval_override_raises_short_lookback() -> Result<(), Box<dyn Error>> {
    let file = write_config(FULL_DOCUMENT)?;
    let config = load_from_path(file.path())?.config.with_interval_override(20);
    assert_eq!(config.polling.interval_minutes, 20);
    assert_eq!(config.polling.lookback_minutes, 40);

    let config = load_from_path(file.path())?.config.with_interval_override(5);
    assert_eq!(config.polling.lookback_minutes, 30);
    Ok(())
}

#[test]
fn missing_file_reports_io_error() {
    let result = load_from_path(std::path::Path::new("/nonexistent/ousort.yaml"));
    assert!(matches!(
        result,
        Err(ConfigError::Io {
            operation: "config.read",
            ..
        })
    ));
}

#[test]
fn invalid_window_is_rejected() -> Result<(), Box<dyn Error>> {
    let document = FULL_DOCUMENT.replace("lookback_minutes: 30", "lookback_minutes: 10");
    let file = write_config(&document)?;
    let result = load_from_path(file.path());
    assert!(matches!(result, Err(ConfigError::InvalidField { .. })));
    Ok(())
}
