//! Scenario fixtures shared by engine and CLI tests.

use ousort_config::{
    AppConfig, DirectoryConfig, LoggingConfig, MarkerConfig, MetricsConfig, PollingConfig,
    RetryConfig, RuleConfig,
};

use crate::mocks::InMemoryDirectory;

/// Naming context used by every fixture.
pub const BASE_DN: &str = "DC=example,DC=com";
/// Default container new computer objects land in.
pub const COMPUTERS: &str = "CN=Computers,DC=example,DC=com";
/// Destination for `^Alpha` names.
pub const OU_ALPHA: &str = "OU=Alpha,DC=example,DC=com";
/// Destination for `^Beta` names.
pub const OU_BETA: &str = "OU=Beta,DC=example,DC=com";
/// Catch-all destination.
pub const OU_QUARANTINE: &str = "OU=Quarantine,DC=example,DC=com";
/// Marker attribute used by fixtures.
pub const MARKER_ATTRIBUTE: &str = "extensionAttribute10";

/// Distinguished name of `name` in the default computers container.
#[must_use]
pub fn computer_path(name: &str) -> String {
    format!("CN={name},{COMPUTERS}")
}

/// `[^Alpha → Alpha, ^Beta → Beta, .* → Quarantine]`.
#[must_use]
pub fn scenario_rules() -> Vec<RuleConfig> {
    vec![
        rule("^Alpha", OU_ALPHA, Some("alpha")),
        rule("^Beta", OU_BETA, Some("beta")),
        rule(".*", OU_QUARANTINE, Some("catch-all")),
    ]
}

/// Build one rule.
#[must_use]
pub fn rule(pattern: &str, destination: &str, label: Option<&str>) -> RuleConfig {
    RuleConfig {
        pattern: pattern.to_string(),
        destination: destination.to_string(),
        label: label.map(str::to_string),
    }
}

/// Configuration wired to the fixture directory with the scenario rules.
#[must_use]
pub fn sample_config() -> AppConfig {
    AppConfig {
        logging: LoggingConfig::default(),
        polling: PollingConfig {
            replica_timeout_secs: 2,
            ..PollingConfig::default()
        },
        markers: MarkerConfig::default(),
        retry: RetryConfig::default(),
        directory: DirectoryConfig {
            url: "ldap://dc01.example.com:389".to_string(),
            bind_dn: "CN=svc-ousort,OU=Service,DC=example,DC=com".to_string(),
            bind_password_env: "OUSORT_BIND_PASSWORD".to_string(),
            base_dn: BASE_DN.to_string(),
            search_base: None,
            object_class: "computer".to_string(),
            replicas: Vec::new(),
            connect_timeout_secs: 10,
        },
        metrics: MetricsConfig::default(),
        rules: scenario_rules(),
    }
}

/// Directory with replicas `R1`, `R2` and the three scenario destinations.
#[must_use]
pub fn scenario_directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::with_replicas(&["R1", "R2"]);
    for container in [COMPUTERS, OU_ALPHA, OU_BETA, OU_QUARANTINE] {
        directory.add_container(container);
    }
    directory
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_is_valid() -> Result<(), ousort_config::ConfigError> {
        let warnings = ousort_config::validate(&sample_config())?;
        assert!(warnings.is_empty());
        Ok(())
    }

    #[test]
    fn computer_path_uses_default_container() {
        assert_eq!(
            computer_path("ALPHA-1"),
            "CN=ALPHA-1,CN=Computers,DC=example,DC=com"
        );
    }
}
