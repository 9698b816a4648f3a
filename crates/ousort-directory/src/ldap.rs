//! LDAP-backed [`DirectoryService`].
//!
//! # Design
//!
//! - One bound connection to the configured endpoint serves point reads,
//!   attribute writes, existence checks and moves.
//! - Replica scans open a dedicated short-lived connection per replica so a
//!   slow or dead replica never blocks the primary connection.
//! - Filter values are escaped with `ldap_escape`; moves use `modifyDN` with a
//!   new superior.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry, ldap_escape};
use tracing::{debug, info, warn};
use url::Url;

use crate::dn;
use crate::error::{DirectoryError, DirectoryResult};
use crate::model::{CandidateObject, DirectoryObject, ReplicaId, SearchScope};
use crate::service::DirectoryService;

const RC_SUCCESS: u32 = 0;
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INVALID_CREDENTIALS: u32 = 49;
const GENERALIZED_TIME: &str = "%Y%m%d%H%M%S";

/// Connection settings for [`LdapDirectory`].
#[derive(Clone)]
pub struct LdapSettings {
    /// Primary endpoint (`ldap://host:port`).
    pub url: String,
    /// Bind DN for simple authentication.
    pub bind_dn: String,
    /// Bind password.
    pub bind_password: String,
    /// Naming context used for object lookups.
    pub base_dn: String,
    /// Object class of relocatable objects.
    pub object_class: String,
    /// Static replica host names; empty means discover them.
    pub replicas: Vec<String>,
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for LdapSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapSettings")
            .field("url", &self.url)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"<redacted>")
            .field("base_dn", &self.base_dn)
            .field("object_class", &self.object_class)
            .field("replicas", &self.replicas)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Directory service backed by an LDAP server and its replicas.
pub struct LdapDirectory {
    settings: LdapSettings,
    primary_host: String,
    port: u16,
    ldap: Ldap,
}

impl std::fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("settings", &self.settings)
            .field("primary_host", &self.primary_host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl LdapDirectory {
    /// Connect and bind to the primary endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Malformed`] when the URL cannot be parsed and
    /// [`DirectoryError::Connection`] or [`DirectoryError::Rejected`] when the
    /// connection or bind fails.
    pub async fn connect(settings: LdapSettings) -> DirectoryResult<Self> {
        let parsed = Url::parse(&settings.url).map_err(|_| DirectoryError::Malformed {
            field: "directory.url",
            value: Some(settings.url.clone()),
        })?;
        let primary_host = parsed
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| DirectoryError::Malformed {
                field: "directory.url",
                value: Some(settings.url.clone()),
            })?;
        let port = parsed.port_or_known_default().unwrap_or(389);
        let ldap = open(&settings, &settings.url).await?;
        info!(url = %settings.url, "directory connection established");
        Ok(Self {
            settings,
            primary_host,
            port,
            ldap,
        })
    }

    /// Unbind the primary connection.
    pub async fn close(&self) {
        let mut ldap = self.ldap.clone();
        if let Err(error) = ldap.unbind().await {
            warn!(error = %error, "error during directory unbind");
        }
    }

    fn replica_url(&self, replica: &ReplicaId) -> String {
        format!("ldap://{}:{}", replica.as_str(), self.port)
    }

    fn object_filter(&self, name: &str) -> String {
        format!(
            "(&(objectClass={})(cn={}))",
            ldap_escape(&self.settings.object_class),
            ldap_escape(name)
        )
    }

    async fn locate(&self, name: &str, attrs: Vec<&str>) -> DirectoryResult<Option<SearchEntry>> {
        let mut ldap = self.ldap.clone();
        let filter = self.object_filter(name);
        let result = ldap
            .search(&self.settings.base_dn, Scope::Subtree, &filter, attrs)
            .await
            .map_err(|source| DirectoryError::operation("ldap.search", name, source))?;
        let (entries, outcome) = (result.0, result.1);
        if outcome.rc == RC_NO_SUCH_OBJECT {
            return Ok(None);
        }
        check_rc("ldap.search", name, outcome.rc, &outcome.text)?;
        Ok(entries.into_iter().next().map(SearchEntry::construct))
    }

    async fn discover_replicas(&self) -> DirectoryResult<Vec<ReplicaId>> {
        let mut ldap = self.ldap.clone();
        let root = ldap
            .search("", Scope::Base, "(objectClass=*)", vec!["configurationNamingContext"])
            .await
            .map_err(|source| DirectoryError::operation("ldap.root_dse", "", source))?;
        let (entries, outcome) = (root.0, root.1);
        check_rc("ldap.root_dse", "", outcome.rc, &outcome.text)?;
        let configuration = entries
            .into_iter()
            .next()
            .map(SearchEntry::construct)
            .and_then(|entry| first_value(&entry.attrs, "configurationNamingContext"))
            .ok_or(DirectoryError::Malformed {
                field: "configurationNamingContext",
                value: None,
            })?;

        let sites = format!("CN=Sites,{configuration}");
        let servers = ldap
            .search(&sites, Scope::Subtree, "(objectClass=server)", vec!["dNSHostName"])
            .await
            .map_err(|source| DirectoryError::operation("ldap.list_replicas", &sites, source))?;
        let (entries, outcome) = (servers.0, servers.1);
        check_rc("ldap.list_replicas", &sites, outcome.rc, &outcome.text)?;

        let mut replicas: Vec<ReplicaId> = entries
            .into_iter()
            .map(SearchEntry::construct)
            .filter_map(|entry| first_value(&entry.attrs, "dNSHostName"))
            .map(ReplicaId::from)
            .collect();
        if replicas.is_empty() {
            debug!(host = %self.primary_host, "no replicas advertised; using primary host");
            replicas.push(ReplicaId::new(self.primary_host.clone()));
        }
        Ok(replicas)
    }
}

#[async_trait]
impl DirectoryService for LdapDirectory {
    async fn list_replicas(&self) -> DirectoryResult<Vec<ReplicaId>> {
        if !self.settings.replicas.is_empty() {
            return Ok(self
                .settings
                .replicas
                .iter()
                .map(|host| ReplicaId::new(host.clone()))
                .collect());
        }
        self.discover_replicas().await
    }

    async fn query_created_since(
        &self,
        replica: &ReplicaId,
        since: DateTime<Utc>,
        scope: &SearchScope,
    ) -> DirectoryResult<Vec<CandidateObject>> {
        let url = self.replica_url(replica);
        let mut ldap = open(&self.settings, &url).await?;
        let filter = format!(
            "(&(objectClass={})(whenCreated>={}))",
            ldap_escape(&scope.object_class),
            format_generalized_time(since)
        );
        debug!(replica = %replica, filter = %filter, "querying replica");
        let result = ldap
            .search(&scope.base, Scope::Subtree, &filter, vec!["cn", "whenCreated"])
            .await
            .map_err(|source| DirectoryError::operation("ldap.query", replica.as_str(), source));
        if let Err(error) = ldap.unbind().await {
            debug!(replica = %replica, error = %error, "replica unbind failed");
        }
        let result = result?;
        let (entries, outcome) = (result.0, result.1);
        check_rc("ldap.query", replica.as_str(), outcome.rc, &outcome.text)?;

        let mut candidates = Vec::with_capacity(entries.len());
        for entry in entries.into_iter().map(SearchEntry::construct) {
            let Some(name) = first_value(&entry.attrs, "cn") else {
                warn!(replica = %replica, dn = %entry.dn, "entry without cn skipped");
                continue;
            };
            let Some(created_at) =
                first_value(&entry.attrs, "whenCreated").and_then(|raw| parse_generalized_time(&raw))
            else {
                warn!(replica = %replica, dn = %entry.dn, "entry without parsable whenCreated skipped");
                continue;
            };
            candidates.push(CandidateObject {
                name,
                path: entry.dn,
                created_at,
                replica: replica.clone(),
            });
        }
        Ok(candidates)
    }

    async fn find_object(&self, name: &str) -> DirectoryResult<Option<DirectoryObject>> {
        Ok(self
            .locate(name, vec!["cn"])
            .await?
            .map(|entry| DirectoryObject {
                name: first_value(&entry.attrs, "cn").unwrap_or_else(|| name.to_string()),
                path: entry.dn,
            }))
    }

    async fn read_attribute(&self, name: &str, key: &str) -> DirectoryResult<Option<String>> {
        let entry = self
            .locate(name, vec![key])
            .await?
            .ok_or_else(|| DirectoryError::NotFound {
                name: name.to_string(),
            })?;
        Ok(first_value(&entry.attrs, key))
    }

    async fn write_attribute(&self, name: &str, key: &str, value: &str) -> DirectoryResult<()> {
        let entry = self
            .locate(name, vec!["1.1"])
            .await?
            .ok_or_else(|| DirectoryError::NotFound {
                name: name.to_string(),
            })?;
        let mut ldap = self.ldap.clone();
        let mods = vec![Mod::Replace(key, HashSet::from([value]))];
        let outcome = ldap
            .modify(&entry.dn, mods)
            .await
            .map_err(|source| DirectoryError::operation("ldap.modify", &entry.dn, source))?;
        check_rc("ldap.modify", &entry.dn, outcome.rc, &outcome.text)
    }

    async fn path_exists(&self, path: &str) -> DirectoryResult<bool> {
        let mut ldap = self.ldap.clone();
        let result = ldap
            .search(path, Scope::Base, "(objectClass=*)", vec!["1.1"])
            .await
            .map_err(|source| DirectoryError::operation("ldap.path_exists", path, source))?;
        let (entries, outcome) = (result.0, result.1);
        if outcome.rc == RC_NO_SUCH_OBJECT {
            return Ok(false);
        }
        check_rc("ldap.path_exists", path, outcome.rc, &outcome.text)?;
        Ok(!entries.is_empty())
    }

    async fn move_object(&self, object_path: &str, destination: &str) -> DirectoryResult<()> {
        let rdn = dn::rdn(object_path).ok_or_else(|| DirectoryError::Malformed {
            field: "dn",
            value: Some(object_path.to_string()),
        })?;
        let mut ldap = self.ldap.clone();
        let outcome = ldap
            .modifydn(object_path, &rdn, true, Some(destination))
            .await
            .map_err(|source| DirectoryError::operation("ldap.modifydn", object_path, source))?;
        check_rc("ldap.modifydn", object_path, outcome.rc, &outcome.text)
    }
}

async fn open(settings: &LdapSettings, url: &str) -> DirectoryResult<Ldap> {
    let conn_settings = LdapConnSettings::new().set_conn_timeout(settings.connect_timeout);
    let (conn, mut ldap) = LdapConnAsync::with_settings(conn_settings, url)
        .await
        .map_err(|source| DirectoryError::connection(url, source))?;
    tokio::spawn(async move {
        if let Err(error) = conn.drive().await {
            warn!(error = %error, "directory connection driver error");
        }
    });

    let outcome = ldap
        .simple_bind(&settings.bind_dn, &settings.bind_password)
        .await
        .map_err(|source| DirectoryError::connection(url, source))?;
    if outcome.rc == RC_INVALID_CREDENTIALS {
        return Err(DirectoryError::Rejected {
            operation: "ldap.bind",
            target: url.to_string(),
            code: outcome.rc,
            message: "invalid credentials".to_string(),
        });
    }
    check_rc("ldap.bind", url, outcome.rc, &outcome.text)?;
    Ok(ldap)
}

fn check_rc(operation: &'static str, target: &str, rc: u32, text: &str) -> DirectoryResult<()> {
    if rc == RC_SUCCESS {
        return Ok(());
    }
    Err(DirectoryError::Rejected {
        operation,
        target: target.to_string(),
        code: rc,
        message: text.to_string(),
    })
}

/// Attribute names are case-insensitive on the wire.
fn first_value(attrs: &HashMap<String, Vec<String>>, key: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .and_then(|(_, values)| values.first().cloned())
}

fn format_generalized_time(at: DateTime<Utc>) -> String {
    format!("{}.0Z", at.format(GENERALIZED_TIME))
}

fn parse_generalized_time(raw: &str) -> Option<DateTime<Utc>> {
    let digits = raw.get(..14)?;
    NaiveDateTime::parse_from_str(digits, GENERALIZED_TIME)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generalized_time_formats_and_parses() -> Result<(), Box<dyn std::error::Error>> {
        let at = Utc
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
            .single()
            .ok_or("invalid timestamp")?;
        assert_eq!(format_generalized_time(at), "20240309070501.0Z");
        assert_eq!(parse_generalized_time("20240309070501.0Z"), Some(at));
        assert_eq!(parse_generalized_time("2024"), None);
        assert_eq!(parse_generalized_time("garbage-garbage-garbage"), None);
        Ok(())
    }

    #[test]
    fn first_value_ignores_attribute_case() {
        let mut attrs = HashMap::new();
        attrs.insert("whencreated".to_string(), vec!["20240101000000.0Z".to_string()]);
        attrs.insert("cn".to_string(), Vec::new());
        assert_eq!(
            first_value(&attrs, "whenCreated").as_deref(),
            Some("20240101000000.0Z")
        );
        assert_eq!(first_value(&attrs, "cn"), None);
        assert_eq!(first_value(&attrs, "missing"), None);
    }

    #[test]
    fn check_rc_maps_failures_to_rejected() {
        assert!(check_rc("ldap.modify", "CN=PC1", 0, "").is_ok());
        let error = check_rc("ldap.modify", "CN=PC1", 50, "insufficientAccessRights");
        assert!(matches!(
            error,
            Err(DirectoryError::Rejected { code: 50, .. })
        ));
    }

    #[test]
    fn settings_debug_redacts_password() {
        let settings = LdapSettings {
            url: "ldap://dc01.example.com:389".into(),
            bind_dn: "CN=svc,DC=example,DC=com".into(),
            bind_password: "hunter2".into(),
            base_dn: "DC=example,DC=com".into(),
            object_class: "computer".into(),
            replicas: Vec::new(),
            connect_timeout: Duration::from_secs(5),
        };
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
