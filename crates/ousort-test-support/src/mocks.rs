//! In-memory [`DirectoryService`] double.
//!
//! # Design
//! - Objects carry per-replica visibility to model replication lag.
//! - Failures are injected per replica (scan errors, delays) and per object
//!   (move denial, read and write failures).
//! - Every mutating call is recorded so tests can assert on side effects.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ousort_directory::dn;
use ousort_directory::{
    CandidateObject, DirectoryError, DirectoryObject, DirectoryResult, DirectoryService,
    ReplicaId, SearchScope,
};

const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INSUFFICIENT_ACCESS: u32 = 50;
const RC_UNAVAILABLE: u32 = 52;
const RC_OTHER: u32 = 80;

#[derive(Debug, Clone)]
struct StoredObject {
    name: String,
    path: String,
    created_at: DateTime<Utc>,
    attributes: HashMap<String, String>,
    visible_on: Option<HashSet<String>>,
}

#[derive(Debug, Default)]
struct State {
    replicas: Vec<ReplicaId>,
    discovery_fails: bool,
    objects: BTreeMap<String, StoredObject>,
    containers: HashSet<String>,
    failing_replicas: HashSet<String>,
    delayed_replicas: HashMap<String, Duration>,
    denied_moves: HashSet<String>,
    failing_writes: HashSet<String>,
    failing_reads: HashSet<String>,
    moves: Vec<(String, String)>,
    writes: Vec<(String, String, String)>,
    queries: Vec<ReplicaId>,
    lookups: usize,
}

/// Directory double backed by in-process maps.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
}

impl InMemoryDirectory {
    /// Empty directory with no replicas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory serving the given replicas in order.
    #[must_use]
    pub fn with_replicas(replicas: &[&str]) -> Self {
        let directory = Self::new();
        directory.lock().replicas = replicas.iter().map(|id| ReplicaId::from(*id)).collect();
        directory
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Register an existing container.
    pub fn add_container(&self, path: &str) {
        self.lock().containers.insert(dn::normalize(path));
    }

    /// Add an object visible on every replica.
    pub fn add_object(&self, name: &str, path: &str, created_at: DateTime<Utc>) {
        self.insert_object(name, path, created_at, None);
    }

    /// Add an object visible only on the listed replicas.
    pub fn add_object_on(
        &self,
        name: &str,
        path: &str,
        created_at: DateTime<Utc>,
        replicas: &[&str],
    ) {
        let visible = replicas
            .iter()
            .map(|replica| replica.to_ascii_lowercase())
            .collect();
        self.insert_object(name, path, created_at, Some(visible));
    }

    fn insert_object(
        &self,
        name: &str,
        path: &str,
        created_at: DateTime<Utc>,
        visible_on: Option<HashSet<String>>,
    ) {
        self.lock().objects.insert(
            name.to_ascii_lowercase(),
            StoredObject {
                name: name.to_string(),
                path: path.to_string(),
                created_at,
                attributes: HashMap::new(),
                visible_on,
            },
        );
    }

    /// Make a previously hidden object visible on `replica`.
    pub fn replicate_to(&self, name: &str, replica: &str) {
        if let Some(object) = self.lock().objects.get_mut(&name.to_ascii_lowercase())
            && let Some(visible) = object.visible_on.as_mut()
        {
            visible.insert(replica.to_ascii_lowercase());
        }
    }

    /// Seed an attribute value.
    pub fn set_attribute(&self, name: &str, key: &str, value: &str) {
        if let Some(object) = self.lock().objects.get_mut(&name.to_ascii_lowercase()) {
            object
                .attributes
                .insert(key.to_ascii_lowercase(), value.to_string());
        }
    }

    /// Make scans of `replica` fail.
    pub fn fail_replica(&self, replica: &str) {
        self.lock()
            .failing_replicas
            .insert(replica.to_ascii_lowercase());
    }

    /// Delay scans of `replica` before answering.
    pub fn delay_replica(&self, replica: &str, delay: Duration) {
        self.lock()
            .delayed_replicas
            .insert(replica.to_ascii_lowercase(), delay);
    }

    /// Make replica enumeration fail.
    pub fn fail_discovery(&self) {
        self.lock().discovery_fails = true;
    }

    /// Reject moves of `name` with an access error.
    pub fn deny_move(&self, name: &str) {
        self.lock().denied_moves.insert(name.to_ascii_lowercase());
    }

    /// Reject attribute writes on `name`.
    pub fn fail_writes(&self, name: &str) {
        self.lock().failing_writes.insert(name.to_ascii_lowercase());
    }

    /// Reject attribute reads on `name`.
    pub fn fail_reads(&self, name: &str) {
        self.lock().failing_reads.insert(name.to_ascii_lowercase());
    }

    /// Current path of `name`.
    #[must_use]
    pub fn object_path(&self, name: &str) -> Option<String> {
        self.lock()
            .objects
            .get(&name.to_ascii_lowercase())
            .map(|object| object.path.clone())
    }

    /// Current value of an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str, key: &str) -> Option<String> {
        self.lock()
            .objects
            .get(&name.to_ascii_lowercase())
            .and_then(|object| object.attributes.get(&key.to_ascii_lowercase()).cloned())
    }

    /// Moves performed, as `(object path, destination)`.
    #[must_use]
    pub fn moves(&self) -> Vec<(String, String)> {
        self.lock().moves.clone()
    }

    /// Number of attribute writes performed.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    /// Number of scans issued against `replica`.
    #[must_use]
    pub fn query_count(&self, replica: &str) -> usize {
        self.lock()
            .queries
            .iter()
            .filter(|queried| queried.as_str().eq_ignore_ascii_case(replica))
            .count()
    }

    /// Number of fresh object lookups.
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.lock().lookups
    }
}

fn rejected(operation: &'static str, target: &str, code: u32, message: &str) -> DirectoryError {
    DirectoryError::Rejected {
        operation,
        target: target.to_string(),
        code,
        message: message.to_string(),
    }
}

#[async_trait]
impl DirectoryService for InMemoryDirectory {
    async fn list_replicas(&self) -> DirectoryResult<Vec<ReplicaId>> {
        let state = self.lock();
        if state.discovery_fails {
            return Err(rejected(
                "memory.list_replicas",
                "",
                RC_UNAVAILABLE,
                "directory unavailable",
            ));
        }
        Ok(state.replicas.clone())
    }

    async fn query_created_since(
        &self,
        replica: &ReplicaId,
        since: DateTime<Utc>,
        scope: &SearchScope,
    ) -> DirectoryResult<Vec<CandidateObject>> {
        let key = replica.key();
        let delay = {
            let mut state = self.lock();
            state.queries.push(replica.clone());
            state.delayed_replicas.get(&key).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.lock();
        if state.failing_replicas.contains(&key) {
            return Err(rejected(
                "memory.query",
                replica.as_str(),
                RC_UNAVAILABLE,
                "replica unavailable",
            ));
        }
        Ok(state
            .objects
            .values()
            .filter(|object| {
                object
                    .visible_on
                    .as_ref()
                    .is_none_or(|visible| visible.contains(&key))
            })
            .filter(|object| object.created_at >= since)
            .filter(|object| dn::is_under(&object.path, &scope.base))
            .map(|object| CandidateObject {
                name: object.name.clone(),
                path: object.path.clone(),
                created_at: object.created_at,
                replica: replica.clone(),
            })
            .collect())
    }

    async fn find_object(&self, name: &str) -> DirectoryResult<Option<DirectoryObject>> {
        let mut state = self.lock();
        state.lookups += 1;
        Ok(state
            .objects
            .get(&name.to_ascii_lowercase())
            .map(|object| DirectoryObject {
                name: object.name.clone(),
                path: object.path.clone(),
            }))
    }

    async fn read_attribute(&self, name: &str, key: &str) -> DirectoryResult<Option<String>> {
        let state = self.lock();
        let lookup = name.to_ascii_lowercase();
        if state.failing_reads.contains(&lookup) {
            return Err(rejected("memory.read", name, RC_OTHER, "read failed"));
        }
        let object = state
            .objects
            .get(&lookup)
            .ok_or_else(|| DirectoryError::NotFound {
                name: name.to_string(),
            })?;
        Ok(object.attributes.get(&key.to_ascii_lowercase()).cloned())
    }

    async fn write_attribute(&self, name: &str, key: &str, value: &str) -> DirectoryResult<()> {
        let mut state = self.lock();
        let lookup = name.to_ascii_lowercase();
        if state.failing_writes.contains(&lookup) {
            return Err(rejected(
                "memory.write",
                name,
                RC_INSUFFICIENT_ACCESS,
                "write denied",
            ));
        }
        let object = state
            .objects
            .get_mut(&lookup)
            .ok_or_else(|| DirectoryError::NotFound {
                name: name.to_string(),
            })?;
        object
            .attributes
            .insert(key.to_ascii_lowercase(), value.to_string());
        state
            .writes
            .push((name.to_string(), key.to_string(), value.to_string()));
        Ok(())
    }

    async fn path_exists(&self, path: &str) -> DirectoryResult<bool> {
        let state = self.lock();
        let normalized = dn::normalize(path);
        Ok(state.containers.contains(&normalized)
            || state
                .objects
                .values()
                .any(|object| dn::normalize(&object.path) == normalized))
    }

    async fn move_object(&self, object_path: &str, destination: &str) -> DirectoryResult<()> {
        let mut state = self.lock();
        if !state.containers.contains(&dn::normalize(destination)) {
            return Err(rejected(
                "memory.move",
                destination,
                RC_NO_SUCH_OBJECT,
                "no such object",
            ));
        }
        let normalized = dn::normalize(object_path);
        let Some(key) = state
            .objects
            .iter()
            .find(|(_, object)| dn::normalize(&object.path) == normalized)
            .map(|(key, _)| key.clone())
        else {
            return Err(rejected(
                "memory.move",
                object_path,
                RC_NO_SUCH_OBJECT,
                "no such object",
            ));
        };
        if state.denied_moves.contains(&key) {
            return Err(rejected(
                "memory.move",
                object_path,
                RC_INSUFFICIENT_ACCESS,
                "insufficient access rights",
            ));
        }
        let rdn = dn::rdn(object_path).unwrap_or_default();
        let new_path = format!("{rdn},{destination}");
        if let Some(object) = state.objects.get_mut(&key) {
            object.path = new_path;
        }
        state
            .moves
            .push((object_path.to_string(), destination.to_string()));
        Ok(())
    }
}
