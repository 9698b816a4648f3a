//! Directory capability consumed by the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DirectoryResult;
use crate::model::{CandidateObject, DirectoryObject, ReplicaId, SearchScope};

/// Authenticated, connected directory client.
///
/// Implementations must be safe to share across the per-replica scan tasks.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Enumerate the replicas currently serving the directory.
    async fn list_replicas(&self) -> DirectoryResult<Vec<ReplicaId>>;

    /// Objects created on `replica` at or after `since`.
    async fn query_created_since(
        &self,
        replica: &ReplicaId,
        since: DateTime<Utc>,
        scope: &SearchScope,
    ) -> DirectoryResult<Vec<CandidateObject>>;

    /// Fresh lookup of an object's current state; `None` when it does not exist.
    async fn find_object(&self, name: &str) -> DirectoryResult<Option<DirectoryObject>>;

    /// Point read of a single-valued attribute.
    async fn read_attribute(&self, name: &str, key: &str) -> DirectoryResult<Option<String>>;

    /// Replace a single-valued attribute.
    async fn write_attribute(&self, name: &str, key: &str, value: &str) -> DirectoryResult<()>;

    /// Whether a container exists.
    async fn path_exists(&self, path: &str) -> DirectoryResult<bool>;

    /// Move the object at `object_path` beneath `destination`.
    async fn move_object(&self, object_path: &str, destination: &str) -> DirectoryResult<()>;
}
