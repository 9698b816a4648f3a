//! Directory objects and replica identifiers shared by adapters and the engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of one directory-service replica (usually its DNS host name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaId(String);

impl ReplicaId {
    /// Wrap a replica identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive key used for de-duplication.
    #[must_use]
    pub fn key(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReplicaId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ReplicaId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An object observed as newly created on one replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateObject {
    /// Unique naming identifier (e.g. the computer name).
    pub name: String,
    /// Distinguished name as reported by the replica.
    pub path: String,
    /// Creation timestamp reported by the replica.
    pub created_at: DateTime<Utc>,
    /// Replica the object was observed on.
    pub replica: ReplicaId,
}

impl CandidateObject {
    /// Case-insensitive identity key.
    #[must_use]
    pub fn key(&self) -> String {
        self.name.to_ascii_lowercase()
    }
}

/// Fresh view of an object's current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryObject {
    /// Unique naming identifier.
    pub name: String,
    /// Current distinguished name.
    pub path: String,
}

/// Where and what to look for when scanning a replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchScope {
    /// Subtree root for the search.
    pub base: String,
    /// Object class to restrict the search to.
    pub object_class: String,
}
