//! Replica enumeration.

use std::collections::HashSet;

use ousort_directory::{DirectoryService, ReplicaId};
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};

/// List replicas, collapsing case-insensitive duplicates in first-seen order.
///
/// # Errors
///
/// Returns [`EngineError::Discovery`] when the directory cannot enumerate
/// replicas at all.
pub async fn enumerate(directory: &dyn DirectoryService) -> EngineResult<Vec<ReplicaId>> {
    let listed = directory
        .list_replicas()
        .await
        .map_err(|source| EngineError::Discovery { source })?;
    let replicas = dedupe(listed);
    info!(count = replicas.len(), "replicas enumerated");
    Ok(replicas)
}

fn dedupe(listed: Vec<ReplicaId>) -> Vec<ReplicaId> {
    let mut seen = HashSet::new();
    listed
        .into_iter()
        .filter(|replica| {
            let fresh = seen.insert(replica.key());
            if !fresh {
                debug!(replica = %replica, "duplicate replica ignored");
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_preserves_first_seen_order() {
        let listed = ["dc02", "DC01", "dc01", "Dc02", "dc03"]
            .into_iter()
            .map(ReplicaId::from)
            .collect();
        let replicas: Vec<String> = dedupe(listed)
            .iter()
            .map(|replica| replica.as_str().to_string())
            .collect();
        assert_eq!(replicas, vec!["dc02", "DC01", "dc03"]);
    }
}
