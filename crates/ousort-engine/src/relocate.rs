//! Placement checks and moves for a single object.
//!
//! # Design
//! - The object's path is always re-read before deciding; scan data may be
//!   stale by the time processing reaches it.
//! - An object already beneath its destination, at any depth, is left alone,
//!   which makes repeated relocation a no-op.
//! - A missing destination is checked before the move so operators get a
//!   specific outcome rather than a generic rejection.

use std::sync::Arc;

use ousort_directory::{DirectoryService, dn};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::model::RelocationOutcome;

/// Moves objects into their destination containers.
#[derive(Clone)]
pub struct Relocator {
    directory: Arc<dyn DirectoryService>,
    simulate: bool,
}

impl Relocator {
    /// Build a relocator; in simulate mode moves are logged, never issued.
    #[must_use]
    pub fn new(directory: Arc<dyn DirectoryService>, simulate: bool) -> Self {
        Self {
            directory,
            simulate,
        }
    }

    /// Ensure `name` sits beneath `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ObjectNotFound`] when the fresh lookup finds
    /// nothing and [`EngineError::Lookup`] when the lookup or the destination
    /// check cannot be completed. Rejected moves are reported as
    /// [`RelocationOutcome::MoveFailed`], not as errors.
    pub async fn relocate(&self, name: &str, destination: &str) -> EngineResult<RelocationOutcome> {
        let object = self
            .directory
            .find_object(name)
            .await
            .map_err(|source| EngineError::lookup("find_object", name, source))?
            .ok_or_else(|| EngineError::ObjectNotFound {
                name: name.to_string(),
            })?;

        if dn::is_under(&object.path, destination) {
            debug!(name, path = %object.path, "object already in place");
            return Ok(RelocationOutcome::AlreadyInPlace { path: object.path });
        }

        let exists = self
            .directory
            .path_exists(destination)
            .await
            .map_err(|source| EngineError::lookup("path_exists", destination, source))?;
        if !exists {
            warn!(name, destination, "destination container does not exist");
            return Ok(RelocationOutcome::DestinationMissing {
                destination: destination.to_string(),
            });
        }

        if self.simulate {
            info!(name, from = %object.path, to = destination, "simulate: would move object");
            return Ok(RelocationOutcome::Simulated {
                from: object.path,
                to: destination.to_string(),
            });
        }

        match self.directory.move_object(&object.path, destination).await {
            Ok(()) => {
                info!(name, from = %object.path, to = destination, "object moved");
                Ok(RelocationOutcome::Moved {
                    from: object.path,
                    to: destination.to_string(),
                })
            }
            Err(error) => {
                let detail = error.describe();
                warn!(name, from = %object.path, to = destination, error = %detail, "move rejected");
                Ok(RelocationOutcome::MoveFailed {
                    from: object.path,
                    detail,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::Utc;
    use ousort_test_support::InMemoryDirectory;
    use ousort_test_support::fixtures::{OU_ALPHA, computer_path, scenario_directory};

    fn relocator(directory: &Arc<InMemoryDirectory>, simulate: bool) -> Relocator {
        Relocator::new(directory.clone(), simulate)
    }

    #[tokio::test]
    async fn moves_then_reports_in_place() -> Result<()> {
        let directory = Arc::new(scenario_directory());
        directory.add_object("ALPHA-1", &computer_path("ALPHA-1"), Utc::now());
        let relocator = relocator(&directory, false);

        let first = relocator.relocate("ALPHA-1", OU_ALPHA).await?;
        assert!(matches!(first, RelocationOutcome::Moved { .. }));
        let second = relocator.relocate("ALPHA-1", OU_ALPHA).await?;
        assert!(matches!(second, RelocationOutcome::AlreadyInPlace { .. }));
        assert_eq!(directory.moves().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn nested_container_counts_as_in_place() -> Result<()> {
        let directory = Arc::new(scenario_directory());
        directory.add_object(
            "ALPHA-2",
            &format!("CN=ALPHA-2,OU=Lab,{OU_ALPHA}"),
            Utc::now(),
        );
        let outcome = relocator(&directory, false)
            .relocate("alpha-2", OU_ALPHA)
            .await?;
        assert!(matches!(outcome, RelocationOutcome::AlreadyInPlace { .. }));
        assert!(directory.moves().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_destination_is_reported_without_move() -> Result<()> {
        let directory = Arc::new(scenario_directory());
        directory.add_object("ALPHA-3", &computer_path("ALPHA-3"), Utc::now());
        let outcome = relocator(&directory, false)
            .relocate("ALPHA-3", "OU=Gone,DC=example,DC=com")
            .await?;
        assert_eq!(
            outcome,
            RelocationOutcome::DestinationMissing {
                destination: "OU=Gone,DC=example,DC=com".into()
            }
        );
        assert!(directory.moves().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn rejected_move_is_an_outcome() -> Result<()> {
        let directory = Arc::new(scenario_directory());
        directory.add_object("ALPHA-4", &computer_path("ALPHA-4"), Utc::now());
        directory.deny_move("ALPHA-4");
        let outcome = relocator(&directory, false)
            .relocate("ALPHA-4", OU_ALPHA)
            .await?;
        assert!(matches!(outcome, RelocationOutcome::MoveFailed { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn simulate_issues_no_move() -> Result<()> {
        let directory = Arc::new(scenario_directory());
        directory.add_object("ALPHA-5", &computer_path("ALPHA-5"), Utc::now());
        let outcome = relocator(&directory, true)
            .relocate("ALPHA-5", OU_ALPHA)
            .await?;
        assert!(matches!(outcome, RelocationOutcome::Simulated { .. }));
        assert!(directory.moves().is_empty());
        assert_eq!(
            directory.object_path("ALPHA-5"),
            Some(computer_path("ALPHA-5"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn vanished_object_is_an_error() {
        let directory = Arc::new(scenario_directory());
        let result = relocator(&directory, false).relocate("GHOST", OU_ALPHA).await;
        assert!(matches!(result, Err(EngineError::ObjectNotFound { .. })));
        assert_eq!(directory.lookup_count(), 1);
    }
}
