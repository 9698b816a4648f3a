//! Cross-replica de-duplication of candidates.

use std::collections::HashSet;

use ousort_directory::CandidateObject;

use crate::scanner::ScanResult;

/// Union of replica results keyed by case-insensitive name.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    /// Distinct candidates in first-seen order.
    pub candidates: Vec<CandidateObject>,
    /// Candidates returned across all replicas before de-duplication.
    pub observed: usize,
}

/// Merge successful scans; the first replica (in enumeration order) to report
/// a name supplies its record.
#[must_use]
pub fn aggregate(results: &[ScanResult]) -> Aggregate {
    let mut seen = HashSet::new();
    let mut merged = Aggregate::default();
    for candidates in results.iter().filter_map(|result| result.outcome.as_ref().ok()) {
        merged.observed += candidates.len();
        for candidate in candidates {
            if seen.insert(candidate.key()) {
                merged.candidates.push(candidate.clone());
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;
    use ousort_directory::ReplicaId;

    use crate::error::ScanError;

    fn candidate(name: &str, replica: &str) -> CandidateObject {
        CandidateObject {
            name: name.into(),
            path: format!("CN={name},CN=Computers,DC=example,DC=com"),
            created_at: Utc::now(),
            replica: ReplicaId::from(replica),
        }
    }

    fn scan(replica: &str, names: &[&str]) -> ScanResult {
        ScanResult {
            replica: ReplicaId::from(replica),
            outcome: Ok(names.iter().map(|name| candidate(name, replica)).collect()),
            latency: Duration::from_millis(3),
        }
    }

    #[test]
    fn same_object_on_two_replicas_counts_once() {
        let merged = aggregate(&[scan("R1", &["ALPHA-1"]), scan("R2", &["alpha-1", "BETA-2"])]);
        assert_eq!(merged.observed, 3);
        let names: Vec<_> = merged
            .candidates
            .iter()
            .map(|c| (c.name.as_str(), c.replica.as_str()))
            .collect();
        assert_eq!(names, vec![("ALPHA-1", "R1"), ("BETA-2", "R2")]);
    }

    #[test]
    fn failed_scans_contribute_nothing() {
        let failed = ScanResult {
            replica: ReplicaId::from("R1"),
            outcome: Err(ScanError::Timeout {
                after: Duration::from_secs(1),
            }),
            latency: Duration::from_secs(1),
        };
        let merged = aggregate(&[failed, scan("R2", &["ZETA-3"])]);
        assert_eq!(merged.observed, 1);
        assert_eq!(merged.candidates.len(), 1);
    }

    #[test]
    fn empty_input_yields_empty_set() {
        let merged = aggregate(&[]);
        assert!(merged.candidates.is_empty());
        assert_eq!(merged.observed, 0);
    }
}
