#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, unused)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Discovery, de-duplication and idempotent relocation of new directory objects.
//!
//! Layout: `rules.rs` (ordered pattern matcher), `replicas.rs` (replica
//! enumeration), `scanner.rs` (per-replica fan-out), `aggregate.rs` (cross-replica
//! de-duplication), `marker.rs` (processed markers), `relocate.rs` (placement
//! checks and moves), `orchestrator.rs` (cycle driver), `model.rs` (outcomes and
//! reports), `error.rs` (structured errors).

pub mod aggregate;
pub mod error;
pub mod marker;
pub mod model;
pub mod orchestrator;
pub mod relocate;
pub mod replicas;
pub mod rules;
pub mod scanner;

pub use error::{EngineError, EngineResult, ScanError};
pub use marker::{
    DirectoryMarkerBackend, Marker, MarkerBackend, MarkerOutcome, MarkerPolicy, MarkerState,
    MarkerStore, RetryPolicy,
};
pub use model::{CycleResult, CycleStatus, ObjectOutcome, ObjectReport, RelocationOutcome, ReplicaReport};
pub use orchestrator::RelocationEngine;
pub use relocate::Relocator;
pub use rules::{RuleMatch, RuleMatcher};
