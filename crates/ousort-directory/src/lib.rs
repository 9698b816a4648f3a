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

//! Directory service capability consumed by the relocation engine.
//!
//! Layout: `model.rs` (objects and replica identifiers), `service.rs`
//! (`DirectoryService` trait), `dn.rs` (distinguished-name helpers), `ldap.rs`
//! (LDAP-backed implementation), `error.rs` (structured errors).

pub mod dn;
pub mod error;
pub mod ldap;
pub mod model;
pub mod service;

pub use error::{DirectoryError, DirectoryResult};
pub use ldap::{LdapDirectory, LdapSettings};
pub use model::{CandidateObject, DirectoryObject, ReplicaId, SearchScope};
pub use service::DirectoryService;
