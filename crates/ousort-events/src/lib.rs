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

//! Change-notification records that trigger a single-object relocation.
//!
//! The event trigger hands over one JSON rendering of an account-created audit
//! record; this crate parses it and extracts the computer name the engine
//! should process.

pub mod error;
pub mod record;

pub use error::{EventRecordError, EventRecordResult};
pub use record::{
    ACCOUNT_CREATED_EVENT_ID, AccountCreatedRecord, EventData, NewObjectNotice, parse_record,
    read_record,
};
