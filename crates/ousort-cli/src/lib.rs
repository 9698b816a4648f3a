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
#![allow(clippy::module_name_repetitions, clippy::redundant_pub_crate)]

//! Command-line entrypoint for the ousort relocation service.
//!
//! Layout:
//! - `cli.rs`: argument parsing and dispatch
//! - `bootstrap.rs`: configuration, logging, directory and engine wiring
//! - `error.rs`: invocation errors and exit codes
//! - `output.rs`: cycle summary renderers
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod bootstrap;
pub mod error;
pub(crate) mod output;

mod cli;

pub use cli::run;
pub use error::{AppError, AppResult};
