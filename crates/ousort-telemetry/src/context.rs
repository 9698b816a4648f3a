//! Application and cycle span helpers.
//!
//! # Design
//! - The application span carries the invocation mode and build identifier for
//!   the lifetime of the process.
//! - Each cycle gets its own span with a fresh run id so interleaved runs from
//!   overlapping schedulers can be told apart in shared log files.

use tracing::{Span, span::Entered};
use uuid::Uuid;

use crate::init::build_sha;

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    #[must_use]
    /// Enter the application-level tracing span for the lifetime of the guard.
    pub fn new(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("app", mode = %mode, build_sha = %build_sha()),
        ));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Generate an identifier for one cycle.
#[must_use]
pub fn new_run_id() -> Uuid {
    Uuid::new_v4()
}

/// Span wrapping one discovery/filter/process cycle.
#[must_use]
pub fn cycle_span(run_id: Uuid, simulate: bool) -> Span {
    tracing::info_span!("cycle", run_id = %run_id, simulate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_context_guard_enters_app_span() {
        let guard = GlobalContextGuard::new("poll");
        drop(guard);
    }

    #[test]
    fn run_ids_are_unique() {
        let first = new_run_id();
        let second = new_run_id();
        assert_ne!(first, second);
        let span = cycle_span(first, true);
        let _entered = span.enter();
    }
}
