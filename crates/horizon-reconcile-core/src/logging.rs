//! Logging and tracing facilities for Horizon Reconcile.
//!
//! Horizon Reconcile uses the `tracing` crate for instrumentation. Nothing is
//! printed unless the host application installs a subscriber:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_reconcile=debug")
//!         .init();
//! }
//! ```
//!
//! Diff inconsistencies (stale indices, duplicate identities in a snapshot)
//! are reported at `warn` level on the target of the component that detected
//! them. Individual edits are traced at `trace` level when
//! [`ReconcileConfig::log_edits`](crate::ReconcileConfig) is enabled.

/// Span names used throughout Horizon Reconcile for tracing.
///
/// These constants can be used to filter traces for specific subsystems.
pub mod span_names {
    /// One composite update pass.
    pub const UPDATE_PASS: &str = "horizon_reconcile::update_pass";
    /// A list-backed segment diff.
    pub const LIST_DIFF: &str = "horizon_reconcile::list_diff";
    /// A filter-backed segment diff.
    pub const FILTER_DIFF: &str = "horizon_reconcile::filter_diff";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core runtime target.
    pub const CORE: &str = "horizon_reconcile_core";
    /// Update scheduling target.
    pub const SCHEDULER: &str = "horizon_reconcile_core::scheduler";
    /// Composite reconciler target.
    pub const COMPOSITE: &str = "horizon_reconcile::composite";
    /// List-backed segment target.
    pub const LIST_SEGMENT: &str = "horizon_reconcile::list_segment";
    /// Filter-backed segment target.
    pub const FILTER_SEGMENT: &str = "horizon_reconcile::filter_segment";
    /// Transaction replay target.
    pub const TRANSACTION: &str = "horizon_reconcile::transaction";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: "horizon_reconcile::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Reports a diff inconsistency.
///
/// In strict mode this panics, which is how tests catch malformed backing
/// data. Otherwise the message is logged and the caller drops the edit.
#[track_caller]
pub fn report_inconsistency(strict: bool, target: &'static str, message: std::fmt::Arguments<'_>) {
    if strict {
        panic!("reconcile inconsistency ({target}): {message}");
    }
    match target {
        targets::LIST_SEGMENT => tracing::warn!(target: "horizon_reconcile::list_segment", "{}", message),
        targets::FILTER_SEGMENT => {
            tracing::warn!(target: "horizon_reconcile::filter_segment", "{}", message)
        }
        targets::COMPOSITE => tracing::warn!(target: "horizon_reconcile::composite", "{}", message),
        _ => tracing::warn!(target: "horizon_reconcile_core", "{}", message),
    }
}

/// Macros for common tracing patterns.
///
/// These are thin wrappers around the `tracing` macros with consistent
/// target naming.
#[macro_export]
macro_rules! reconcile_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "horizon_reconcile_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! reconcile_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "horizon_reconcile_core", $($arg)*)
    };
}
