//! Coalesced update scheduling.
//!
//! Segments request an update whenever their backing data or visibility
//! changes. Any number of requests made before the owner drains collapse
//! into a single pending flag, so N calls produce exactly one update pass.
//!
//! The host event loop is told about the first request of each scheduling
//! turn through an optional waker, typically a closure that posts a task
//! which calls `Composite::process_updates` on the owner context.
//!
//! # Example
//!
//! ```
//! use horizon_reconcile_core::UpdateScheduler;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let scheduler = UpdateScheduler::new();
//! let wakes = Arc::new(AtomicUsize::new(0));
//! let wakes_clone = wakes.clone();
//! scheduler.set_waker(move || {
//!     wakes_clone.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! scheduler.schedule();
//! scheduler.schedule();
//! scheduler.schedule();
//!
//! // One wake-up and one pending pass for three requests.
//! assert_eq!(wakes.load(Ordering::SeqCst), 1);
//! assert!(scheduler.take_pending());
//! assert!(!scheduler.take_pending());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

/// Callback invoked on the first request of a scheduling turn.
type Waker = Arc<dyn Fn() + Send + Sync>;

struct SchedulerState {
    /// Set by `schedule`, cleared by `take_pending`.
    pending: AtomicBool,
    /// Total number of `schedule` calls.
    requests: AtomicU64,
    /// Number of scheduling turns (false -> true transitions of `pending`).
    turns: AtomicU64,
    waker: RwLock<Option<Waker>>,
}

/// Thread-safe, coalescing update request flag shared by a composite and
/// its segments.
#[derive(Clone)]
pub struct UpdateScheduler {
    inner: Arc<SchedulerState>,
}

impl Default for UpdateScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UpdateScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateScheduler")
            .field("pending", &self.is_pending())
            .field("requests", &self.request_count())
            .field("turns", &self.turn_count())
            .finish()
    }
}

impl UpdateScheduler {
    /// Create a scheduler with nothing pending.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SchedulerState {
                pending: AtomicBool::new(false),
                requests: AtomicU64::new(0),
                turns: AtomicU64::new(0),
                waker: RwLock::new(None),
            }),
        }
    }

    /// Install the callback run on the first request of each turn.
    pub fn set_waker<F>(&self, waker: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.inner.waker.write() = Some(Arc::new(waker));
        crate::reconcile_debug!("update waker installed");
    }

    /// Remove the waker.
    pub fn clear_waker(&self) {
        *self.inner.waker.write() = None;
        crate::reconcile_debug!("update waker cleared");
    }

    /// Request an update pass.
    ///
    /// Returns `true` if this request opened a new scheduling turn, `false`
    /// if a pass was already pending. May be called from any thread.
    pub fn schedule(&self) -> bool {
        self.inner.requests.fetch_add(1, Ordering::Relaxed);
        if self.inner.pending.swap(true, Ordering::AcqRel) {
            return false;
        }
        let turn = self.inner.turns.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(target: "horizon_reconcile_core::scheduler", turn, "update scheduled");

        // Clone out of the lock so a waker may reinstall itself.
        let waker = self.inner.waker.read().clone();
        if let Some(waker) = waker {
            waker();
        }
        true
    }

    /// Returns `true` if a pass has been requested and not yet taken.
    pub fn is_pending(&self) -> bool {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Claim the pending request, if any.
    ///
    /// The owner calls this immediately before running a pass. Requests made
    /// while the pass runs set the flag again and yield one more pass.
    pub fn take_pending(&self) -> bool {
        self.inner.pending.swap(false, Ordering::AcqRel)
    }

    /// Total number of requests seen.
    pub fn request_count(&self) -> u64 {
        self.inner.requests.load(Ordering::Relaxed)
    }

    /// Number of scheduling turns opened.
    pub fn turn_count(&self) -> u64 {
        self.inner.turns.load(Ordering::Relaxed)
    }
}

/// A segment's handle onto whichever scheduler it is currently attached to.
///
/// Segments are created before they join a composite and may leave it
/// again, so the scheduler is swapped in and out. Requests made while
/// detached are dropped: the segment stays dirty and the composite that
/// next attaches it schedules a pass.
#[derive(Clone, Default)]
pub struct UpdateRequester {
    scheduler: Arc<RwLock<Option<UpdateScheduler>>>,
}

impl std::fmt::Debug for UpdateRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateRequester")
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl UpdateRequester {
    /// Create a detached requester.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route future requests to `scheduler`.
    pub fn attach(&self, scheduler: UpdateScheduler) {
        *self.scheduler.write() = Some(scheduler);
    }

    /// Stop routing requests.
    pub fn detach(&self) {
        *self.scheduler.write() = None;
    }

    /// Returns `true` if attached to a scheduler.
    pub fn is_attached(&self) -> bool {
        self.scheduler.read().is_some()
    }

    /// Request an update pass from the attached scheduler.
    ///
    /// Returns `false` when detached or when a pass was already pending.
    pub fn request(&self) -> bool {
        let scheduler = self.scheduler.read().clone();
        match scheduler {
            Some(scheduler) => scheduler.schedule(),
            None => {
                crate::reconcile_trace!("update requested while detached");
                false
            }
        }
    }
}

static_assertions::assert_impl_all!(UpdateScheduler: Send, Sync);
static_assertions::assert_impl_all!(UpdateRequester: Send, Sync);
