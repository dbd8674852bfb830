//! The segment capability and shared segment plumbing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use horizon_reconcile_core::{ReconcileConfig, ThreadAffinity, UpdateRequester, UpdateScheduler};

use super::edit::{IndexPath, Offsets, SectionSpan, Transaction};
use super::item::ItemSize;

/// Global counter for generating unique segment IDs.
static NEXT_SEGMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Value-compared segment identity, assigned at construction.
///
/// The composite matches segments across passes by this ID, never by
/// reference identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(u64);

impl SegmentId {
    /// Allocates a fresh ID.
    pub fn next() -> Self {
        Self(NEXT_SEGMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a caller-chosen raw ID.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw u64 value of this ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A composable unit contributing zero or more sections to a composite.
///
/// All methods except [`id`](Self::id) and the update plumbing are called on
/// the composite's owner context. During a pass the composite calls, per
/// segment: [`sync`](Self::sync), then [`diff`](Self::diff) if the segment is
/// dirty (or newly added), then [`apply`](Self::apply) once the whole
/// transaction has been computed.
pub trait Segment<V>: Send + Sync {
    /// The segment's identity.
    fn id(&self) -> SegmentId;

    /// Routes future update requests to `scheduler`.
    fn attach(&self, scheduler: UpdateScheduler);

    /// Stops routing update requests.
    fn detach(&self);

    /// Drains changes marshaled from other contexts.
    fn sync(&self) {}

    /// Whether backing data changed since the last diff.
    fn is_dirty(&self) -> bool;

    /// Number of sections currently presented.
    fn count(&self) -> usize;

    /// Number of items in a presented section.
    fn item_count(&self, section: usize) -> usize;

    /// Computes the edits that take the presented layout to the current
    /// backing data and stages the new layout.
    ///
    /// Edits are written to `edits` in global coordinates using `offsets`;
    /// with `None` they are computed for bookkeeping only and discarded.
    fn diff(&self, offsets: Offsets, edits: Option<&mut Transaction>) -> SectionSpan;

    /// Materializes the layout staged by the last `diff`.
    fn apply(&self);

    /// The view for a presented item, created lazily.
    fn view(&self, path: IndexPath) -> Option<V>;

    /// The cached size of a presented item.
    fn cached_size(&self, path: IndexPath) -> Option<ItemSize>;

    /// Stores a measured size. Returns `false` if the path is not presented.
    fn record_size(&self, path: IndexPath, size: ItemSize) -> bool;
}

/// State shared by every segment implementation: identity, dirty flag,
/// update requester, configuration and owner-thread affinity.
#[derive(Debug)]
pub struct SegmentBase {
    id: SegmentId,
    dirty: AtomicBool,
    requester: UpdateRequester,
    config: ReconcileConfig,
    affinity: ThreadAffinity,
}

impl SegmentBase {
    /// Creates the base for a segment built on the current thread.
    pub fn new(id: SegmentId, config: ReconcileConfig) -> Self {
        Self {
            id,
            dirty: AtomicBool::new(false),
            requester: UpdateRequester::new(),
            config,
            affinity: ThreadAffinity::current(),
        }
    }

    /// The segment ID.
    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// The configuration.
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// The owner-thread affinity.
    pub fn affinity(&self) -> &ThreadAffinity {
        &self.affinity
    }

    /// A handle for requesting updates, shareable with other threads.
    pub fn requester(&self) -> &UpdateRequester {
        &self.requester
    }

    /// Attaches to a scheduler, requesting a pass if changes are waiting.
    pub fn attach(&self, scheduler: UpdateScheduler) {
        self.requester.attach(scheduler);
        if self.is_dirty() {
            self.requester.request();
        }
    }

    /// Detaches from the scheduler.
    pub fn detach(&self) {
        self.requester.detach();
    }

    /// Whether backing data changed since the last diff.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Marks the segment dirty and requests an update.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
        self.requester.request();
    }

    /// Marks the segment dirty without requesting an update.
    ///
    /// Used while a pass is already draining this segment.
    pub fn mark_dirty_quiet(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Clears the dirty flag, returning its previous value.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}
