//! The composite reconciler.
//!
//! A [`Composite`] owns an ordered list of segments and presents their
//! sections as one flat list. Structural changes to the segment list and
//! changes inside segments are only recorded when they happen; the widget
//! sees them in one batch when the owner drains pending updates with
//! [`Composite::process_updates`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_reconcile::model::{
//!     Composite, FilterSegment, FnFactory, RecordingSink, SinkCall,
//! };
//!
//! let favorites = Arc::new(FilterSegment::new(FnFactory::new(|s: &String| s.clone())));
//! favorites.push(1, "Lido Deck".to_string()).unwrap();
//!
//! let mut composite = Composite::new();
//! composite.append(favorites.clone()).unwrap();
//!
//! let mut sink = RecordingSink::new();
//! let report = composite.process_updates(Some(&mut sink));
//! assert_eq!(report.passes, 1);
//! assert_eq!(sink.edit_calls(), vec![SinkCall::InsertSections(vec![0])]);
//! assert_eq!(composite.section_count(), 1);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use horizon_reconcile_core::logging::{report_inconsistency, span_names, targets};
use horizon_reconcile_core::{
    PerfSpan, ReconcileConfig, ReconcileError, Result, Signal, ThreadAffinity, UpdateScheduler,
};

use super::edit::{EditCounts, IndexPath, Offsets, Transaction};
use super::item::ItemSize;
use super::segment::{Segment, SegmentId};
use super::sink::ListSink;

/// What one update pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassSummary {
    /// Sequence number of the pass, starting at 1.
    pub pass: u64,
    /// Edits computed in the pass.
    pub edits: EditCounts,
    /// Global section count before the pass.
    pub sections_before: usize,
    /// Global section count after the pass.
    pub sections_after: usize,
    /// Whether the edits reached a sink.
    pub delivered: bool,
}

/// What one drain did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Passes run.
    pub passes: usize,
    /// Edits computed across all passes.
    pub edits: EditCounts,
    /// The pass bound was reached with a request still pending.
    pub exhausted: bool,
}

impl DrainReport {
    fn add(&mut self, summary: &PassSummary) {
        self.passes += 1;
        let e = &mut self.edits;
        e.section_inserts += summary.edits.section_inserts;
        e.section_deletes += summary.edits.section_deletes;
        e.section_moves += summary.edits.section_moves;
        e.item_inserts += summary.edits.item_inserts;
        e.item_deletes += summary.edits.item_deletes;
        e.item_moves += summary.edits.item_moves;
    }
}

/// Signals emitted by a composite.
pub struct CompositeSignals {
    /// Emitted after every pass that changed the widget or a segment model.
    pub update_committed: Signal<PassSummary>,
}

impl Default for CompositeSignals {
    fn default() -> Self {
        Self {
            update_committed: Signal::new(),
        }
    }
}

/// A segment as of the last committed pass.
struct CommittedSegment<V> {
    id: SegmentId,
    segment: Arc<dyn Segment<V>>,
    /// Visible sections the widget believes this segment has.
    sections: usize,
    /// Global index of the segment's first section.
    offset: usize,
}

/// Merges segments into one sectioned list and drives coalesced updates.
pub struct Composite<V: 'static> {
    current: Vec<Arc<dyn Segment<V>>>,
    committed: Vec<CommittedSegment<V>>,
    scheduler: UpdateScheduler,
    config: ReconcileConfig,
    affinity: ThreadAffinity,
    signals: CompositeSignals,
    passes: u64,
}

impl<V: 'static> Default for Composite<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: 'static> Composite<V> {
    /// Creates an empty composite with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ReconcileConfig::default())
    }

    /// Creates an empty composite.
    pub fn with_config(config: ReconcileConfig) -> Self {
        Self {
            current: Vec::new(),
            committed: Vec::new(),
            scheduler: UpdateScheduler::new(),
            config,
            affinity: ThreadAffinity::current(),
            signals: CompositeSignals::default(),
            passes: 0,
        }
    }

    /// The scheduler segments report to. Install a waker on it to learn when
    /// a drain is needed.
    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }

    /// The configuration.
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Signals for this composite.
    pub fn signals(&self) -> &CompositeSignals {
        &self.signals
    }

    // =========================================================================
    // Segment list
    // =========================================================================

    /// Appends a segment. Takes effect on the widget at the next pass.
    pub fn append(&mut self, segment: Arc<dyn Segment<V>>) -> Result<()> {
        let index = self.current.len();
        self.insert(index, segment)
    }

    /// Inserts a segment at `index` in the current list.
    ///
    /// Re-inserting a segment removed since the last pass at a different
    /// relative position crosses the committed order. The segment then
    /// leaves the widget in one pass and comes back in the next.
    pub fn insert(&mut self, index: usize, segment: Arc<dyn Segment<V>>) -> Result<()> {
        self.affinity.debug_assert_same_thread();
        let id = segment.id();
        if self.contains(id) {
            return Err(ReconcileError::DuplicateSegment(id.as_u64()));
        }
        if index > self.current.len() {
            return Err(ReconcileError::IndexOutOfRange {
                index,
                len: self.current.len(),
            });
        }
        tracing::debug!(target: "horizon_reconcile::composite", segment = %id, index, "segment inserted");
        segment.attach(self.scheduler.clone());
        self.current.insert(index, segment);
        self.schedule_update();
        Ok(())
    }

    /// Removes a segment from the current list and detaches it.
    ///
    /// Its sections disappear from the widget at the next pass.
    pub fn remove(&mut self, id: SegmentId) -> Result<Arc<dyn Segment<V>>> {
        self.affinity.debug_assert_same_thread();
        let index = self
            .current
            .iter()
            .position(|segment| segment.id() == id)
            .ok_or(ReconcileError::UnknownSegment(id.as_u64()))?;
        let segment = self.current.remove(index);
        segment.detach();
        tracing::debug!(target: "horizon_reconcile::composite", segment = %id, "segment removed");
        self.schedule_update();
        Ok(segment)
    }

    /// Returns `true` if the current list holds `id`.
    pub fn contains(&self, id: SegmentId) -> bool {
        self.current.iter().any(|segment| segment.id() == id)
    }

    /// IDs of the current segment list, in order.
    pub fn segment_ids(&self) -> Vec<SegmentId> {
        self.current.iter().map(|segment| segment.id()).collect()
    }

    /// Looks up a segment in the current list.
    pub fn segment(&self, id: SegmentId) -> Option<Arc<dyn Segment<V>>> {
        self.current.iter().find(|segment| segment.id() == id).cloned()
    }

    /// Number of segments in the current list.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Returns `true` if the current list is empty.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    // =========================================================================
    // Updates
    // =========================================================================

    /// Requests an update pass. Any number of calls before the next drain
    /// produce one pass.
    pub fn schedule_update(&self) {
        self.scheduler.schedule();
    }

    /// Returns `true` if a pass has been requested and not yet run.
    pub fn has_pending_updates(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Runs update passes until no request is pending.
    ///
    /// Requests raised while a pass runs, by the sink, a signal handler or
    /// another thread, cause exactly one more pass. Without a sink every
    /// segment still diffs and applies its model; the edits are discarded.
    pub fn process_updates(&mut self, mut sink: Option<&mut dyn ListSink>) -> DrainReport {
        self.affinity.debug_assert_same_thread();
        let mut report = DrainReport::default();
        while self.scheduler.is_pending() {
            if report.passes >= self.config.max_passes_per_drain {
                tracing::warn!(
                    target: "horizon_reconcile::composite",
                    passes = report.passes,
                    "update requests still pending after pass limit"
                );
                report.exhausted = true;
                break;
            }
            self.scheduler.take_pending();
            let summary = self.run_pass(sink.as_deref_mut());
            report.add(&summary);
        }
        report
    }

    fn run_pass<'s>(&mut self, sink: Option<&mut (dyn ListSink + 's)>) -> PassSummary {
        let _perf = PerfSpan::new(span_names::UPDATE_PASS);
        self.passes += 1;
        let strict = self.config.strict_consistency;

        for segment in &self.current {
            segment.sync();
        }

        let sections_before: usize = self.committed.iter().map(|c| c.sections).sum();
        let cur_ids: HashSet<SegmentId> = self.current.iter().map(|s| s.id()).collect();
        let prev_ids: HashSet<SegmentId> = self.committed.iter().map(|c| c.id).collect();
        let mut readded: HashSet<SegmentId> = HashSet::new();

        let mut txn = Transaction::new();
        let mut touched: Vec<Arc<dyn Segment<V>>> = Vec::new();
        let mut delete_offset = 0;
        let mut insert_offset = 0;
        let (mut i, mut j) = (0, 0);

        while i < self.committed.len() || j < self.current.len() {
            let prev = self.committed.get(i);
            let cur = self.current.get(j);

            // Left-only: the segment is gone, or crossed with another one.
            let remove_left = match (prev, cur) {
                (Some(prev), _) if !cur_ids.contains(&prev.id) => true,
                (Some(_), None) => true,
                (Some(prev), Some(cur)) => {
                    let cur_added = !prev_ids.contains(&cur.id()) || readded.contains(&cur.id());
                    if cur_added || prev.id == cur.id() {
                        false
                    } else {
                        tracing::debug!(
                            target: "horizon_reconcile::composite",
                            segment = %prev.id,
                            "segment order crossed, re-adding next pass"
                        );
                        readded.insert(prev.id);
                        true
                    }
                }
                (None, _) => false,
            };
            if let (true, Some(prev)) = (remove_left, prev) {
                txn.delete_section_range(delete_offset..delete_offset + prev.sections);
                delete_offset += prev.sections;
                i += 1;
                continue;
            }

            let Some(cur) = cur else { break };
            let matched = prev.is_some_and(|prev| prev.id == cur.id()) && !readded.contains(&cur.id());
            let offsets = Offsets::new(delete_offset, insert_offset);

            if let (true, Some(prev)) = (matched, prev) {
                if cur.is_dirty() {
                    let span = cur.diff(offsets, Some(&mut txn));
                    if span.old != prev.sections {
                        report_inconsistency(
                            strict,
                            targets::COMPOSITE,
                            format_args!(
                                "segment {} reported {} sections, widget has {}",
                                prev.id, span.old, prev.sections
                            ),
                        );
                    }
                    touched.push(cur.clone());
                    insert_offset += span.new;
                } else {
                    insert_offset += cur.count();
                }
                delete_offset += prev.sections;
                i += 1;
                j += 1;
            } else if readded.contains(&cur.id()) {
                // Its sections were deleted above; showing it again in the
                // same batch would insert the identities just deleted.
                j += 1;
            } else {
                // Right-only: diff for bookkeeping, show the whole new span.
                let span = cur.diff(offsets, None);
                txn.insert_section_range(insert_offset..insert_offset + span.new);
                touched.push(cur.clone());
                insert_offset += span.new;
                j += 1;
            }
        }

        let delivered = sink.is_some();
        for segment in &touched {
            segment.apply();
        }
        if let Some(sink) = sink {
            if !txn.is_empty() {
                if self.config.log_edits {
                    for edit in txn.edits() {
                        tracing::trace!(target: "horizon_reconcile::transaction", ?edit, "edit");
                    }
                }
                sink.begin_updates();
                txn.replay(&mut *sink);
                sink.end_updates();
            }
        }

        self.commit(&readded);
        if !readded.is_empty() {
            self.schedule_update();
        }

        let summary = PassSummary {
            pass: self.passes,
            edits: txn.counts(),
            sections_before,
            sections_after: insert_offset,
            delivered,
        };
        tracing::debug!(
            target: "horizon_reconcile::composite",
            pass = summary.pass,
            edits = summary.edits.total(),
            sections_before,
            sections_after = insert_offset,
            delivered,
            "update pass committed"
        );
        if !txn.is_empty() || !touched.is_empty() {
            self.signals.update_committed.emit(summary);
        }
        summary
    }

    /// Makes the current list, less the `deferred` segments, the committed
    /// one and recomputes offsets.
    fn commit(&mut self, deferred: &HashSet<SegmentId>) {
        let mut offset = 0;
        self.committed = self
            .current
            .iter()
            .filter(|segment| !deferred.contains(&segment.id()))
            .map(|segment| {
                let sections = segment.count();
                let committed = CommittedSegment {
                    id: segment.id(),
                    segment: segment.clone(),
                    sections,
                    offset,
                };
                offset += sections;
                committed
            })
            .collect();
    }

    // =========================================================================
    // Committed layout
    // =========================================================================

    /// Number of sections the widget shows.
    pub fn section_count(&self) -> usize {
        self.committed.iter().map(|c| c.sections).sum()
    }

    /// Number of items in a global section, or 0 if there is no such section.
    pub fn item_count(&self, section: usize) -> usize {
        self.resolve(section)
            .map_or(0, |(committed, local)| committed.segment.item_count(local))
    }

    /// The segment owning a global section and the section's local index.
    pub fn locate(&self, section: usize) -> Option<(SegmentId, usize)> {
        self.resolve(section)
            .map(|(committed, local)| (committed.id, local))
    }

    /// Global index of a segment's first section, as of the last pass.
    pub fn segment_offset(&self, id: SegmentId) -> Option<usize> {
        self.committed
            .iter()
            .find(|committed| committed.id == id)
            .map(|committed| committed.offset)
    }

    /// The view for a global path, created on first request.
    pub fn view(&self, path: IndexPath) -> Option<V> {
        let (committed, local) = self.resolve(path.section)?;
        committed.segment.view(IndexPath::new(local, path.row))
    }

    /// The cached size of the item at a global path.
    pub fn cached_size(&self, path: IndexPath) -> Option<ItemSize> {
        let (committed, local) = self.resolve(path.section)?;
        committed.segment.cached_size(IndexPath::new(local, path.row))
    }

    /// Stores a measured size for the item at a global path.
    pub fn record_size(&self, path: IndexPath, size: ItemSize) -> bool {
        match self.resolve(path.section) {
            Some((committed, local)) => committed
                .segment
                .record_size(IndexPath::new(local, path.row), size),
            None => false,
        }
    }

    fn resolve(&self, section: usize) -> Option<(&CommittedSegment<V>, usize)> {
        self.committed
            .iter()
            .find(|c| section >= c.offset && section < c.offset + c.sections)
            .map(|c| (c, section - c.offset))
    }
}

impl<V: 'static> std::fmt::Debug for Composite<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composite")
            .field("segments", &self.segment_ids())
            .field("sections", &self.section_count())
            .field("pending", &self.has_pending_updates())
            .field("passes", &self.passes)
            .finish()
    }
}

static_assertions::assert_impl_all!(Composite<String>: Send);
