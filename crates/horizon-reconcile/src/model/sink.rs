//! The widget-facing side of the reconciler.
//!
//! A [`ListSink`] is whatever displays the merged list: a scrolling list
//! widget, a test double, a logger. It receives primitive edits in a flat
//! global index space, bracketed by `begin_updates`/`end_updates`.
//!
//! Within one batch, delete indices (and the `from` half of moves) refer to
//! the layout before the batch; insert indices (and the `to` half of moves)
//! refer to the layout after it.

use std::collections::BTreeSet;

use super::edit::{EditCounts, IndexPath};

/// Receiver of batched structural edits.
pub trait ListSink {
    /// Opens a batch. Edits until `end_updates` are applied atomically.
    fn begin_updates(&mut self) {}

    /// Inserts sections at these post-update indices.
    fn insert_sections(&mut self, sections: &BTreeSet<usize>);

    /// Deletes sections at these pre-update indices.
    fn delete_sections(&mut self, sections: &BTreeSet<usize>);

    /// Moves a section from a pre-update index to a post-update index.
    fn move_section(&mut self, from: usize, to: usize);

    /// Inserts items at these post-update paths.
    fn insert_items(&mut self, paths: &[IndexPath]);

    /// Deletes items at these pre-update paths.
    fn delete_items(&mut self, paths: &[IndexPath]);

    /// Moves an item from a pre-update path to a post-update path.
    fn move_item(&mut self, from: IndexPath, to: IndexPath);

    /// Closes the batch.
    fn end_updates(&mut self) {}
}

/// One call received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Begin,
    InsertSections(Vec<usize>),
    DeleteSections(Vec<usize>),
    MoveSection { from: usize, to: usize },
    InsertItems(Vec<IndexPath>),
    DeleteItems(Vec<IndexPath>),
    MoveItem { from: IndexPath, to: IndexPath },
    End,
}

/// A sink that records every call, for tests and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    calls: Vec<SinkCall>,
    batches: usize,
}

impl RecordingSink {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls, `Begin`/`End` markers included.
    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    /// Calls excluding the batch markers.
    pub fn edit_calls(&self) -> Vec<SinkCall> {
        self.calls
            .iter()
            .filter(|call| !matches!(call, SinkCall::Begin | SinkCall::End))
            .cloned()
            .collect()
    }

    /// Number of completed batches.
    pub fn batch_count(&self) -> usize {
        self.batches
    }

    /// Tallies recorded edits by kind.
    pub fn counts(&self) -> EditCounts {
        let mut counts = EditCounts::default();
        for call in &self.calls {
            match call {
                SinkCall::InsertSections(s) => counts.section_inserts += s.len(),
                SinkCall::DeleteSections(s) => counts.section_deletes += s.len(),
                SinkCall::MoveSection { .. } => counts.section_moves += 1,
                SinkCall::InsertItems(p) => counts.item_inserts += p.len(),
                SinkCall::DeleteItems(p) => counts.item_deletes += p.len(),
                SinkCall::MoveItem { .. } => counts.item_moves += 1,
                SinkCall::Begin | SinkCall::End => {}
            }
        }
        counts
    }

    /// Forgets everything recorded so far.
    pub fn clear(&mut self) {
        self.calls.clear();
        self.batches = 0;
    }
}

impl ListSink for RecordingSink {
    fn begin_updates(&mut self) {
        self.calls.push(SinkCall::Begin);
    }

    fn insert_sections(&mut self, sections: &BTreeSet<usize>) {
        self.calls
            .push(SinkCall::InsertSections(sections.iter().copied().collect()));
    }

    fn delete_sections(&mut self, sections: &BTreeSet<usize>) {
        self.calls
            .push(SinkCall::DeleteSections(sections.iter().copied().collect()));
    }

    fn move_section(&mut self, from: usize, to: usize) {
        self.calls.push(SinkCall::MoveSection { from, to });
    }

    fn insert_items(&mut self, paths: &[IndexPath]) {
        self.calls.push(SinkCall::InsertItems(paths.to_vec()));
    }

    fn delete_items(&mut self, paths: &[IndexPath]) {
        self.calls.push(SinkCall::DeleteItems(paths.to_vec()));
    }

    fn move_item(&mut self, from: IndexPath, to: IndexPath) {
        self.calls.push(SinkCall::MoveItem { from, to });
    }

    fn end_updates(&mut self) {
        self.calls.push(SinkCall::End);
        self.batches += 1;
    }
}
