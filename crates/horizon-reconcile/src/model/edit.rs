//! Structural edits and batch transactions.
//!
//! Segments describe how their presented layout changes as a list of
//! [`Edit`]s already translated into the composite's global index space.
//! A [`Transaction`] gathers the edits of one update pass and replays them
//! into a [`ListSink`] in the order the batch-update contract requires:
//! every delete-class index is resolved against the layout before the
//! transaction, every insert-class index against the layout after it.

use std::collections::BTreeSet;
use std::ops::Range;

use super::sink::ListSink;

/// Position of an item in a sectioned list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct IndexPath {
    /// Section index.
    pub section: usize,
    /// Row within the section.
    pub row: usize,
}

impl IndexPath {
    /// Creates a new index path.
    #[inline]
    pub const fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }

    /// Returns this path with `offset` added to the section.
    #[inline]
    pub const fn offset_section(self, offset: usize) -> Self {
        Self {
            section: self.section + offset,
            row: self.row,
        }
    }
}

impl std::fmt::Display for IndexPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.section, self.row)
    }
}

/// One structural edit.
///
/// `from` halves and deletes address the pre-update layout; `to` halves and
/// inserts address the post-update layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edit {
    /// A section appears at this post-update index.
    InsertSection(usize),
    /// The section at this pre-update index disappears with its items.
    DeleteSection(usize),
    /// A section keeps its items and changes position.
    MoveSection { from: usize, to: usize },
    /// An item appears at this post-update path.
    InsertItem(IndexPath),
    /// The item at this pre-update path disappears.
    DeleteItem(IndexPath),
    /// An item changes position, possibly across sections.
    MoveItem { from: IndexPath, to: IndexPath },
}

/// Offsets supplied by the composite to translate a segment's local section
/// indices into global ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offsets {
    /// Global index of the segment's first section before the update.
    pub delete: usize,
    /// Global index of the segment's first section after the update.
    pub insert: usize,
}

impl Offsets {
    /// Creates offsets.
    pub const fn new(delete: usize, insert: usize) -> Self {
        Self { delete, insert }
    }
}

/// A segment's visible-section count before and after one diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionSpan {
    /// Sections presented before the diff.
    pub old: usize,
    /// Sections presented after the diff is applied.
    pub new: usize,
}

impl SectionSpan {
    /// A span for a segment whose layout did not change.
    pub const fn unchanged(sections: usize) -> Self {
        Self {
            old: sections,
            new: sections,
        }
    }
}

/// Number of edits of each kind in a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditCounts {
    pub section_inserts: usize,
    pub section_deletes: usize,
    pub section_moves: usize,
    pub item_inserts: usize,
    pub item_deletes: usize,
    pub item_moves: usize,
}

impl EditCounts {
    /// Total number of edits.
    pub fn total(&self) -> usize {
        self.section_inserts
            + self.section_deletes
            + self.section_moves
            + self.item_inserts
            + self.item_deletes
            + self.item_moves
    }

    /// Returns `true` if there are no edits at all.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// The edits of one update pass, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    edits: Vec<Edit>,
}

impl Transaction {
    /// Creates an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one edit.
    pub fn push(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    /// Deletes every section in `range` (pre-update indices).
    pub fn delete_section_range(&mut self, range: Range<usize>) {
        self.edits.extend(range.map(Edit::DeleteSection));
    }

    /// Inserts every section in `range` (post-update indices).
    pub fn insert_section_range(&mut self, range: Range<usize>) {
        self.edits.extend(range.map(Edit::InsertSection));
    }

    /// The edits in the order they were emitted.
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Number of edits.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Returns `true` if the transaction holds no edits.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Tallies the edits by kind.
    pub fn counts(&self) -> EditCounts {
        let mut counts = EditCounts::default();
        for edit in &self.edits {
            match edit {
                Edit::InsertSection(_) => counts.section_inserts += 1,
                Edit::DeleteSection(_) => counts.section_deletes += 1,
                Edit::MoveSection { .. } => counts.section_moves += 1,
                Edit::InsertItem(_) => counts.item_inserts += 1,
                Edit::DeleteItem(_) => counts.item_deletes += 1,
                Edit::MoveItem { .. } => counts.item_moves += 1,
            }
        }
        counts
    }

    /// Replays the transaction into `sink` inside one batch.
    ///
    /// Order: section deletes, item deletes, section inserts, item inserts,
    /// then moves. A move call carries both halves at once, so it is issued
    /// after every plain delete and insert has been described.
    pub fn replay(&self, sink: &mut dyn ListSink) {
        let mut deleted_sections = BTreeSet::new();
        let mut inserted_sections = BTreeSet::new();
        let mut deleted_items = Vec::new();
        let mut inserted_items = Vec::new();
        let mut section_moves = Vec::new();
        let mut item_moves = Vec::new();

        for edit in &self.edits {
            match *edit {
                Edit::InsertSection(section) => {
                    inserted_sections.insert(section);
                }
                Edit::DeleteSection(section) => {
                    deleted_sections.insert(section);
                }
                Edit::MoveSection { from, to } => section_moves.push((from, to)),
                Edit::InsertItem(path) => inserted_items.push(path),
                Edit::DeleteItem(path) => deleted_items.push(path),
                Edit::MoveItem { from, to } => item_moves.push((from, to)),
            }
        }
        deleted_items.sort_unstable();
        inserted_items.sort_unstable();

        if !deleted_sections.is_empty() {
            sink.delete_sections(&deleted_sections);
        }
        if !deleted_items.is_empty() {
            sink.delete_items(&deleted_items);
        }
        if !inserted_sections.is_empty() {
            sink.insert_sections(&inserted_sections);
        }
        if !inserted_items.is_empty() {
            sink.insert_items(&inserted_items);
        }
        for (from, to) in section_moves {
            sink.move_section(from, to);
        }
        for (from, to) in item_moves {
            sink.move_item(from, to);
        }
    }
}
