//! Stable-identity differencing of sectioned layouts.
//!
//! The list-backed segment keeps a shadow of what the widget shows and
//! receives fresh query results. [`ListPlan::compute`] classifies every
//! section and item of the two layouts as kept, inserted, deleted or moved,
//! and [`ListPlan::emit`] writes the result as global [`Edit`]s.
//!
//! Moves are detected with a parallel walk over the entries common to both
//! sides. It is linear and finds moves only where the relative order of the
//! two sequences diverges; it is not a minimal edit script. Rotating the
//! first of `n` entries to the end reports `n - 1` moves, for example.

use std::collections::HashMap;
use std::hash::Hash;

use super::edit::{Edit, IndexPath, Offsets, Transaction};

/// One section of a layout: its key and its item identities in order.
pub type LayoutSection<'a, S, K> = (&'a S, Vec<&'a K>);

/// Walks `old` and `new` in parallel and returns the positions in `new` of
/// entries that must be reported as moves.
///
/// Both sequences must hold the same set of distinct entries. When the next
/// unconsumed pair mismatches, the entry on the new side is recorded as a
/// move and its old position is consumed. Matching pairs advance both
/// cursors without an edit.
pub fn parallel_walk<T: Eq + Hash>(old: &[T], new: &[T]) -> Vec<usize> {
    let old_positions: HashMap<&T, usize> =
        old.iter().enumerate().map(|(pos, entry)| (entry, pos)).collect();
    let mut consumed = vec![false; old.len()];
    let mut moves = Vec::new();

    let mut i = 0;
    for (j, entry) in new.iter().enumerate() {
        while i < old.len() && consumed[i] {
            i += 1;
        }
        if i < old.len() && old[i] == *entry {
            i += 1;
            continue;
        }
        moves.push(j);
        if let Some(&pos) = old_positions.get(entry) {
            consumed[pos] = true;
        }
    }
    moves
}

/// The classified difference between two sectioned layouts, in local
/// coordinates.
///
/// Deletes and move sources address the old layout, inserts and move
/// targets address the new one. Items inside deleted or inserted sections
/// are covered by the section edit and get no item edit of their own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPlan {
    pub section_deletes: Vec<usize>,
    pub section_inserts: Vec<usize>,
    pub section_moves: Vec<(usize, usize)>,
    pub item_deletes: Vec<IndexPath>,
    pub item_inserts: Vec<IndexPath>,
    pub item_moves: Vec<(IndexPath, IndexPath)>,
}

impl ListPlan {
    /// Diffs `old` against `new`.
    ///
    /// Section keys must be unique within each layout, and item identities
    /// unique across each layout.
    pub fn compute<S, K>(old: &[LayoutSection<'_, S, K>], new: &[LayoutSection<'_, S, K>]) -> Self
    where
        S: Eq + Hash,
        K: Eq + Hash,
    {
        let mut plan = Self::default();

        // Sections.
        let old_sections: HashMap<&S, usize> =
            old.iter().enumerate().map(|(idx, (key, _))| (*key, idx)).collect();
        let new_sections: HashMap<&S, usize> =
            new.iter().enumerate().map(|(idx, (key, _))| (*key, idx)).collect();

        plan.section_deletes = old
            .iter()
            .enumerate()
            .filter(|(_, (key, _))| !new_sections.contains_key(*key))
            .map(|(idx, _)| idx)
            .collect();
        plan.section_inserts = new
            .iter()
            .enumerate()
            .filter(|(_, (key, _))| !old_sections.contains_key(*key))
            .map(|(idx, _)| idx)
            .collect();

        let common_old: Vec<&S> = old
            .iter()
            .map(|(key, _)| *key)
            .filter(|key| new_sections.contains_key(key))
            .collect();
        let common_new: Vec<&S> = new
            .iter()
            .map(|(key, _)| *key)
            .filter(|key| old_sections.contains_key(key))
            .collect();
        plan.section_moves = parallel_walk(&common_old, &common_new)
            .into_iter()
            .map(|pos| {
                let key = common_new[pos];
                (old_sections[key], new_sections[key])
            })
            .collect();

        // Items of surviving sections only.
        let mut old_items: HashMap<&K, IndexPath> = HashMap::new();
        for (section, (key, items)) in old.iter().enumerate() {
            if !new_sections.contains_key(*key) {
                continue;
            }
            for (row, item) in items.iter().enumerate() {
                old_items.insert(*item, IndexPath::new(section, row));
            }
        }
        let mut new_items: HashMap<&K, IndexPath> = HashMap::new();
        for (section, (key, items)) in new.iter().enumerate() {
            if !old_sections.contains_key(*key) {
                continue;
            }
            for (row, item) in items.iter().enumerate() {
                new_items.insert(*item, IndexPath::new(section, row));
            }
        }

        for (item, path) in &old_items {
            if !new_items.contains_key(item) {
                plan.item_deletes.push(*path);
            }
        }
        plan.item_deletes.sort_unstable();

        // Walk new sections in new order so that section moves do not show
        // up as item moves. Items that changed section always move.
        let mut stay_old: Vec<&K> = Vec::new();
        let mut stay_new: Vec<&K> = Vec::new();
        for (section, (key, items)) in new.iter().enumerate() {
            let Some(&old_section) = old_sections.get(*key) else {
                continue;
            };
            for (row, item) in items.iter().enumerate() {
                match old_items.get(item) {
                    None => plan.item_inserts.push(IndexPath::new(section, row)),
                    Some(from) if from.section != old_section => {
                        plan.item_moves.push((*from, IndexPath::new(section, row)));
                    }
                    Some(_) => stay_new.push(*item),
                }
            }
            for item in &old[old_section].1 {
                if new_items
                    .get(item)
                    .is_some_and(|to| to.section == section)
                {
                    stay_old.push(*item);
                }
            }
        }
        for pos in parallel_walk(&stay_old, &stay_new) {
            let item = stay_new[pos];
            plan.item_moves.push((old_items[item], new_items[item]));
        }
        plan.item_moves.sort_unstable();

        plan
    }

    /// Returns `true` if the layouts were identical.
    pub fn is_empty(&self) -> bool {
        self.section_deletes.is_empty()
            && self.section_inserts.is_empty()
            && self.section_moves.is_empty()
            && self.item_deletes.is_empty()
            && self.item_inserts.is_empty()
            && self.item_moves.is_empty()
    }

    /// Writes the plan into `edits`, translated by `offsets`.
    ///
    /// Emission order: section deletes, section moves, item deletes, item
    /// moves, section inserts, item inserts.
    pub fn emit(&self, offsets: Offsets, edits: &mut Transaction) {
        for &section in &self.section_deletes {
            edits.push(Edit::DeleteSection(section + offsets.delete));
        }
        for &(from, to) in &self.section_moves {
            edits.push(Edit::MoveSection {
                from: from + offsets.delete,
                to: to + offsets.insert,
            });
        }
        for path in &self.item_deletes {
            edits.push(Edit::DeleteItem(path.offset_section(offsets.delete)));
        }
        for (from, to) in &self.item_moves {
            edits.push(Edit::MoveItem {
                from: from.offset_section(offsets.delete),
                to: to.offset_section(offsets.insert),
            });
        }
        for &section in &self.section_inserts {
            edits.push(Edit::InsertSection(section + offsets.insert));
        }
        for path in &self.item_inserts {
            edits.push(Edit::InsertItem(path.offset_section(offsets.insert)));
        }
    }
}
