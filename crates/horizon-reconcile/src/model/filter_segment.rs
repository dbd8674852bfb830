//! Filter-backed segment.
//!
//! A [`FilterSegment`] holds its whole backing array in memory and presents
//! a single implicit section containing the items that are currently
//! visible. Items never reorder; only visibility changes, so the diff is a
//! pure presence diff by identity.
//!
//! An item is visible when its own flag is set and the segment's filter, if
//! any, accepts its payload.
//!
//! # Example
//!
//! ```
//! use horizon_reconcile::model::{FilterSegment, FnFactory};
//!
//! let deck = FilterSegment::new(FnFactory::new(|name: &&str| name.to_string()));
//! deck.push("lido", "Lido Deck").unwrap();
//! deck.push("spa", "Spa Deck").unwrap();
//! deck.set_filter(|name: &&str| name.starts_with('L'));
//! assert_eq!(deck.visible_keys(), vec!["lido"]);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use horizon_reconcile_core::logging::{report_inconsistency, span_names, targets};
use horizon_reconcile_core::{PerfSpan, ReconcileConfig, ReconcileError, Result, UpdateScheduler};
use parking_lot::Mutex;

use super::diff::parallel_walk;
use super::edit::{Edit, IndexPath, Offsets, SectionSpan, Transaction};
use super::item::{Item, ItemFactory, ItemSize};
use super::segment::{Segment, SegmentBase, SegmentId};

/// Type alias for a filter predicate.
///
/// Returns `true` if the item should be shown.
pub type FilterFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Visible set staged by the last diff.
struct FilterStaged<K> {
    visible: Vec<K>,
    shown: bool,
}

struct FilterState<K, T, F: ItemFactory<T>> {
    /// The full backing array.
    items: Vec<Item<K, T, F::View>>,
    /// Backing position of every item, by identity.
    positions: HashMap<K, usize>,
    /// Identities the widget currently shows, in order.
    presented: Vec<K>,
    /// Whether the implicit section is currently shown.
    shown: bool,
    filter: Option<FilterFn<T>>,
    force_visible: bool,
    /// Removed items still presented until the next apply.
    departed: Vec<Item<K, T, F::View>>,
    staged: Option<FilterStaged<K>>,
    factory: F,
}

impl<K: Clone + Eq + Hash, T, F: ItemFactory<T>> FilterState<K, T, F> {
    fn passes(&self, item: &Item<K, T, F::View>) -> bool {
        item.is_visible()
            && self
                .filter
                .as_ref()
                .is_none_or(|filter| filter(item.payload()))
    }

    fn position(&self, key: &K) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Rewrites positions for every item at or after `start`.
    fn reindex_from(&mut self, start: usize) {
        for (index, item) in self.items.iter().enumerate().skip(start) {
            self.positions.insert(item.key().clone(), index);
        }
    }

    fn presented_item_mut(&mut self, key: &K) -> Option<&mut Item<K, T, F::View>> {
        match self.position(key) {
            Some(index) => self.items.get_mut(index),
            None => self.departed.iter_mut().find(|item| item.key() == key),
        }
    }
}

/// A single-section segment over an always-resident array, diffed by
/// visibility.
pub struct FilterSegment<K, T, F: ItemFactory<T>> {
    base: SegmentBase,
    state: Mutex<FilterState<K, T, F>>,
}

impl<K, T, F> FilterSegment<K, T, F>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
    T: Clone + Send + 'static,
    F: ItemFactory<T>,
{
    /// Creates an empty segment with the default configuration.
    pub fn new(factory: F) -> Self {
        Self::with_config(factory, ReconcileConfig::default())
    }

    /// Creates an empty segment.
    pub fn with_config(factory: F, config: ReconcileConfig) -> Self {
        Self {
            base: SegmentBase::new(SegmentId::next(), config),
            state: Mutex::new(FilterState {
                items: Vec::new(),
                positions: HashMap::new(),
                presented: Vec::new(),
                shown: false,
                filter: None,
                force_visible: false,
                departed: Vec::new(),
                staged: None,
                factory,
            }),
        }
    }

    /// Sets a filter predicate at construction.
    pub fn with_filter<P>(self, filter: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.state.lock().filter = Some(Arc::new(filter));
        self.base.mark_dirty_quiet();
        self
    }

    /// Appends a visible item.
    pub fn push(&self, key: K, payload: T) -> Result<()> {
        let len = self.len();
        self.insert(len, key, payload)
    }

    /// Inserts a visible item at `index` in the backing array.
    pub fn insert(&self, index: usize, key: K, payload: T) -> Result<()> {
        self.base.affinity().debug_assert_same_thread();
        {
            let mut state = self.state.lock();
            let len = state.items.len();
            if index > len {
                return Err(ReconcileError::IndexOutOfRange { index, len });
            }
            if state.position(&key).is_some() {
                return Err(ReconcileError::DuplicateItem(format!("{key:?}")));
            }
            state.items.insert(index, Item::new(key, payload));
            state.reindex_from(index);
        }
        self.base.mark_dirty();
        Ok(())
    }

    /// Removes an item from the backing array, returning its payload.
    pub fn remove(&self, key: &K) -> Option<T> {
        self.base.affinity().debug_assert_same_thread();
        let payload = {
            let mut state = self.state.lock();
            let index = state.position(key)?;
            let item = state.items.remove(index);
            state.positions.remove(key);
            state.reindex_from(index);
            let payload = item.payload().clone();
            state.departed.push(item);
            payload
        };
        self.base.mark_dirty();
        Some(payload)
    }

    /// Sets one item's visibility flag. Returns `false` for an unknown key.
    pub fn set_visible(&self, key: &K, visible: bool) -> bool {
        self.base.affinity().debug_assert_same_thread();
        let changed = {
            let mut state = self.state.lock();
            let Some(index) = state.position(key) else {
                return false;
            };
            let item = &mut state.items[index];
            let changed = item.is_visible() != visible;
            item.set_visible(visible);
            changed
        };
        if changed {
            self.base.mark_dirty();
        }
        true
    }

    /// Replaces the filter predicate and requests an update.
    pub fn set_filter<P>(&self, filter: P)
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.base.affinity().debug_assert_same_thread();
        self.state.lock().filter = Some(Arc::new(filter));
        self.base.mark_dirty();
    }

    /// Clears the filter, leaving only the per-item flags.
    pub fn clear_filter(&self) {
        self.base.affinity().debug_assert_same_thread();
        self.state.lock().filter = None;
        self.base.mark_dirty();
    }

    /// Keeps the section shown even with no visible items.
    pub fn set_force_visible(&self, force_visible: bool) {
        self.base.affinity().debug_assert_same_thread();
        let changed = {
            let mut state = self.state.lock();
            let changed = state.force_visible != force_visible;
            state.force_visible = force_visible;
            changed
        };
        if changed {
            self.base.mark_dirty();
        }
    }

    /// Number of backing items, visible or not.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Returns `true` if the backing array is empty.
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Identities that pass visibility right now, in backing order.
    ///
    /// This is the set the next diff will present.
    pub fn visible_keys(&self) -> Vec<K> {
        let state = self.state.lock();
        state
            .items
            .iter()
            .filter(|item| state.passes(item))
            .map(|item| item.key().clone())
            .collect()
    }

    /// Identities the widget currently shows.
    pub fn presented_keys(&self) -> Vec<K> {
        self.state.lock().presented.clone()
    }
}

impl<K, T, F> Segment<F::View> for FilterSegment<K, T, F>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
    T: Clone + Send + 'static,
    F: ItemFactory<T>,
{
    fn id(&self) -> SegmentId {
        self.base.id()
    }

    fn attach(&self, scheduler: UpdateScheduler) {
        self.base.attach(scheduler);
    }

    fn detach(&self) {
        self.base.detach();
    }

    fn is_dirty(&self) -> bool {
        self.base.is_dirty()
    }

    fn count(&self) -> usize {
        usize::from(self.state.lock().shown)
    }

    fn item_count(&self, section: usize) -> usize {
        let state = self.state.lock();
        if section == 0 && state.shown {
            state.presented.len()
        } else {
            0
        }
    }

    fn diff(&self, offsets: Offsets, edits: Option<&mut Transaction>) -> SectionSpan {
        let _perf = PerfSpan::new(span_names::FILTER_DIFF);
        self.base.affinity().debug_assert_same_thread();
        self.base.take_dirty();

        let mut state = self.state.lock();
        let visible: Vec<K> = state
            .items
            .iter()
            .filter(|item| state.passes(item))
            .map(|item| item.key().clone())
            .collect();
        let shown = !visible.is_empty() || state.force_visible;
        let span = SectionSpan {
            old: usize::from(state.shown),
            new: usize::from(shown),
        };

        let mut local = Transaction::new();
        match (state.shown, shown) {
            (false, false) => {}
            (false, true) => local.push(Edit::InsertSection(offsets.insert)),
            (true, false) => local.push(Edit::DeleteSection(offsets.delete)),
            (true, true) => {
                let before: HashSet<&K> = state.presented.iter().collect();
                let after: HashSet<&K> = visible.iter().collect();
                for (row, key) in state.presented.iter().enumerate() {
                    if !after.contains(key) {
                        local.push(Edit::DeleteItem(IndexPath::new(offsets.delete, row)));
                    }
                }
                for (row, key) in visible.iter().enumerate() {
                    if !before.contains(key) {
                        local.push(Edit::InsertItem(IndexPath::new(offsets.insert, row)));
                    }
                }

                // Only a remove followed by a re-add can reorder survivors.
                let kept_old: Vec<(usize, &K)> = state
                    .presented
                    .iter()
                    .enumerate()
                    .filter(|(_, key)| after.contains(key))
                    .collect();
                let kept_new: Vec<(usize, &K)> = visible
                    .iter()
                    .enumerate()
                    .filter(|(_, key)| before.contains(key))
                    .collect();
                let old_keys: Vec<&K> = kept_old.iter().map(|(_, key)| *key).collect();
                let new_keys: Vec<&K> = kept_new.iter().map(|(_, key)| *key).collect();
                let old_rows: HashMap<&K, usize> =
                    kept_old.iter().map(|&(row, key)| (key, row)).collect();
                for pos in parallel_walk(&old_keys, &new_keys) {
                    let (to, key) = kept_new[pos];
                    if let Some(&from) = old_rows.get(key) {
                        local.push(Edit::MoveItem {
                            from: IndexPath::new(offsets.delete, from),
                            to: IndexPath::new(offsets.insert, to),
                        });
                    }
                }
            }
        }

        tracing::debug!(
            target: "horizon_reconcile::filter_segment",
            segment = %self.base.id(),
            visible_before = state.presented.len(),
            visible_after = visible.len(),
            edits = local.len(),
            "filter diff"
        );

        if let Some(edits) = edits {
            for edit in local.edits() {
                edits.push(*edit);
            }
        }
        state.staged = Some(FilterStaged { visible, shown });
        span
    }

    fn apply(&self) {
        self.base.affinity().debug_assert_same_thread();
        let mut guard = self.state.lock();
        let Some(staged) = guard.staged.take() else {
            return;
        };
        let state = &mut *guard;

        // Release views of items leaving the visible set.
        let staying: HashSet<&K> = staged.visible.iter().collect();
        for key in &state.presented {
            if staying.contains(key) {
                continue;
            }
            if let Some(&index) = state.positions.get(key) {
                state.items[index].unbind(&mut state.factory);
            }
        }
        for mut item in state.departed.drain(..) {
            item.unbind(&mut state.factory);
        }

        tracing::trace!(
            target: "horizon_reconcile::filter_segment",
            segment = %self.base.id(),
            presented = staged.visible.len(),
            "filter applied"
        );
        state.presented = staged.visible;
        state.shown = staged.shown;
    }

    fn view(&self, path: IndexPath) -> Option<F::View> {
        let mut guard = self.state.lock();
        if path.section != 0 || !guard.shown {
            return None;
        }
        let key = guard.presented.get(path.row)?.clone();
        let state = &mut *guard;
        let item = match state.position(&key) {
            Some(index) => &mut state.items[index],
            None => state.departed.iter_mut().find(|item| item.key() == &key)?,
        };
        Some(item.bind(&mut state.factory))
    }

    fn cached_size(&self, path: IndexPath) -> Option<ItemSize> {
        let mut state = self.state.lock();
        if path.section != 0 || !state.shown {
            return None;
        }
        let key = state.presented.get(path.row)?.clone();
        state.presented_item_mut(&key)?.cached_size()
    }

    fn record_size(&self, path: IndexPath, size: ItemSize) -> bool {
        let mut state = self.state.lock();
        if path.section != 0 || !state.shown {
            return false;
        }
        let Some(key) = state.presented.get(path.row).cloned() else {
            return false;
        };
        match state.presented_item_mut(&key) {
            Some(item) => {
                item.set_cached_size(Some(size));
                true
            }
            None => {
                report_inconsistency(
                    self.base.config().strict_consistency,
                    targets::FILTER_SEGMENT,
                    format_args!("presented item {key:?} missing from backing array"),
                );
                false
            }
        }
    }
}

impl<K, T, F: ItemFactory<T>> Drop for FilterSegment<K, T, F> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for item in state.items.iter_mut().chain(state.departed.iter_mut()) {
            item.unbind(&mut state.factory);
        }
    }
}

impl<K, T, F: ItemFactory<T>> std::fmt::Debug for FilterSegment<K, T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FilterSegment")
            .field("id", &self.base.id())
            .field("dirty", &self.base.is_dirty())
            .field("items", &state.items.len())
            .field("presented", &state.presented.len())
            .field("shown", &state.shown)
            .finish()
    }
}
