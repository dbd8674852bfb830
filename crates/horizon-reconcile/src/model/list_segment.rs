//! List-backed segment.
//!
//! A [`ListSegment`] presents an externally refreshed, two-level query
//! result. Every snapshot replaces the previous one; the segment diffs the
//! sections and items it currently presents against the newest snapshot by
//! stable identity, and keeps a shadow model of what the widget shows in
//! lockstep with the emitted edits.
//!
//! # Example
//!
//! ```
//! use horizon_reconcile::model::{FnFactory, ListSegment, QueryItem, QuerySection};
//!
//! let segment = ListSegment::new(FnFactory::new(|title: &String| title.to_uppercase()));
//! segment.set_snapshot(vec![QuerySection::new(
//!     "mon",
//!     vec![QueryItem::new(1, "breakfast".to_string())],
//! )]);
//! assert!(segment.is_dirty_pending());
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use horizon_reconcile_core::logging::{report_inconsistency, span_names, targets};
use horizon_reconcile_core::{
    Mailbox, MailboxSender, PerfSpan, ReconcileConfig, UpdateScheduler, mailbox,
};
use parking_lot::Mutex;

use super::diff::{LayoutSection, ListPlan};
use super::edit::{IndexPath, Offsets, SectionSpan, Transaction};
use super::item::{Item, ItemFactory, ItemSize, Section};
use super::query::{QueryProvider, QuerySection, QuerySnapshot};
use super::segment::{Segment, SegmentBase, SegmentId};

/// The layout staged by the last diff, waiting for `apply`.
struct Staged<S, K, T> {
    plan: ListPlan,
    snapshot: Vec<QuerySection<S, K, T>>,
}

struct ListState<S, K, T, F: ItemFactory<T>> {
    /// What the widget currently shows.
    sections: Vec<Section<S, K, T, F::View>>,
    /// Newest normalized snapshot.
    latest: Vec<QuerySection<S, K, T>>,
    staged: Option<Staged<S, K, T>>,
    factory: F,
}

/// A segment over a sectioned query result, diffed by stable identity.
pub struct ListSegment<S, K, T, F: ItemFactory<T>> {
    base: SegmentBase,
    inbox: Mailbox<QuerySnapshot<S, K, T>>,
    sender: MailboxSender<QuerySnapshot<S, K, T>>,
    state: Mutex<ListState<S, K, T, F>>,
}

impl<S, K, T, F> ListSegment<S, K, T, F>
where
    S: Clone + Eq + Hash + Debug + Send + 'static,
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
        let base = SegmentBase::new(SegmentId::next(), config);
        let (sender, inbox) = mailbox(base.requester().clone());
        Self {
            base,
            inbox,
            sender,
            state: Mutex::new(ListState {
                sections: Vec::new(),
                latest: Vec::new(),
                staged: None,
                factory,
            }),
        }
    }

    /// A handle for posting snapshots from any thread.
    ///
    /// Posted snapshots are picked up at the start of the next update pass;
    /// only the newest one is diffed.
    pub fn snapshot_sender(&self) -> MailboxSender<QuerySnapshot<S, K, T>> {
        self.sender.clone()
    }

    /// Replaces the backing data and requests an update.
    ///
    /// Must be called on the owner context; use
    /// [`snapshot_sender`](Self::snapshot_sender) from elsewhere.
    pub fn set_snapshot(&self, snapshot: QuerySnapshot<S, K, T>) {
        self.base.affinity().debug_assert_same_thread();
        let normalized = self.normalize(snapshot);
        self.state.lock().latest = normalized;
        self.base.mark_dirty();
    }

    /// Runs `provider` and takes its result as the new backing data.
    pub fn refresh_from(&self, provider: &dyn QueryProvider<S, K, T>) {
        self.set_snapshot(provider.fetch());
    }

    /// Returns `true` if the segment has changes not yet diffed.
    pub fn is_dirty_pending(&self) -> bool {
        self.base.is_dirty() || !self.inbox.is_empty()
    }

    /// Keys of the presented sections.
    pub fn section_keys(&self) -> Vec<S> {
        self.state
            .lock()
            .sections
            .iter()
            .map(|section| section.key().clone())
            .collect()
    }

    /// Identities of the presented items of one section.
    pub fn item_keys(&self, section: usize) -> Vec<K> {
        self.state
            .lock()
            .sections
            .get(section)
            .map(|section| section.items().iter().map(|item| item.key().clone()).collect())
            .unwrap_or_default()
    }

    /// The payload of a presented item.
    pub fn payload(&self, path: IndexPath) -> Option<T> {
        let state = self.state.lock();
        item_at(&state.sections, path).map(|item| item.payload().clone())
    }

    /// Whether a view is currently bound to a presented item.
    pub fn is_bound(&self, path: IndexPath) -> bool {
        let state = self.state.lock();
        item_at(&state.sections, path).is_some_and(Item::is_bound)
    }

    /// Drops non-durable rows and duplicate identities, and hides sections
    /// left without rows.
    fn normalize(&self, snapshot: QuerySnapshot<S, K, T>) -> Vec<QuerySection<S, K, T>> {
        let config = self.base.config();
        let mut section_keys = HashSet::new();
        let mut item_keys = HashSet::new();
        let mut normalized = Vec::with_capacity(snapshot.len());

        for mut section in snapshot {
            if !section_keys.insert(section.key.clone()) {
                report_inconsistency(
                    config.strict_consistency,
                    targets::LIST_SEGMENT,
                    format_args!("duplicate section key {:?} in snapshot, dropped", section.key),
                );
                continue;
            }
            section.items.retain(|item| {
                if !item.durable {
                    return false;
                }
                if !item_keys.insert(item.key.clone()) {
                    report_inconsistency(
                        config.strict_consistency,
                        targets::LIST_SEGMENT,
                        format_args!("duplicate item identity {:?} in snapshot, dropped", item.key),
                    );
                    return false;
                }
                true
            });
            if section.items.is_empty() && !section.force_visible && !config.show_empty_sections {
                continue;
            }
            normalized.push(section);
        }
        normalized
    }
}

fn item_at<S, K, T, V>(sections: &[Section<S, K, T, V>], path: IndexPath) -> Option<&Item<K, T, V>> {
    sections.get(path.section)?.items().get(path.row)
}

fn item_at_mut<S, K, T, V>(
    sections: &mut [Section<S, K, T, V>],
    path: IndexPath,
) -> Option<&mut Item<K, T, V>> {
    sections.get_mut(path.section)?.items_mut().get_mut(path.row)
}

fn fresh_section<S: Clone, K: Clone, T: Clone, V>(source: &QuerySection<S, K, T>) -> Section<S, K, T, V> {
    let items = source
        .items
        .iter()
        .map(|item| Item::new(item.key.clone(), item.payload.clone()))
        .collect();
    Section::with_items(source.key.clone(), items).with_force_visible(source.force_visible)
}

impl<S, K, T, F> ListState<S, K, T, F>
where
    S: Clone + Eq + Hash + Debug,
    K: Clone + Eq + Hash + Debug,
    T: Clone,
    F: ItemFactory<T>,
{
    /// Brings the shadow model to the staged layout, mirroring how the widget
    /// applies the same edits.
    fn materialize(&mut self, staged: Staged<S, K, T>, strict: bool) {
        let Staged { plan, snapshot } = staged;

        // Views leave before their items do.
        let deleted_sections: HashSet<usize> = plan.section_deletes.iter().copied().collect();
        for &section in &plan.section_deletes {
            if let Some(section) = self.sections.get_mut(section) {
                for item in section.items_mut() {
                    item.unbind(&mut self.factory);
                }
            }
        }
        for path in plan.item_deletes.iter().chain(plan.item_moves.iter().map(|(from, _)| from)) {
            if let Some(item) = item_at_mut(&mut self.sections, *path) {
                item.unbind(&mut self.factory);
            }
        }

        // Remove deleted and moved-away items, highest row first.
        let mut removals: Vec<IndexPath> = plan.item_deletes.clone();
        removals.extend(plan.item_moves.iter().map(|(from, _)| *from));
        removals.sort_unstable_by(|a, b| b.cmp(a));
        let moved_items: HashSet<IndexPath> = plan.item_moves.iter().map(|(from, _)| *from).collect();
        let mut item_pool: HashMap<K, Item<K, T, F::View>> = HashMap::new();
        for path in removals {
            let Some(section) = self.sections.get_mut(path.section) else {
                report_inconsistency(
                    strict,
                    targets::LIST_SEGMENT,
                    format_args!("stale item delete at {path}, section missing"),
                );
                continue;
            };
            if path.row >= section.items().len() {
                report_inconsistency(
                    strict,
                    targets::LIST_SEGMENT,
                    format_args!("stale item delete at {path}, row missing"),
                );
                continue;
            }
            let item = section.items_mut().remove(path.row);
            if moved_items.contains(&path) {
                item_pool.insert(item.key().clone(), item);
            }
        }

        // Remove deleted and moved-away sections, highest index first.
        let mut section_removals: Vec<usize> = plan.section_deletes.clone();
        section_removals.extend(plan.section_moves.iter().map(|(from, _)| *from));
        section_removals.sort_unstable_by(|a, b| b.cmp(a));
        let mut section_pool: HashMap<usize, Section<S, K, T, F::View>> = HashMap::new();
        for index in section_removals {
            if index >= self.sections.len() {
                report_inconsistency(
                    strict,
                    targets::LIST_SEGMENT,
                    format_args!("stale section delete at {index}"),
                );
                continue;
            }
            let section = self.sections.remove(index);
            if !deleted_sections.contains(&index) {
                section_pool.insert(index, section);
            }
        }

        // Insert new and moved sections by target index.
        let mut section_targets: Vec<(usize, Option<usize>)> = plan
            .section_inserts
            .iter()
            .map(|&to| (to, None))
            .chain(plan.section_moves.iter().map(|&(from, to)| (to, Some(from))))
            .collect();
        section_targets.sort_unstable();
        for (to, from) in section_targets {
            let section = match from.and_then(|from| section_pool.remove(&from)) {
                Some(section) => section,
                None => match snapshot.get(to) {
                    Some(source) => fresh_section(source),
                    None => continue,
                },
            };
            let to = to.min(self.sections.len());
            self.sections.insert(to, section);
        }

        // Insert new and moved items by target path.
        let mut item_targets: Vec<IndexPath> = plan
            .item_inserts
            .iter()
            .copied()
            .chain(plan.item_moves.iter().map(|(_, to)| *to))
            .collect();
        item_targets.sort_unstable();
        for to in item_targets {
            let Some(source) = snapshot
                .get(to.section)
                .and_then(|section| section.items.get(to.row))
            else {
                continue;
            };
            let item = item_pool
                .remove(&source.key)
                .unwrap_or_else(|| Item::new(source.key.clone(), source.payload.clone()));
            match self.sections.get_mut(to.section) {
                Some(section) if to.row <= section.items().len() => {
                    section.items_mut().insert(to.row, item);
                }
                _ => report_inconsistency(
                    strict,
                    targets::LIST_SEGMENT,
                    format_args!("item insert at {to} out of range"),
                ),
            }
        }
        for mut orphan in item_pool.into_values() {
            orphan.unbind(&mut self.factory);
        }

        if !self.matches(&snapshot) {
            report_inconsistency(
                strict,
                targets::LIST_SEGMENT,
                format_args!("shadow model diverged from snapshot, rebuilding"),
            );
            self.rebuild(&snapshot);
        }

        // Payloads and flags follow the snapshot; views and sizes stay.
        for (section, source) in self.sections.iter_mut().zip(&snapshot) {
            section.set_force_visible(source.force_visible);
            for (item, row) in section.items_mut().iter_mut().zip(&source.items) {
                item.set_payload(row.payload.clone());
            }
        }
    }

    fn matches(&self, snapshot: &[QuerySection<S, K, T>]) -> bool {
        self.sections.len() == snapshot.len()
            && self.sections.iter().zip(snapshot).all(|(section, source)| {
                section.key() == &source.key
                    && section.items().len() == source.items.len()
                    && section
                        .items()
                        .iter()
                        .zip(&source.items)
                        .all(|(item, row)| item.key() == &row.key)
            })
    }

    /// Rebuilds the shadow model from `snapshot`, keeping surviving items.
    fn rebuild(&mut self, snapshot: &[QuerySection<S, K, T>]) {
        let mut pool: HashMap<K, Item<K, T, F::View>> = HashMap::new();
        for section in std::mem::take(&mut self.sections) {
            for item in section_into_items(section) {
                pool.insert(item.key().clone(), item);
            }
        }
        self.sections = snapshot
            .iter()
            .map(|source| {
                let items = source
                    .items
                    .iter()
                    .map(|row| {
                        pool.remove(&row.key)
                            .unwrap_or_else(|| Item::new(row.key.clone(), row.payload.clone()))
                    })
                    .collect();
                Section::with_items(source.key.clone(), items).with_force_visible(source.force_visible)
            })
            .collect();
        for mut item in pool.into_values() {
            item.unbind(&mut self.factory);
        }
    }
}

fn section_into_items<S, K, T, V>(mut section: Section<S, K, T, V>) -> Vec<Item<K, T, V>> {
    std::mem::take(section.items_mut())
}

impl<S, K, T, F> Segment<F::View> for ListSegment<S, K, T, F>
where
    S: Clone + Eq + Hash + Debug + Send + 'static,
    K: Clone + Eq + Hash + Debug + Send + 'static,
    T: Clone + Send + 'static,
    F: ItemFactory<T>,
{
    fn id(&self) -> SegmentId {
        self.base.id()
    }

    fn attach(&self, scheduler: UpdateScheduler) {
        self.base.attach(scheduler);
        if !self.inbox.is_empty() {
            self.base.requester().request();
        }
    }

    fn detach(&self) {
        self.base.detach();
    }

    fn sync(&self) {
        if let Some(snapshot) = self.inbox.latest() {
            let normalized = self.normalize(snapshot);
            self.state.lock().latest = normalized;
            self.base.mark_dirty_quiet();
        }
    }

    fn is_dirty(&self) -> bool {
        self.base.is_dirty()
    }

    fn count(&self) -> usize {
        self.state.lock().sections.len()
    }

    fn item_count(&self, section: usize) -> usize {
        self.state
            .lock()
            .sections
            .get(section)
            .map_or(0, |section| section.items().len())
    }

    fn diff(&self, offsets: Offsets, edits: Option<&mut Transaction>) -> SectionSpan {
        let _perf = PerfSpan::new(span_names::LIST_DIFF);
        self.base.affinity().debug_assert_same_thread();
        self.base.take_dirty();

        let mut state = self.state.lock();
        let old: Vec<LayoutSection<'_, S, K>> = state
            .sections
            .iter()
            .map(|section| (section.key(), section.items().iter().map(Item::key).collect()))
            .collect();
        let new: Vec<LayoutSection<'_, S, K>> = state
            .latest
            .iter()
            .map(|section| (&section.key, section.items.iter().map(|item| &item.key).collect()))
            .collect();
        let plan = ListPlan::compute(&old, &new);
        let span = SectionSpan {
            old: old.len(),
            new: new.len(),
        };

        tracing::debug!(
            target: "horizon_reconcile::list_segment",
            segment = %self.base.id(),
            sections_before = span.old,
            sections_after = span.new,
            section_inserts = plan.section_inserts.len(),
            section_deletes = plan.section_deletes.len(),
            section_moves = plan.section_moves.len(),
            item_inserts = plan.item_inserts.len(),
            item_deletes = plan.item_deletes.len(),
            item_moves = plan.item_moves.len(),
            "list diff"
        );

        if let Some(edits) = edits {
            plan.emit(offsets, edits);
        }
        drop(old);
        drop(new);

        let snapshot = state.latest.clone();
        state.staged = Some(Staged { plan, snapshot });
        span
    }

    fn apply(&self) {
        self.base.affinity().debug_assert_same_thread();
        let strict = self.base.config().strict_consistency;
        let mut state = self.state.lock();
        if let Some(staged) = state.staged.take() {
            state.materialize(staged, strict);
        }
    }

    fn view(&self, path: IndexPath) -> Option<F::View> {
        let mut state = self.state.lock();
        let ListState {
            sections, factory, ..
        } = &mut *state;
        let item = item_at_mut(sections, path)?;
        Some(item.bind(factory))
    }

    fn cached_size(&self, path: IndexPath) -> Option<ItemSize> {
        let state = self.state.lock();
        item_at(&state.sections, path)?.cached_size()
    }

    fn record_size(&self, path: IndexPath, size: ItemSize) -> bool {
        let mut state = self.state.lock();
        match item_at_mut(&mut state.sections, path) {
            Some(item) => {
                item.set_cached_size(Some(size));
                true
            }
            None => false,
        }
    }
}

impl<S, K, T, F: ItemFactory<T>> Drop for ListSegment<S, K, T, F> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for section in &mut state.sections {
            for item in section.items_mut() {
                item.unbind(&mut state.factory);
            }
        }
    }
}

impl<S, K, T, F: ItemFactory<T>> std::fmt::Debug for ListSegment<S, K, T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListSegment")
            .field("id", &self.base.id())
            .field("dirty", &self.base.is_dirty())
            .field("sections", &self.state.lock().sections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::edit::Edit;
    use crate::model::item::FnFactory;
    use crate::model::query::QueryItem;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Rows = Vec<(&'static str, Vec<&'static str>)>;

    fn snapshot(rows: &Rows) -> QuerySnapshot<String, String, String> {
        rows.iter()
            .map(|(key, items)| {
                QuerySection::new(
                    key.to_string(),
                    items
                        .iter()
                        .map(|item| QueryItem::new(item.to_string(), item.to_uppercase()))
                        .collect(),
                )
            })
            .collect()
    }

    type TestSegment = ListSegment<String, String, String, FnFactory<fn(&String) -> String, String>>;

    fn segment() -> TestSegment {
        ListSegment::with_config(
            FnFactory::new(String::clone as fn(&String) -> String),
            ReconcileConfig::strict(),
        )
    }

    fn settle(segment: &TestSegment, rows: &Rows) -> Transaction {
        segment.set_snapshot(snapshot(rows));
        let mut txn = Transaction::new();
        segment.diff(Offsets::default(), Some(&mut txn));
        segment.apply();
        txn
    }

    fn layout(segment: &TestSegment) -> Vec<(String, Vec<String>)> {
        segment
            .section_keys()
            .into_iter()
            .enumerate()
            .map(|(idx, key)| (key, segment.item_keys(idx)))
            .collect()
    }

    #[test]
    fn test_first_snapshot_inserts_sections() {
        let seg = segment();
        let txn = settle(&seg, &vec![("mon", vec!["a", "b"]), ("tue", vec!["c"])]);
        assert_eq!(txn.edits(), &[Edit::InsertSection(0), Edit::InsertSection(1)]);
        assert_eq!(seg.count(), 2);
        assert_eq!(seg.item_count(0), 2);
        assert_eq!(seg.payload(IndexPath::new(1, 0)).as_deref(), Some("C"));
    }

    #[test]
    fn test_same_snapshot_twice_is_idle() {
        let seg = segment();
        let rows = vec![("mon", vec!["a", "b"])];
        settle(&seg, &rows);
        assert!(settle(&seg, &rows).is_empty());
    }

    #[test]
    fn test_materialize_follows_moves() {
        let seg = segment();
        settle(&seg, &vec![("mon", vec!["a", "b", "c"]), ("tue", vec!["d"])]);
        let next = vec![("tue", vec!["d", "b"]), ("wed", vec!["e"]), ("mon", vec!["c", "a"])];
        let txn = settle(&seg, &next);
        assert!(!txn.is_empty());

        let expected: Vec<(String, Vec<String>)> = next
            .iter()
            .map(|(key, items)| (key.to_string(), items.iter().map(|i| i.to_string()).collect()))
            .collect();
        assert_eq!(layout(&seg), expected);
    }

    #[test]
    fn test_non_durable_items_are_ignored() {
        let seg = segment();
        seg.set_snapshot(vec![QuerySection::new(
            "mon".to_string(),
            vec![
                QueryItem::new("a".to_string(), "A".to_string()),
                QueryItem::pending("draft".to_string(), "DRAFT".to_string()),
            ],
        )]);
        seg.diff(Offsets::default(), None);
        seg.apply();
        assert_eq!(seg.item_keys(0), vec!["a".to_string()]);
    }

    #[test]
    fn test_empty_sections_are_hidden_unless_forced() {
        let seg = segment();
        seg.set_snapshot(vec![
            QuerySection::new("mon".to_string(), Vec::new()),
            QuerySection::new("tue".to_string(), Vec::new()).with_force_visible(true),
        ]);
        seg.diff(Offsets::default(), None);
        seg.apply();
        assert_eq!(seg.section_keys(), vec!["tue".to_string()]);
    }

    #[test]
    fn test_duplicate_identity_dropped_when_lenient() {
        let seg: TestSegment = ListSegment::new(FnFactory::new(String::clone as fn(&String) -> String));
        seg.set_snapshot(snapshot(&vec![("mon", vec!["a"]), ("tue", vec!["a", "b"])]));
        seg.diff(Offsets::default(), None);
        seg.apply();
        assert_eq!(seg.item_keys(1), vec!["b".to_string()]);
    }

    #[test]
    fn test_stale_plan_is_repaired_when_lenient() {
        let seg: TestSegment = ListSegment::new(FnFactory::new(String::clone as fn(&String) -> String));
        seg.set_snapshot(snapshot(&vec![("mon", vec!["a", "b"]), ("tue", vec!["c"])]));
        seg.diff(Offsets::default(), None);
        seg.apply();
        assert_eq!(seg.view(IndexPath::new(0, 1)).as_deref(), Some("B"));

        // Only the first item delete is valid; everything else points past
        // the shadow model.
        let plan = ListPlan {
            section_deletes: vec![7],
            item_deletes: vec![IndexPath::new(0, 0), IndexPath::new(5, 0), IndexPath::new(0, 9)],
            item_inserts: vec![IndexPath::new(0, 2)],
            ..ListPlan::default()
        };
        let next = snapshot(&vec![("mon", vec!["a", "b", "d"]), ("tue", vec!["c"])]);
        seg.state.lock().materialize(Staged { plan, snapshot: next }, false);

        assert_eq!(
            layout(&seg),
            vec![
                ("mon".to_string(), vec!["a".to_string(), "b".to_string(), "d".to_string()]),
                ("tue".to_string(), vec!["c".to_string()]),
            ]
        );
        assert!(seg.is_bound(IndexPath::new(0, 1)));
        assert!(!seg.is_bound(IndexPath::new(0, 0)));
        assert_eq!(seg.payload(IndexPath::new(0, 2)).as_deref(), Some("D"));
    }

    #[test]
    #[should_panic(expected = "shadow model diverged")]
    fn test_stale_plan_panics_when_strict() {
        let seg = segment();
        settle(&seg, &vec![("mon", vec!["a"])]);
        let plan = ListPlan {
            item_deletes: vec![IndexPath::new(0, 0)],
            ..ListPlan::default()
        };
        let next = snapshot(&vec![("mon", vec!["a", "b"])]);
        seg.state.lock().materialize(Staged { plan, snapshot: next }, true);
    }

    #[test]
    #[should_panic(expected = "duplicate item identity")]
    fn test_duplicate_identity_panics_when_strict() {
        let seg = segment();
        seg.set_snapshot(snapshot(&vec![("mon", vec!["a", "a"])]));
    }

    #[test]
    fn test_views_released_for_deleted_and_moved_items() {
        let created = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicUsize::new(0));

        struct Counting {
            created: Arc<AtomicUsize>,
            released: Arc<AtomicUsize>,
        }
        impl ItemFactory<String> for Counting {
            type View = String;
            fn create(&mut self, payload: &String) -> String {
                self.created.fetch_add(1, Ordering::SeqCst);
                payload.clone()
            }
            fn release(&mut self, _payload: &String, _view: String) {
                self.released.fetch_add(1, Ordering::SeqCst);
            }
        }

        let seg = ListSegment::with_config(
            Counting {
                created: created.clone(),
                released: released.clone(),
            },
            ReconcileConfig::strict(),
        );
        seg.set_snapshot(snapshot(&vec![("mon", vec!["a", "b", "c"])]));
        seg.diff(Offsets::default(), None);
        seg.apply();
        assert_eq!(created.load(Ordering::SeqCst), 0);

        for row in 0..3 {
            assert!(seg.view(IndexPath::new(0, row)).is_some());
        }
        assert_eq!(created.load(Ordering::SeqCst), 3);

        // "a" is deleted, "c" moves ahead of "b".
        seg.set_snapshot(snapshot(&vec![("mon", vec!["c", "b"])]));
        seg.diff(Offsets::default(), None);
        seg.apply();
        assert_eq!(released.load(Ordering::SeqCst), 2);
        assert!(seg.is_bound(IndexPath::new(0, 1)));
        assert!(!seg.is_bound(IndexPath::new(0, 0)));

        drop(seg);
        assert_eq!(released.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_sizes_survive_unrelated_changes() {
        let seg = segment();
        settle(&seg, &vec![("mon", vec!["a", "b"])]);
        assert!(seg.record_size(IndexPath::new(0, 1), ItemSize::new(320.0, 44.0)));
        assert!(!seg.record_size(IndexPath::new(3, 0), ItemSize::new(1.0, 1.0)));

        settle(&seg, &vec![("mon", vec!["x", "a", "b"])]);
        assert_eq!(
            seg.cached_size(IndexPath::new(0, 2)),
            Some(ItemSize::new(320.0, 44.0))
        );
        assert_eq!(seg.cached_size(IndexPath::new(0, 0)), None);
    }

    #[test]
    fn test_snapshot_posted_from_another_thread() {
        let seg = segment();
        let scheduler = UpdateScheduler::new();
        seg.attach(scheduler.clone());

        let sender = seg.snapshot_sender();
        std::thread::spawn(move || {
            sender.post(snapshot(&vec![("mon", vec!["a"])]));
            sender.post(snapshot(&vec![("mon", vec!["a", "b"])]));
        })
        .join()
        .unwrap();

        assert!(scheduler.take_pending());
        assert!(!seg.is_dirty());
        seg.sync();
        assert!(seg.is_dirty());
        seg.diff(Offsets::default(), None);
        seg.apply();
        assert_eq!(seg.item_keys(0), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_refresh_from_provider() {
        let seg = segment();
        let provider = || snapshot(&vec![("mon", vec!["a"])]);
        seg.refresh_from(&provider);
        assert!(seg.is_dirty());
    }

    #[test]
    fn test_payload_refreshed_in_place() {
        let seg = segment();
        settle(&seg, &vec![("mon", vec!["a"])]);
        seg.set_snapshot(vec![QuerySection::new(
            "mon".to_string(),
            vec![QueryItem::new("a".to_string(), "edited".to_string())],
        )]);
        let mut txn = Transaction::new();
        seg.diff(Offsets::default(), Some(&mut txn));
        seg.apply();
        assert!(txn.is_empty());
        assert_eq!(seg.payload(IndexPath::new(0, 0)).as_deref(), Some("edited"));
    }
}
