//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use horizon_reconcile::ReconcileConfig;
use horizon_reconcile::model::{
    Composite, FilterSegment, FnFactory, IndexPath, ListSegment, ListSink, QueryItem, QuerySection,
    QuerySnapshot, RecordingSink,
};
use proptest::prelude::*;
use proptest::sample::Index;

/// Section keys with their item identities, in display order.
pub type Layout = Vec<(String, Vec<String>)>;

pub type TestFactory = FnFactory<fn(&String) -> String, String>;
pub type TestList = ListSegment<String, String, String, TestFactory>;
pub type TestFilter = FilterSegment<String, String, TestFactory>;

/// Installs a test subscriber once; filter with `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Views are the payload itself, which tests set to the identity.
pub fn factory() -> TestFactory {
    FnFactory::new(String::clone as fn(&String) -> String)
}

pub fn list_segment() -> Arc<TestList> {
    Arc::new(ListSegment::with_config(factory(), ReconcileConfig::strict()))
}

pub fn filter_segment(keys: &[&str]) -> Arc<TestFilter> {
    let segment = Arc::new(FilterSegment::with_config(factory(), ReconcileConfig::strict()));
    for key in keys {
        segment.push(key.to_string(), key.to_string()).unwrap();
    }
    segment
}

pub fn composite() -> Composite<String> {
    Composite::with_config(ReconcileConfig::strict())
}

pub fn layout(sections: &[(&str, Vec<&str>)]) -> Layout {
    sections
        .iter()
        .map(|(key, items)| (key.to_string(), items.iter().map(|i| i.to_string()).collect()))
        .collect()
}

/// A snapshot whose payloads equal the identities.
pub fn snapshot(layout: &Layout) -> QuerySnapshot<String, String, String> {
    layout
        .iter()
        .map(|(key, items)| {
            QuerySection::new(
                key.clone(),
                items
                    .iter()
                    .map(|item| QueryItem::new(item.clone(), item.clone()))
                    .collect(),
            )
        })
        .collect()
}

/// Reads the composite's presented items through its views.
pub fn presented_items(composite: &Composite<String>) -> Vec<Vec<String>> {
    (0..composite.section_count())
        .map(|section| {
            (0..composite.item_count(section))
                .map(|row| {
                    composite
                        .view(IndexPath::new(section, row))
                        .expect("presented item has a view")
                })
                .collect()
        })
        .collect()
}

pub fn assert_composite_shows(composite: &Composite<String>, expected: &Layout) {
    let items: Vec<Vec<String>> = expected.iter().map(|(_, items)| items.clone()).collect();
    assert_eq!(presented_items(composite), items);
}

#[derive(Debug, Default)]
struct Pending {
    delete_sections: BTreeSet<usize>,
    insert_sections: BTreeSet<usize>,
    section_moves: Vec<(usize, usize)>,
    delete_items: Vec<IndexPath>,
    insert_items: Vec<IndexPath>,
    item_moves: Vec<(IndexPath, IndexPath)>,
}

/// A list widget double that applies batches the way a real batch-update
/// widget does and checks the result.
///
/// Deletes and move sources are resolved against the layout before the
/// batch, inserts and move targets against the layout after it. Contents of
/// inserted sections and items come from the expected layout, playing the
/// part of the widget's data source. After every batch the shown layout must
/// equal the expected one.
#[derive(Debug)]
pub struct SimulatedList {
    shown: Layout,
    expected: Option<Layout>,
    pending: Pending,
    in_batch: bool,
    batches: usize,
    last_batch: RecordingSink,
    /// Fail if one batch deletes and inserts the same identity.
    pub check_identity_overlap: bool,
}

impl Default for SimulatedList {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedList {
    pub fn new() -> Self {
        Self::with_shown(Vec::new())
    }

    /// A widget that already shows `shown`.
    pub fn with_shown(shown: Layout) -> Self {
        Self {
            shown,
            expected: None,
            pending: Pending::default(),
            in_batch: false,
            batches: 0,
            last_batch: RecordingSink::new(),
            check_identity_overlap: true,
        }
    }

    /// Sets the layout the next batch must produce.
    pub fn expect(&mut self, layout: Layout) {
        self.expected = Some(layout);
    }

    pub fn shown(&self) -> &Layout {
        &self.shown
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Calls received in the most recent batch.
    pub fn last_batch(&self) -> &RecordingSink {
        &self.last_batch
    }

    fn record(&mut self) -> &mut Pending {
        assert!(self.in_batch, "edit outside begin_updates/end_updates");
        &mut self.pending
    }

    fn apply_batch(&mut self) {
        let expected = self
            .expected
            .clone()
            .expect("expected layout must be set before a batch");
        let old = std::mem::take(&mut self.shown);
        let p = std::mem::take(&mut self.pending);

        // Sections leaving the old layout.
        let mut removed_sections = BTreeSet::new();
        for &section in &p.delete_sections {
            assert!(section < old.len(), "section delete {section} beyond {}", old.len());
            removed_sections.insert(section);
        }
        for &(from, _) in &p.section_moves {
            assert!(from < old.len(), "section move from {from} beyond {}", old.len());
            assert!(removed_sections.insert(from), "section {from} deleted and moved");
        }

        // Sections arriving in the new layout.
        let count = expected.len();
        let mut placed = BTreeSet::new();
        for &section in &p.insert_sections {
            assert!(section < count, "section insert {section} beyond {count}");
            placed.insert(section);
        }
        for &(_, to) in &p.section_moves {
            assert!(to < count, "section move to {to} beyond {count}");
            assert!(placed.insert(to), "section slot {to} filled twice");
        }
        assert_eq!(
            old.len() - removed_sections.len() + placed.len(),
            count,
            "section count not conserved"
        );

        // Items leaving.
        let mut removed_items = BTreeSet::new();
        let moved_sources: Vec<IndexPath> = p.item_moves.iter().map(|(from, _)| *from).collect();
        for path in p.delete_items.iter().chain(&moved_sources) {
            assert!(
                !p.delete_sections.contains(&path.section),
                "item {path} addressed inside a deleted section"
            );
            assert!(
                path.section < old.len() && path.row < old[path.section].1.len(),
                "item delete {path} out of range"
            );
            assert!(removed_items.insert(*path), "item {path} removed twice");
        }

        if self.check_identity_overlap {
            let deleted: HashSet<&String> = p
                .delete_items
                .iter()
                .map(|path| &old[path.section].1[path.row])
                .collect();
            for path in &p.insert_items {
                let inserted = &expected[path.section].1[path.row];
                assert!(!deleted.contains(inserted), "{inserted} both deleted and inserted");
            }
            let deleted_keys: HashSet<&String> =
                p.delete_sections.iter().map(|&s| &old[s].0).collect();
            for &section in &p.insert_sections {
                let key = &expected[section].0;
                assert!(!deleted_keys.contains(key), "section {key} both deleted and inserted");
            }
        }

        // Item-level conservation; moves cancel out.
        let old_total: usize = old.iter().map(|(_, items)| items.len()).sum();
        let new_total: usize = expected.iter().map(|(_, items)| items.len()).sum();
        let dropped: usize = p.delete_sections.iter().map(|&s| old[s].1.len()).sum::<usize>()
            + p.delete_items.len();
        let added: usize = p
            .insert_sections
            .iter()
            .map(|&s| expected[s].1.len())
            .sum::<usize>()
            + p.insert_items.len();
        assert_eq!(old_total + added - dropped, new_total, "item count not conserved");

        // What each old section still carries.
        let carried: Vec<(String, Vec<String>)> = old
            .iter()
            .enumerate()
            .map(|(s, (key, items))| {
                let rest = items
                    .iter()
                    .enumerate()
                    .filter(|(row, _)| !removed_items.contains(&IndexPath::new(s, *row)))
                    .map(|(_, item)| item.clone())
                    .collect();
                (key.clone(), rest)
            })
            .collect();

        let mut slots: Vec<Option<(String, Vec<String>)>> = vec![None; count];
        for &(from, to) in &p.section_moves {
            slots[to] = Some(carried[from].clone());
        }
        for &section in &p.insert_sections {
            slots[section] = Some(expected[section].clone());
        }
        let mut survivors = (0..old.len())
            .filter(|s| !removed_sections.contains(s))
            .map(|s| carried[s].clone());
        for slot in slots.iter_mut() {
            if slot.is_none() {
                *slot = Some(survivors.next().expect("too few surviving sections"));
            }
        }
        assert!(survivors.next().is_none(), "surviving sections left over");
        let mut sections: Layout = slots.into_iter().flatten().collect();

        // Items arriving, grouped by target section.
        let mut arriving: BTreeMap<usize, Vec<(usize, String)>> = BTreeMap::new();
        for (from, to) in &p.item_moves {
            assert!(to.section < count, "item move to {to} beyond {count} sections");
            assert!(
                !p.insert_sections.contains(&to.section),
                "item moved into inserted section {}",
                to.section
            );
            let identity = old[from.section].1[from.row].clone();
            arriving.entry(to.section).or_default().push((to.row, identity));
        }
        for path in &p.insert_items {
            assert!(path.section < count, "item insert {path} beyond {count} sections");
            assert!(
                !p.insert_sections.contains(&path.section),
                "item inserted into inserted section {}",
                path.section
            );
            let identity = expected[path.section]
                .1
                .get(path.row)
                .unwrap_or_else(|| panic!("item insert {path} beyond data source"))
                .clone();
            arriving.entry(path.section).or_default().push((path.row, identity));
        }

        for (section, (_, items)) in sections.iter_mut().enumerate() {
            if p.insert_sections.contains(&section) {
                continue;
            }
            let target = expected[section].1.len();
            let mut rows: Vec<Option<String>> = vec![None; target];
            for (row, identity) in arriving.remove(&section).unwrap_or_default() {
                assert!(row < target, "item row {row} beyond {target} in section {section}");
                assert!(rows[row].is_none(), "item slot [{section}, {row}] filled twice");
                rows[row] = Some(identity);
            }
            let mut kept = std::mem::take(items).into_iter();
            for row in rows.iter_mut() {
                if row.is_none() {
                    *row = Some(
                        kept.next()
                            .unwrap_or_else(|| panic!("too few items in section {section}")),
                    );
                }
            }
            assert!(kept.next().is_none(), "items left over in section {section}");
            *items = rows.into_iter().flatten().collect();
        }

        assert_eq!(sections, expected, "batch did not reproduce the new layout");
        self.shown = sections;
    }
}

impl ListSink for SimulatedList {
    fn begin_updates(&mut self) {
        assert!(!self.in_batch, "nested batch");
        self.in_batch = true;
        self.last_batch.clear();
        self.last_batch.begin_updates();
    }

    fn insert_sections(&mut self, sections: &BTreeSet<usize>) {
        self.record().insert_sections.extend(sections);
        self.last_batch.insert_sections(sections);
    }

    fn delete_sections(&mut self, sections: &BTreeSet<usize>) {
        self.record().delete_sections.extend(sections);
        self.last_batch.delete_sections(sections);
    }

    fn move_section(&mut self, from: usize, to: usize) {
        self.record().section_moves.push((from, to));
        self.last_batch.move_section(from, to);
    }

    fn insert_items(&mut self, paths: &[IndexPath]) {
        self.record().insert_items.extend_from_slice(paths);
        self.last_batch.insert_items(paths);
    }

    fn delete_items(&mut self, paths: &[IndexPath]) {
        self.record().delete_items.extend_from_slice(paths);
        self.last_batch.delete_items(paths);
    }

    fn move_item(&mut self, from: IndexPath, to: IndexPath) {
        self.record().item_moves.push((from, to));
        self.last_batch.move_item(from, to);
    }

    fn end_updates(&mut self) {
        assert!(self.in_batch, "end_updates without begin_updates");
        self.apply_batch();
        self.in_batch = false;
        self.batches += 1;
        self.last_batch.end_updates();
    }
}

/// Layouts drawing shuffled sections from `section_keys` and shuffled items
/// from `item_keys`; no empty sections.
pub fn layout_strategy(
    section_keys: &[&str],
    item_keys: &[&str],
) -> impl Strategy<Value = Layout> + use<> {
    let sections: Vec<String> = section_keys.iter().map(|key| key.to_string()).collect();
    let items: Vec<String> = item_keys.iter().map(|key| key.to_string()).collect();
    let max_sections = sections.len();
    let picks = prop::collection::vec(prop::option::weighted(0.6, any::<Index>()), items.len());
    (Just(sections).prop_shuffle(), Just(items).prop_shuffle(), 0..=max_sections, picks).prop_map(
        |(sections, items, used, picks)| {
            let mut layout: Layout = sections
                .into_iter()
                .take(used)
                .map(|key| (key, Vec::new()))
                .collect();
            if layout.is_empty() {
                return layout;
            }
            for (item, pick) in items.into_iter().zip(picks) {
                if let Some(pick) = pick {
                    let section = pick.index(layout.len());
                    layout[section].1.push(item);
                }
            }
            layout.retain(|(_, items)| !items.is_empty());
            layout
        },
    )
}
