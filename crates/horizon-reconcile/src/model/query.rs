//! Backing query results consumed by list-backed segments.

/// One row of a query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryItem<K, T> {
    /// Stable identity, equal across snapshots for the same logical record.
    pub key: K,
    /// The record itself.
    pub payload: T,
    /// `false` while the identity is not yet durable (for example, not yet
    /// persisted). Such rows are ignored by the diff.
    pub durable: bool,
}

impl<K, T> QueryItem<K, T> {
    /// A row with a durable identity.
    pub fn new(key: K, payload: T) -> Self {
        Self {
            key,
            payload,
            durable: true,
        }
    }

    /// A row whose identity is not durable yet.
    pub fn pending(key: K, payload: T) -> Self {
        Self {
            key,
            payload,
            durable: false,
        }
    }
}

/// One section of a query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySection<S, K, T> {
    /// Stable section key.
    pub key: S,
    /// Rows in display order.
    pub items: Vec<QueryItem<K, T>>,
    /// Present the section even when it has no rows.
    pub force_visible: bool,
}

impl<S, K, T> QuerySection<S, K, T> {
    /// Creates a section.
    pub fn new(key: S, items: Vec<QueryItem<K, T>>) -> Self {
        Self {
            key,
            items,
            force_visible: false,
        }
    }

    /// Keeps the section visible when empty.
    pub fn with_force_visible(mut self, force_visible: bool) -> Self {
        self.force_visible = force_visible;
        self
    }
}

/// An ordered, sectioned query result.
pub type QuerySnapshot<S, K, T> = Vec<QuerySection<S, K, T>>;

/// Supplies snapshots on demand.
///
/// Implementations must keep identities stable across calls and unique
/// within one snapshot.
pub trait QueryProvider<S, K, T> {
    /// Runs the query.
    fn fetch(&self) -> QuerySnapshot<S, K, T>;
}

impl<S, K, T, F> QueryProvider<S, K, T> for F
where
    F: Fn() -> QuerySnapshot<S, K, T>,
{
    fn fetch(&self) -> QuerySnapshot<S, K, T> {
        self()
    }
}
