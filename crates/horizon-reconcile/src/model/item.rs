//! Items, sections and the item factory.

use std::marker::PhantomData;

/// A measured item size, fed back after layout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ItemSize {
    pub width: f32,
    pub height: f32,
}

impl ItemSize {
    /// Creates a size.
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Produces renderable views for item payloads.
///
/// Views are created lazily, only when the widget asks for an item that has
/// entered the visible set. A view bound to an item that leaves the visible
/// set or moves is handed back through [`release`](Self::release) before the
/// segment mutates its model.
pub trait ItemFactory<T>: Send {
    /// The renderable representation, usually a cheap handle.
    type View: Clone + Send + 'static;

    /// Builds a view for `payload`.
    fn create(&mut self, payload: &T) -> Self::View;

    /// Takes back a view that is no longer displayed.
    fn release(&mut self, _payload: &T, _view: Self::View) {}
}

/// An [`ItemFactory`] backed by a closure. Released views are dropped.
pub struct FnFactory<F, V> {
    create: F,
    _view: PhantomData<fn() -> V>,
}

impl<F, V> FnFactory<F, V> {
    /// Wraps `create`.
    pub fn new(create: F) -> Self {
        Self {
            create,
            _view: PhantomData,
        }
    }
}

impl<T, F, V> ItemFactory<T> for FnFactory<F, V>
where
    F: FnMut(&T) -> V + Send,
    V: Clone + Send + 'static,
{
    type View = V;

    fn create(&mut self, payload: &T) -> V {
        (self.create)(payload)
    }
}

/// One presented item: stable identity, payload, visibility, cached size and
/// the view currently bound to it, if any.
#[derive(Debug, Clone)]
pub struct Item<K, T, V> {
    key: K,
    payload: T,
    visible: bool,
    size: Option<ItemSize>,
    view: Option<V>,
}

impl<K, T, V> Item<K, T, V> {
    /// Creates a visible, unmeasured, unbound item.
    pub fn new(key: K, payload: T) -> Self {
        Self {
            key,
            payload,
            visible: true,
            size: None,
            view: None,
        }
    }

    /// Sets the visibility flag.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// The stable identity.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The payload.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Whether the item is in the visible set.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The last measured size.
    pub fn cached_size(&self) -> Option<ItemSize> {
        self.size
    }

    /// Whether a view is currently bound.
    pub fn is_bound(&self) -> bool {
        self.view.is_some()
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub(crate) fn set_payload(&mut self, payload: T) {
        self.payload = payload;
    }

    pub(crate) fn set_cached_size(&mut self, size: Option<ItemSize>) {
        self.size = size;
    }

    /// Returns the bound view, creating it with `factory` on first use.
    pub(crate) fn bind<F>(&mut self, factory: &mut F) -> V
    where
        F: ItemFactory<T, View = V>,
        V: Clone,
    {
        match &self.view {
            Some(view) => view.clone(),
            None => {
                let view = factory.create(&self.payload);
                self.view = Some(view.clone());
                view
            }
        }
    }

    /// Hands a bound view back to `factory`.
    pub(crate) fn unbind<F>(&mut self, factory: &mut F)
    where
        F: ItemFactory<T, View = V>,
    {
        if let Some(view) = self.view.take() {
            factory.release(&self.payload, view);
        }
    }
}

/// An ordered run of items under a stable section key.
#[derive(Debug, Clone)]
pub struct Section<S, K, T, V> {
    key: S,
    items: Vec<Item<K, T, V>>,
    force_visible: bool,
}

impl<S, K, T, V> Section<S, K, T, V> {
    /// Creates an empty section.
    pub fn new(key: S) -> Self {
        Self {
            key,
            items: Vec::new(),
            force_visible: false,
        }
    }

    /// Creates a section holding `items`.
    pub fn with_items(key: S, items: Vec<Item<K, T, V>>) -> Self {
        Self {
            key,
            items,
            force_visible: false,
        }
    }

    /// Keeps the section visible even with no visible items.
    pub fn with_force_visible(mut self, force_visible: bool) -> Self {
        self.force_visible = force_visible;
        self
    }

    /// The stable section key.
    pub fn key(&self) -> &S {
        &self.key
    }

    /// The items in order.
    pub fn items(&self) -> &[Item<K, T, V>] {
        &self.items
    }

    /// Whether the section is forced visible.
    pub fn is_force_visible(&self) -> bool {
        self.force_visible
    }

    /// A section is visible if forced or if it holds a visible item.
    pub fn is_visible(&self) -> bool {
        self.force_visible || self.items.iter().any(Item::is_visible)
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<Item<K, T, V>> {
        &mut self.items
    }

    pub(crate) fn set_force_visible(&mut self, force_visible: bool) {
        self.force_visible = force_visible;
    }
}
