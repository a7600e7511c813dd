//! Provider Scopes
//!
//! A provider scope makes values available to everything running while the
//! scope is active, the way a component tree's provider makes a value
//! available to its descendants. Consumers look values up by
//! [`ContextKey`].
//!
//! # Selectable contexts
//!
//! A key is created either plain or selectable. Only a selectable key is
//! backed by a [`SharedCell`], so only a selectable key can be watched with
//! [`use_context_selector`]. Trying to select from a plain key is an
//! integration mistake and panics immediately.
//!
//! # Implementation
//!
//! We use a thread-local stack of provider frames. Entering a scope pushes a
//! frame; dropping the guard removes that scope's frame, wherever it sits.
//! Scopes are expected to exit innermost first, and one that does not is
//! logged. Lookups walk the stack from the
//! innermost frame outwards, so nested providers shadow outer ones.
//!
//! A frame owns the cells its selectable keys created. Popping the frame
//! closes them.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use super::cell::SharedCell;
use super::equality::SameValue;
use super::selector::Selector;

thread_local! {
    static PROVIDER_STACK: RefCell<Vec<ProviderFrame>> = RefCell::new(Vec::new());
}

static CONTEXT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);
static SCOPE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Capability tag carried by every [`ContextKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Holds a plain value. Readable with [`use_context`] only.
    Plain,
    /// Backed by a shared cell. Also usable with [`use_context_selector`].
    Selectable,
}

/// Typed handle identifying one context.
pub struct ContextKey<V> {
    id: u64,
    kind: ContextKind,
    name: &'static str,
    _marker: PhantomData<fn() -> V>,
}

impl<V> ContextKey<V> {
    fn new(name: &'static str, kind: ContextKind) -> Self {
        Self {
            id: CONTEXT_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            kind,
            name,
            _marker: PhantomData,
        }
    }

    /// Create a key for a plain context.
    pub fn plain(name: &'static str) -> Self {
        Self::new(name, ContextKind::Plain)
    }

    /// Create a key for a context that supports selectors.
    pub fn selectable(name: &'static str) -> Self {
        Self::new(name, ContextKind::Selectable)
    }

    /// Whether the context is plain or selectable.
    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    /// Name used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether selectors may read this context.
    pub fn is_selectable(&self) -> bool {
        self.kind == ContextKind::Selectable
    }
}

impl<V> Clone for ContextKey<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for ContextKey<V> {}

impl<V> fmt::Debug for ContextKey<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextKey")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Errors from context lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("use_context_selector requires a selectable context (`{name}` is plain)")]
    NotSelectable { name: &'static str },

    #[error("no provider in scope for context `{name}`")]
    MissingProvider { name: &'static str },
}

/// Cell stored in a frame, erased so frames can hold cells of any type.
trait ProvidedCell {
    fn as_any(&self) -> &dyn Any;
    fn close(&self);
}

impl<V> ProvidedCell for SharedCell<V>
where
    V: Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn close(&self) {
        SharedCell::close(self);
    }
}

enum Slot {
    Plain(Arc<dyn Any + Send + Sync>),
    Selectable(Box<dyn ProvidedCell>),
}

/// One provider scope's values.
struct ProviderFrame {
    scope_id: u64,
    slots: HashMap<u64, Slot>,
}

/// Guard for an active provider scope.
///
/// The scope is exited, and its cells closed, when the guard is dropped.
pub struct ProviderScope {
    scope_id: u64,
    // Frames live in a thread-local stack; the guard must stay on its thread.
    _not_send: PhantomData<*const ()>,
}

impl ProviderScope {
    /// Enter a new, empty provider scope.
    pub fn enter() -> Self {
        let scope_id = SCOPE_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        PROVIDER_STACK.with(|stack| {
            stack.borrow_mut().push(ProviderFrame {
                scope_id,
                slots: HashMap::new(),
            });
        });

        Self {
            scope_id,
            _not_send: PhantomData,
        }
    }

    /// Provide a value for `key` in this scope.
    ///
    /// For a selectable key the first call creates the scope's cell and
    /// later calls publish to it, notifying selectors synchronously.
    pub fn provide<V>(&self, key: &ContextKey<V>, value: V)
    where
        V: Send + Sync + 'static,
    {
        // Publishing runs observers, which may look contexts up again, so
        // the stack must not be borrowed while it happens.
        let existing = self.with_frame(|frame| match frame.slots.get(&key.id) {
            Some(Slot::Selectable(cell)) => cell.as_any().downcast_ref::<SharedCell<V>>().cloned(),
            _ => None,
        });

        if let Some(cell) = existing {
            cell.publish(value);
            return;
        }

        let slot = match key.kind {
            ContextKind::Plain => Slot::Plain(Arc::new(value)),
            ContextKind::Selectable => {
                let cell = SharedCell::new(value);
                debug!(context = key.name, cell = cell.id(), "selectable context provided");
                Slot::Selectable(Box::new(cell))
            }
        };
        self.with_frame(|frame| frame.slots.insert(key.id, slot));
    }

    /// Get this scope's unique ID.
    pub fn id(&self) -> u64 {
        self.scope_id
    }

    fn with_frame<R>(&self, f: impl FnOnce(&mut ProviderFrame) -> R) -> R {
        PROVIDER_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let frame = stack
                .iter_mut()
                .rev()
                .find(|frame| frame.scope_id == self.scope_id)
                .unwrap_or_else(|| panic!("provider scope {} is not on this thread's stack", self.scope_id));
            f(frame)
        })
    }

    /// Number of active provider scopes on this thread.
    pub fn depth() -> usize {
        PROVIDER_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ProviderScope {
    fn drop(&mut self) {
        let removed = PROVIDER_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let position = stack
                .iter()
                .rposition(|frame| frame.scope_id == self.scope_id)?;
            if position + 1 != stack.len() {
                warn!(
                    scope = self.scope_id,
                    above = stack.len() - position - 1,
                    "provider scope exited out of order"
                );
            }
            Some(stack.remove(position))
        });

        // Close after the stack borrow is released.
        if let Some(frame) = removed {
            for slot in frame.slots.into_values() {
                if let Slot::Selectable(cell) = slot {
                    cell.close();
                }
            }
        }
    }
}

impl fmt::Debug for ProviderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderScope")
            .field("scope_id", &self.scope_id)
            .finish()
    }
}

/// What a lookup found for a key.
enum Found<V: Send + Sync + 'static> {
    Plain(Arc<V>),
    Cell(SharedCell<V>),
}

fn lookup<V>(key: &ContextKey<V>) -> Option<Found<V>>
where
    V: Send + Sync + 'static,
{
    PROVIDER_STACK.with(|stack| {
        let stack = stack.borrow();
        stack
            .iter()
            .rev()
            .find_map(|frame| frame.slots.get(&key.id))
            .and_then(|slot| match slot {
                Slot::Plain(value) => Arc::clone(value).downcast::<V>().ok().map(Found::Plain),
                Slot::Selectable(cell) => cell
                    .as_any()
                    .downcast_ref::<SharedCell<V>>()
                    .cloned()
                    .map(Found::Cell),
            })
    })
}

/// Get the nearest provided value for `key`.
pub fn use_context<V>(key: &ContextKey<V>) -> Option<Arc<V>>
where
    V: Send + Sync + 'static,
{
    lookup(key).map(|found| match found {
        Found::Plain(value) => value,
        Found::Cell(cell) => cell.get(),
    })
}

/// Get the cell backing the nearest provider of a selectable key.
pub fn try_use_context_cell<V>(key: &ContextKey<V>) -> Result<SharedCell<V>, ContextError>
where
    V: Send + Sync + 'static,
{
    if !key.is_selectable() {
        return Err(ContextError::NotSelectable { name: key.name });
    }
    match lookup(key) {
        Some(Found::Cell(cell)) => Ok(cell),
        _ => Err(ContextError::MissingProvider { name: key.name }),
    }
}

/// Watch a slice of a selectable context.
///
/// The selector is attached to the nearest provider's cell.
pub fn try_use_context_selector<V, S, F>(
    key: &ContextKey<V>,
    select: F,
) -> Result<Selector<V, S>, ContextError>
where
    V: Send + Sync + 'static,
    S: SameValue + Clone + Send + Sync + 'static,
    F: Fn(&V) -> S + Send + Sync + 'static,
{
    let cell = try_use_context_cell(key)?;
    Ok(Selector::attach(&cell, select))
}

/// Watch a slice of a selectable context.
///
/// # Panics
///
/// Panics if `key` is a plain context or no provider for it is in scope.
/// Both are integration mistakes, not runtime conditions.
pub fn use_context_selector<V, S, F>(key: &ContextKey<V>, select: F) -> Selector<V, S>
where
    V: Send + Sync + 'static,
    S: SameValue + Clone + Send + Sync + 'static,
    F: Fn(&V) -> S + Send + Sync + 'static,
{
    try_use_context_selector(key, select).unwrap_or_else(|err| panic!("{err}"))
}

/// Like [`use_context_selector`], with a callback for each changed slice.
///
/// # Panics
///
/// Panics if `key` is a plain context or no provider for it is in scope.
pub fn use_context_selector_notify<V, S, F, N>(
    key: &ContextKey<V>,
    select: F,
    notify: N,
) -> Selector<V, S>
where
    V: Send + Sync + 'static,
    S: SameValue + Clone + Send + Sync + 'static,
    F: Fn(&V) -> S + Send + Sync + 'static,
    N: Fn(&S) + Send + Sync + 'static,
{
    let cell = try_use_context_cell(key).unwrap_or_else(|err| panic!("{err}"));
    Selector::attach_notify(&cell, select, notify)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_stack_tracks_depth() {
        assert_eq!(ProviderScope::depth(), 0);

        {
            let _outer = ProviderScope::enter();
            assert_eq!(ProviderScope::depth(), 1);

            {
                let _inner = ProviderScope::enter();
                assert_eq!(ProviderScope::depth(), 2);
            }

            assert_eq!(ProviderScope::depth(), 1);
        }

        assert_eq!(ProviderScope::depth(), 0);
    }

    #[test]
    fn plain_context_lookup() {
        let theme = ContextKey::<&'static str>::plain("theme");
        assert!(use_context(&theme).is_none());

        let scope = ProviderScope::enter();
        scope.provide(&theme, "dark");
        assert_eq!(use_context(&theme).as_deref(), Some(&"dark"));

        drop(scope);
        assert!(use_context(&theme).is_none());
    }

    #[test]
    fn nested_scope_shadows_outer() {
        let size = ContextKey::<u32>::selectable("size");

        let outer = ProviderScope::enter();
        outer.provide(&size, 1);

        {
            let inner = ProviderScope::enter();
            inner.provide(&size, 2);
            assert_eq!(use_context(&size).as_deref(), Some(&2));
        }

        assert_eq!(use_context(&size).as_deref(), Some(&1));
    }

    #[test]
    fn reproviding_publishes_to_selectors() {
        let count = ContextKey::<(u32, u32)>::selectable("count");
        let scope = ProviderScope::enter();
        scope.provide(&count, (0, 0));

        let left = use_context_selector(&count, |pair: &(u32, u32)| pair.0);
        let right = use_context_selector(&count, |pair: &(u32, u32)| pair.1);

        scope.provide(&count, (1, 0));
        assert_eq!(left.revision(), 1);
        assert_eq!(right.revision(), 0);
        assert_eq!(left.get(), 1);
    }

    #[test]
    fn selecting_plain_context_is_an_error() {
        let plain = ContextKey::<u32>::plain("plain");
        let scope = ProviderScope::enter();
        scope.provide(&plain, 3);

        let err = try_use_context_selector(&plain, |v: &u32| *v).unwrap_err();
        assert_eq!(err, ContextError::NotSelectable { name: "plain" });
    }

    #[test]
    #[should_panic(expected = "use_context_selector requires a selectable context")]
    fn use_context_selector_panics_on_plain_context() {
        let plain = ContextKey::<u32>::plain("plain");
        let scope = ProviderScope::enter();
        scope.provide(&plain, 3);

        let _selector = use_context_selector(&plain, |v: &u32| *v);
    }

    #[test]
    fn missing_provider_is_an_error() {
        let key = ContextKey::<u32>::selectable("absent");
        let err = try_use_context_selector(&key, |v: &u32| *v).unwrap_err();
        assert_eq!(err, ContextError::MissingProvider { name: "absent" });
    }

    #[test]
    fn exiting_scope_closes_its_cells() {
        let key = ContextKey::<u32>::selectable("closing");
        let scope = ProviderScope::enter();
        scope.provide(&key, 1);

        let cell = try_use_context_cell(&key).expect("provided above");
        let selector = Selector::attach(&cell, |v: &u32| *v);
        selector.detach();

        drop(scope);
        assert!(cell.is_closed());
    }

    #[test]
    fn out_of_order_exit_removes_only_its_own_frame() {
        let outer_key = ContextKey::<u32>::selectable("outer");
        let inner_key = ContextKey::<u32>::selectable("inner");

        let outer = ProviderScope::enter();
        outer.provide(&outer_key, 1);
        let inner = ProviderScope::enter();
        inner.provide(&inner_key, 2);

        let outer_cell = try_use_context_cell(&outer_key).expect("provided above");
        let inner_cell = try_use_context_cell(&inner_key).expect("provided above");

        drop(outer);

        assert_eq!(ProviderScope::depth(), 1);
        assert!(outer_cell.is_closed());
        assert!(!inner_cell.is_closed());
        assert!(use_context(&outer_key).is_none());
        assert_eq!(use_context(&inner_key).as_deref(), Some(&2));

        // The surviving scope still owns its frame.
        inner.provide(&inner_key, 3);
        assert_eq!(*inner_cell.get(), 3);

        drop(inner);
        assert_eq!(ProviderScope::depth(), 0);
        assert!(inner_cell.is_closed());
    }
}
