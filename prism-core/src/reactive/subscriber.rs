//! Observer types for shared cells.
//!
//! An Observer is a callback registered on a cell's dispatcher. A
//! Subscription is the token handed back to whoever registered it; dropping
//! or unsubscribing the token removes the observer again.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Unique identifier for an observer.
///
/// Each observer (selector subscription or raw callback) gets a unique ID
/// when registered. The dispatcher keys its registry by this ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback invoked with the newly published value.
pub type ObserverFn<V> = Box<dyn Fn(&Arc<V>) + Send + Sync>;

/// A registered callback on a cell.
///
/// The `active` flag is cleared when the observer is removed. A dispatch
/// that snapshotted the observer before removal checks the flag and skips
/// it, so removal takes effect immediately even mid-dispatch.
pub struct Observer<V> {
    id: SubscriberId,
    active: AtomicBool,
    callback: ObserverFn<V>,
}

impl<V> Observer<V> {
    /// Create a new observer with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Arc<V>) + Send + Sync + 'static,
    {
        Self {
            id: SubscriberId::new(),
            active: AtomicBool::new(true),
            callback: Box::new(callback),
        }
    }

    /// Get the observer's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Whether the observer is still registered.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Mark the observer as removed. Later notifications are ignored.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Invoke the callback unless the observer was removed.
    ///
    /// Returns whether the callback ran.
    pub fn notify(&self, value: &Arc<V>) -> bool {
        if !self.is_active() {
            return false;
        }
        (self.callback)(value);
        true
    }
}

impl<V> fmt::Debug for Observer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Anything an observer can be removed from.
///
/// Implemented by the dispatcher so that a [`Subscription`] can hold a
/// type-erased weak reference back to it.
pub trait ObserverRegistry: Send + Sync {
    /// Remove the observer. Returns false if it was not registered.
    fn remove(&self, id: SubscriberId) -> bool;
}

/// Unsubscribe token returned by [`SharedCell::subscribe`](super::SharedCell::subscribe).
///
/// Dropping the token unsubscribes. `unsubscribe` is idempotent, and a token
/// that outlives its cell is harmless.
pub struct Subscription {
    id: SubscriberId,
    registry: Option<Weak<dyn ObserverRegistry>>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, registry: Weak<dyn ObserverRegistry>) -> Self {
        Self {
            id,
            registry: Some(registry),
        }
    }

    /// The ID of the observer this token controls.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Whether `unsubscribe` has not been called yet.
    pub fn is_active(&self) -> bool {
        self.registry.is_some()
    }

    /// Remove the observer from its cell.
    pub fn unsubscribe(&mut self) {
        if let Some(registry) = self.registry.take() {
            if let Some(registry) = registry.upgrade() {
                registry.remove(self.id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
