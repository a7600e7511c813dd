//! Shared Value Cell
//!
//! A SharedCell holds one shared value and the observers interested in it.
//! It is the coarse-grained broadcast primitive underneath selectors.
//!
//! # How Cells Work
//!
//! 1. A producer publishes a new value. The cell replaces its current value.
//!
//! 2. The cell's dispatcher synchronously notifies every observer that was
//!    registered when the publish began, in registration order.
//!
//! 3. `publish` returns only after every observer has run. There is no
//!    scheduling or batching inside the cell.
//!
//! # Identity
//!
//! Values are stored behind an `Arc`. Two values are "the same reference"
//! exactly when `Arc::ptr_eq` holds, which is what selectors use for their
//! fast path. `publish` always allocates a fresh `Arc`; `publish_shared`
//! lets a producer re-publish an `Arc` it already holds.
//!
//! # Lifecycle
//!
//! A cell lives as long as its provider scope. `close` ends it: observers
//! still registered at that point are removed (and logged, because they
//! should have been detached first), and later publishes panic.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{trace, warn};

use super::dispatcher::Dispatcher;
use super::subscriber::{Observer, ObserverRegistry, Subscription};

/// Counter for generating unique cell IDs.
static CELL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique cell ID.
fn next_cell_id() -> u64 {
    CELL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A shared value plus its observer registry.
///
/// # Type Parameters
///
/// - `V`: The type of value stored in the cell. Opaque to the cell.
///
/// # Example
///
/// ```rust,ignore
/// let cell = SharedCell::new(Person { first: "Ada".into(), last: "Lovelace".into() });
///
/// let _sub = cell.subscribe(|person| println!("now {}", person.first));
///
/// cell.update(|p| Person { first: "Grace".into(), ..p.clone() });
/// // Prints: "now Grace"
/// ```
pub struct SharedCell<V>
where
    V: Send + Sync + 'static,
{
    /// Unique identifier for this cell.
    id: u64,

    /// The current value.
    value: Arc<RwLock<Arc<V>>>,

    /// Observer registry and fan-out.
    dispatcher: Arc<Dispatcher<V>>,

    /// Set once the owning scope has ended.
    closed: Arc<AtomicBool>,
}

impl<V> SharedCell<V>
where
    V: Send + Sync + 'static,
{
    /// Create a new cell with the given initial value and no observers.
    pub fn new(initial: V) -> Self {
        Self::from_shared(Arc::new(initial))
    }

    /// Create a new cell around an already shared value.
    pub fn from_shared(initial: Arc<V>) -> Self {
        Self {
            id: next_cell_id(),
            value: Arc::new(RwLock::new(initial)),
            dispatcher: Arc::new(Dispatcher::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the cell's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the current value.
    pub fn get(&self) -> Arc<V> {
        Arc::clone(&self.value.read())
    }

    /// Replace the value and notify observers.
    ///
    /// # Panics
    ///
    /// Panics if the cell has been closed.
    pub fn publish(&self, value: V) {
        self.publish_shared(Arc::new(value));
    }

    /// Replace the value with an already shared one and notify observers.
    ///
    /// Publishing the `Arc` the cell already holds still dispatches, but
    /// selectors take their identity fast path and do not re-run.
    ///
    /// # Panics
    ///
    /// Panics if the cell has been closed.
    pub fn publish_shared(&self, value: Arc<V>) {
        assert!(
            !self.is_closed(),
            "publish on closed cell {}",
            self.id
        );

        // The write guard must be gone before observers run: they may read
        // the cell or publish again.
        *self.value.write() = Arc::clone(&value);

        let notified = self.dispatcher.dispatch(&value);
        trace!(cell = self.id, notified, "published");
    }

    /// Publish a value computed from the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&V) -> V,
    {
        let next = {
            let current = self.get();
            f(&current)
        };
        self.publish(next);
    }

    /// Register a callback invoked with every newly published value.
    ///
    /// The returned token unsubscribes when dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Arc<V>) + Send + Sync + 'static,
    {
        let id = self.dispatcher.insert(Observer::new(callback));
        let registry: Weak<dyn ObserverRegistry> =
            Arc::downgrade(&self.dispatcher) as Weak<dyn ObserverRegistry>;
        Subscription::new(id, registry)
    }

    /// Get the number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.dispatcher.len()
    }

    /// End the cell's lifecycle.
    ///
    /// Observers still registered are removed and will never be called.
    /// Closing twice is a no-op.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let dangling = self.dispatcher.clear();
        if dangling > 0 {
            warn!(
                cell = self.id,
                dangling, "cell closed with observers still registered"
            );
        }
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl<V> Clone for SharedCell<V>
where
    V: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            dispatcher: Arc::clone(&self.dispatcher),
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<V> Debug for SharedCell<V>
where
    V: Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCell")
            .field("id", &self.id)
            .field("value", &self.get())
            .field("observer_count", &self.observer_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
