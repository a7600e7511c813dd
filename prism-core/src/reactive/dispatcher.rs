//! Notification Dispatcher
//!
//! The dispatcher owns a cell's observer registry and fans a published value
//! out to every registered observer.
//!
//! # Re-entrancy
//!
//! Observers run synchronously inside `dispatch`, and an observer is allowed
//! to subscribe or unsubscribe other observers (or itself) while it runs.
//! To keep the in-progress dispatch stable:
//!
//! 1. The observer list is copied into a snapshot at the start of the call
//!    and the registry lock is released before any callback runs.
//!
//! 2. Observers added during the dispatch are not in the snapshot, so they
//!    first hear about the *next* publish.
//!
//! 3. Observers removed during the dispatch are deactivated on removal, so a
//!    snapshot entry that has not been visited yet is skipped.
//!
//! 4. An observer that publishes again starts a nested dispatch, which
//!    delivers the newer value to every registered observer. Each dispatch
//!    takes a generation number; once a newer one has started, the outer
//!    dispatch stops instead of handing the stale value to the rest.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::trace;

use super::subscriber::{Observer, ObserverRegistry, SubscriberId};

/// Snapshot of observers taken at the start of a dispatch.
type Snapshot<V> = SmallVec<[Arc<Observer<V>>; 8]>;

/// Observer registry plus synchronous fan-out.
pub struct Dispatcher<V> {
    /// Registered observers in registration order.
    observers: Mutex<IndexMap<SubscriberId, Arc<Observer<V>>>>,

    /// Bumped at the start of every dispatch.
    generation: AtomicU64,
}

impl<V> Dispatcher<V> {
    /// Create a dispatcher with no observers.
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(IndexMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Register an observer.
    pub fn insert(&self, observer: Observer<V>) -> SubscriberId {
        let id = observer.id();
        self.observers.lock().insert(id, Arc::new(observer));
        id
    }

    /// Remove and deactivate an observer.
    ///
    /// Returns false if the observer was not registered.
    pub fn remove_observer(&self, id: SubscriberId) -> bool {
        // shift_remove keeps the remaining observers in registration order.
        let removed = self.observers.lock().shift_remove(&id);
        match removed {
            Some(observer) => {
                observer.deactivate();
                true
            }
            None => false,
        }
    }

    /// Remove and deactivate every observer. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = self.observers.lock().drain(..).collect();
        for (_, observer) in &drained {
            observer.deactivate();
        }
        drained.len()
    }

    /// Notify every observer registered when the call began.
    ///
    /// Stops early if an observer starts a newer dispatch. Returns the number
    /// of observers that were actually invoked.
    pub fn dispatch(&self, value: &Arc<V>) -> usize {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot: Snapshot<V> = self.observers.lock().values().cloned().collect();

        let mut notified = 0;
        for observer in &snapshot {
            if self.generation.load(Ordering::SeqCst) != generation {
                trace!(generation, notified, "dispatch superseded by a newer publish");
                return notified;
            }
            if observer.notify(value) {
                notified += 1;
            }
        }

        trace!(
            snapshot = snapshot.len(),
            notified,
            "dispatched value to observers"
        );
        notified
    }

    /// Get the number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    /// Whether no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the given observer is currently registered.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.observers.lock().contains_key(&id)
    }
}

impl<V> Default for Dispatcher<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ObserverRegistry for Dispatcher<V>
where
    V: Send + Sync,
{
    fn remove(&self, id: SubscriberId) -> bool {
        self.remove_observer(id)
    }
}

impl<V> fmt::Debug for Dispatcher<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("observer_count", &self.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_observer(counter: &Arc<AtomicUsize>) -> Observer<i32> {
        let counter = counter.clone();
        Observer::new(move |_: &Arc<i32>| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn dispatch_reaches_every_observer() {
        let dispatcher = Dispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));

        dispatcher.insert(counting_observer(&count));
        dispatcher.insert(counting_observer(&count));
        dispatcher.insert(counting_observer(&count));

        assert_eq!(dispatcher.dispatch(&Arc::new(1)), 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn dispatch_preserves_registration_order() {
        let dispatcher = Dispatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let order = order.clone();
            dispatcher.insert(Observer::new(move |_: &Arc<i32>| order.lock().push(tag)));
        }

        dispatcher.dispatch(&Arc::new(0));
        assert_eq!(*order.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn removed_observer_is_not_notified() {
        let dispatcher = Dispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));

        let id = dispatcher.insert(counting_observer(&count));
        assert!(dispatcher.remove_observer(id));
        assert!(!dispatcher.remove_observer(id));

        assert_eq!(dispatcher.dispatch(&Arc::new(1)), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn observer_added_mid_dispatch_waits_for_next_dispatch() {
        let dispatcher = Arc::new(Dispatcher::new());
        let late_calls = Arc::new(AtomicUsize::new(0));

        let dispatcher_clone = dispatcher.clone();
        let late_clone = late_calls.clone();
        let added = Arc::new(AtomicUsize::new(0));
        let added_clone = added.clone();
        dispatcher.insert(Observer::new(move |_: &Arc<i32>| {
            if added_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                dispatcher_clone.insert(counting_observer(&late_clone));
            }
        }));

        assert_eq!(dispatcher.dispatch(&Arc::new(1)), 1);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.len(), 2);

        assert_eq!(dispatcher.dispatch(&Arc::new(2)), 2);
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observer_removed_mid_dispatch_is_skipped() {
        let dispatcher = Arc::new(Dispatcher::new());
        let count = Arc::new(AtomicUsize::new(0));

        let victim = Arc::new(Mutex::new(None::<SubscriberId>));
        let dispatcher_clone = dispatcher.clone();
        let victim_clone = victim.clone();
        dispatcher.insert(Observer::new(move |_: &Arc<i32>| {
            if let Some(id) = victim_clone.lock().take() {
                dispatcher_clone.remove_observer(id);
            }
        }));
        let before = dispatcher.insert(counting_observer(&count));
        let target = dispatcher.insert(counting_observer(&count));
        *victim.lock() = Some(target);

        // The first observer removes `target` before it is visited; `before`
        // is still notified.
        assert_eq!(dispatcher.dispatch(&Arc::new(1)), 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(dispatcher.contains(before));
        assert!(!dispatcher.contains(target));
    }

    #[test]
    fn clear_deactivates_everything() {
        let dispatcher = Dispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));
        dispatcher.insert(counting_observer(&count));
        dispatcher.insert(counting_observer(&count));

        assert_eq!(dispatcher.clear(), 2);
        assert!(dispatcher.is_empty());
        assert_eq!(dispatcher.dispatch(&Arc::new(1)), 0);
    }

    #[test]
    fn nested_dispatch_supersedes_outer() {
        let dispatcher = Arc::new(Dispatcher::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        {
            let inner = Arc::downgrade(&dispatcher);
            dispatcher.insert(Observer::new(move |v: &Arc<i32>| {
                if **v == 1 {
                    if let Some(dispatcher) = inner.upgrade() {
                        dispatcher.dispatch(&Arc::new(2));
                    }
                }
            }));
        }
        {
            let seen = seen.clone();
            dispatcher.insert(Observer::new(move |v: &Arc<i32>| seen.lock().push(**v)));
        }

        // The outer call only reached the republishing observer.
        assert_eq!(dispatcher.dispatch(&Arc::new(1)), 1);
        assert_eq!(*seen.lock(), vec![2]);
    }
}
