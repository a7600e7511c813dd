//! Selector Subscription
//!
//! A Selector watches one derived slice of a shared cell and notifies its
//! owner only when that slice changes.
//!
//! # How Selectors Work
//!
//! 1. On attach, the selector runs once against the cell's current value and
//!    caches the `(value, selected)` pair.
//!
//! 2. On every publish, the cell hands the selector the new value:
//!    - the same `Arc` as the cached value: nothing to do;
//!    - otherwise the selector runs and its result is compared with the
//!      cached slice using [`SameValue`].
//!
//! 3. An unchanged slice only refreshes the cached value. A changed slice
//!    refreshes both, bumps the revision and notifies the owner.
//!
//! 4. A selector that fails leaves the cache untouched and is retried on the
//!    next publish. The failure is logged, never propagated.
//!
//! After every publish, `selected == select(value)` for the cached pair.

use std::error::Error;
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::cell::SharedCell;
use super::equality::SameValue;
use super::subscriber::Subscription;

/// Error produced by a fallible selector.
pub type SelectError = Box<dyn Error + Send + Sync>;

type SelectFn<V, S> = Box<dyn Fn(&V) -> Result<S, SelectError> + Send + Sync>;
type NotifyFn<S> = Box<dyn Fn(&S) + Send + Sync>;

/// The most recent input/output pair.
struct Cached<V, S> {
    value: Arc<V>,
    selected: S,
}

struct SelectorInner<V, S> {
    cell_id: u64,
    select: SelectFn<V, S>,
    notify: Option<NotifyFn<S>>,
    cached: Mutex<Cached<V, S>>,
    /// Number of change notifications so far.
    revision: AtomicU64,
}

impl<V, S> SelectorInner<V, S>
where
    S: SameValue + Clone,
{
    /// Handle a newly published value.
    fn on_publish(&self, next: &Arc<V>) {
        let changed = {
            let mut cached = self.cached.lock();
            if Arc::ptr_eq(&cached.value, next) {
                return;
            }

            match (self.select)(next) {
                Ok(selected) if selected.same_value(&cached.selected) => {
                    cached.value = Arc::clone(next);
                    return;
                }
                Ok(selected) => {
                    cached.value = Arc::clone(next);
                    cached.selected = selected.clone();
                    selected
                }
                Err(err) => {
                    debug!(cell = self.cell_id, error = %err, "selector failed; treating as unchanged");
                    return;
                }
            }
        };

        // Notify without holding the cache lock so the owner can read the
        // selector, detach it, or publish.
        self.revision.fetch_add(1, Ordering::SeqCst);
        if let Some(notify) = &self.notify {
            notify(&changed);
        }
    }
}

/// A subscription to one derived slice of a [`SharedCell`].
///
/// # Type Parameters
///
/// - `V`: The cell's value type.
/// - `S`: The selected slice. Compared with [`SameValue`], so objects and
///   callbacks should be selected as `Arc`s.
///
/// # Example
///
/// ```rust,ignore
/// let person = SharedCell::new(Person { first: "Ada".into(), age: 36 });
///
/// let first = Selector::attach_notify(
///     &person,
///     |p: &Person| p.first.clone(),
///     |name| println!("first name is now {name}"),
/// );
///
/// person.update(|p| Person { age: 37, ..p.clone() }); // silent
/// person.update(|p| Person { first: "Grace".into(), ..p.clone() }); // prints
/// ```
pub struct Selector<V, S>
where
    V: Send + Sync + 'static,
    S: SameValue + Clone + Send + Sync + 'static,
{
    inner: Arc<SelectorInner<V, S>>,
    subscription: Mutex<Option<Subscription>>,
}

impl<V, S> Selector<V, S>
where
    V: Send + Sync + 'static,
    S: SameValue + Clone + Send + Sync + 'static,
{
    /// Attach a selector whose owner polls [`revision`](Self::revision).
    pub fn attach<F>(cell: &SharedCell<V>, select: F) -> Self
    where
        F: Fn(&V) -> S + Send + Sync + 'static,
    {
        Self::build(cell, Box::new(move |value| Ok(select(value))), None)
            .unwrap_or_else(|_| unreachable!("infallible selector failed"))
    }

    /// Attach a selector that calls `notify` with each changed slice.
    pub fn attach_notify<F, N>(cell: &SharedCell<V>, select: F, notify: N) -> Self
    where
        F: Fn(&V) -> S + Send + Sync + 'static,
        N: Fn(&S) + Send + Sync + 'static,
    {
        Self::build(
            cell,
            Box::new(move |value| Ok(select(value))),
            Some(Box::new(notify)),
        )
        .unwrap_or_else(|_| unreachable!("infallible selector failed"))
    }

    /// Attach a fallible selector.
    ///
    /// An error from the initial evaluation is returned. Errors during later
    /// publishes are swallowed and count as "unchanged".
    pub fn try_attach<F, N>(cell: &SharedCell<V>, select: F, notify: N) -> Result<Self, SelectError>
    where
        F: Fn(&V) -> Result<S, SelectError> + Send + Sync + 'static,
        N: Fn(&S) + Send + Sync + 'static,
    {
        Self::build(cell, Box::new(select), Some(Box::new(notify)))
    }

    fn build(
        cell: &SharedCell<V>,
        select: SelectFn<V, S>,
        notify: Option<NotifyFn<S>>,
    ) -> Result<Self, SelectError> {
        let value = cell.get();
        let selected = select(&value)?;

        let inner = Arc::new(SelectorInner {
            cell_id: cell.id(),
            select,
            notify,
            cached: Mutex::new(Cached { value, selected }),
            revision: AtomicU64::new(0),
        });

        let observer = Arc::clone(&inner);
        let subscription = cell.subscribe(move |next| observer.on_publish(next));
        debug!(cell = cell.id(), subscriber = subscription.id().raw(), "selector attached");

        Ok(Self {
            inner,
            subscription: Mutex::new(Some(subscription)),
        })
    }

    /// Get the cached selected slice.
    pub fn get(&self) -> S {
        self.inner.cached.lock().selected.clone()
    }

    /// Get the number of change notifications delivered so far.
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::SeqCst)
    }

    /// Whether the selector is still registered on its cell.
    pub fn is_attached(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// ID of the cell this selector watches.
    pub fn cell_id(&self) -> u64 {
        self.inner.cell_id
    }

    /// Stop watching the cell. Idempotent.
    ///
    /// No notification reaches the owner after this returns, including from
    /// a dispatch that is already in progress.
    pub fn detach(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(mut subscription) = subscription {
            subscription.unsubscribe();
            debug!(cell = self.inner.cell_id, "selector detached");
        }
    }
}

impl<V, S> Drop for Selector<V, S>
where
    V: Send + Sync + 'static,
    S: SameValue + Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.detach();
    }
}

impl<V, S> Debug for Selector<V, S>
where
    V: Send + Sync + 'static,
    S: SameValue + Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("cell_id", &self.inner.cell_id)
            .field("selected", &self.get())
            .field("revision", &self.revision())
            .field("attached", &self.is_attached())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
