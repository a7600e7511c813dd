//! Selective Subscription Store
//!
//! This module implements the store that lets many independent observers
//! watch narrow slices of one shared value without being woken by changes to
//! the rest of it.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A [`SharedCell`] holds the current value and a registry of observers.
//! Publishing a new value replaces it and synchronously notifies every
//! observer.
//!
//! ## Selectors
//!
//! A [`Selector`] is an observer with a pure projection function. It caches
//! the last value it saw and the slice it selected from it, and tells its
//! owner about a publish only when the slice actually changed under
//! [`SameValue`] (shallow, reference-based equality).
//!
//! ## Provider scopes
//!
//! A [`ProviderScope`] makes values available by [`ContextKey`] to code that
//! runs inside it. Selectable keys are backed by a cell and can be watched
//! with [`use_context_selector`]; plain keys cannot.
//!
//! # Execution model
//!
//! Everything is synchronous. `publish` returns after every observer ran,
//! and observers may subscribe, unsubscribe or publish while they run. The
//! dispatcher snapshots its observer list at the start of each publish so
//! that such re-entrant calls never disturb the dispatch in progress.

mod cell;
mod context;
mod dispatcher;
mod equality;
mod selector;
mod subscriber;

pub use cell::SharedCell;
pub use context::{
    try_use_context_cell, try_use_context_selector, use_context, use_context_selector,
    use_context_selector_notify, ContextError, ContextKey, ContextKind, ProviderScope,
};
pub use dispatcher::Dispatcher;
pub use equality::SameValue;
pub use selector::{SelectError, Selector};
pub use subscriber::{Observer, ObserverRegistry, SubscriberId, Subscription};
