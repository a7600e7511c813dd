//! Prism Core
//!
//! This crate provides the state plumbing and tooling behind the Prism
//! component library. It implements:
//!
//! - A selective subscription store (shared cells, selectors, provider scopes)
//! - An ordered child registry for composite components
//! - The list context built from both
//! - A perf harness that profiles every story and reports ticks per iteration
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Shared value cells, notification dispatch and selectors
//! - `registry`: Mount-order registry of child items
//! - `list`: List selection state shared with its items
//! - `perf`: Scenario generation, profiler seam and HTML report
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! use prism_core::reactive::{SharedCell, Selector};
//!
//! #[derive(Clone)]
//! struct Form {
//!     name: Arc<str>,
//!     age: u32,
//! }
//!
//! let form = SharedCell::new(Form { name: "Ada".into(), age: 36 });
//!
//! // Watch only the age.
//! let wakeups = Arc::new(AtomicUsize::new(0));
//! let counter = wakeups.clone();
//! let age = Selector::attach_notify(&form, |f: &Form| f.age, move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! // Renaming leaves the age untouched, so the selector stays quiet.
//! form.update(|f| Form { name: "Grace".into(), ..f.clone() });
//! assert_eq!(wakeups.load(Ordering::SeqCst), 0);
//!
//! form.update(|f| Form { age: f.age + 1, ..f.clone() });
//! assert_eq!(wakeups.load(Ordering::SeqCst), 1);
//! assert_eq!(age.get(), 37);
//! ```

pub mod list;
pub mod perf;
pub mod reactive;
pub mod registry;
