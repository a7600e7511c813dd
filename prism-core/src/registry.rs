//! Ordered Child Registry
//!
//! List-style providers hand each mounted child a numeric index. The index is
//! the child's slot in the registry: registering an unknown child appends a
//! slot, registering a known child returns its existing slot.
//!
//! Slots are stable. Unregistering a child in the middle leaves an empty slot
//! behind, so no later child shifts down and a new child never receives an
//! index that a registered sibling still holds. Empty slots at the end are
//! trimmed, which lets their indices be issued again once nobody holds them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

/// Opaque mount identity of one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildToken(u64);

impl ChildToken {
    /// Generate a new unique token.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ChildToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Children in registration order.
#[derive(Default, Clone)]
pub struct ChildRegistry {
    /// `None` marks the slot of an unregistered child.
    slots: SmallVec<[Option<ChildToken>; 8]>,
}

impl ChildRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a child and return its index.
    ///
    /// Registering the same token again returns the same index.
    pub fn register(&mut self, token: ChildToken) -> usize {
        if let Some(index) = self.index_of(token) {
            return index;
        }
        self.slots.push(Some(token));
        self.slots.len() - 1
    }

    /// Remove a child. Returns the index it had, or `None` if unknown.
    pub fn unregister(&mut self, token: ChildToken) -> Option<usize> {
        let index = self.index_of(token)?;
        self.slots[index] = None;
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
        Some(index)
    }

    /// Index of a registered child.
    pub fn index_of(&self, token: ChildToken) -> Option<usize> {
        self.slots.iter().position(|slot| *slot == Some(token))
    }

    /// Number of registered children.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether no child is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Registered children in index order.
    pub fn iter(&self) -> impl Iterator<Item = ChildToken> + '_ {
        self.slots.iter().flatten().copied()
    }
}

impl fmt::Debug for ChildRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.slots.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let mut registry = ChildRegistry::new();
        let a = ChildToken::new();

        assert_eq!(registry.register(a), 0);
        assert_eq!(registry.register(a), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_children_get_distinct_indices() {
        let mut registry = ChildRegistry::new();
        let a = ChildToken::new();
        let b = ChildToken::new();

        assert_eq!(registry.register(a), 0);
        assert_eq!(registry.register(b), 1);
    }

    #[test]
    fn unregister_removes_by_identity() {
        let mut registry = ChildRegistry::new();
        let a = ChildToken::new();
        let b = ChildToken::new();
        registry.register(a);
        registry.register(b);

        assert_eq!(registry.unregister(a), Some(0));
        assert_eq!(registry.unregister(a), None);
        assert_eq!(registry.index_of(a), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn middle_removal_keeps_later_indices() {
        let mut registry = ChildRegistry::new();
        let a = ChildToken::new();
        let b = ChildToken::new();
        let c = ChildToken::new();
        registry.register(a);
        registry.register(b);
        assert_eq!(registry.register(c), 2);

        registry.unregister(b);

        assert_eq!(registry.index_of(c), Some(2));
        assert_eq!(registry.register(c), 2);
        assert_eq!(registry.iter().collect::<Vec<_>>(), vec![a, c]);

        // The freed middle slot is not handed to a newcomer.
        let d = ChildToken::new();
        assert_eq!(registry.register(d), 3);
    }

    #[test]
    fn trailing_slots_are_reused_once_free() {
        let mut registry = ChildRegistry::new();
        let a = ChildToken::new();
        let b = ChildToken::new();
        let c = ChildToken::new();
        registry.register(a);
        registry.register(b);
        registry.register(c);

        registry.unregister(b);
        registry.unregister(c);

        assert_eq!(registry.register(ChildToken::new()), 1);
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
    }

    #[test]
    fn unknown_token_is_a_noop() {
        let mut registry = ChildRegistry::new();
        registry.register(ChildToken::new());

        assert_eq!(registry.unregister(ChildToken::new()), None);
        assert_eq!(registry.len(), 1);
    }
}
