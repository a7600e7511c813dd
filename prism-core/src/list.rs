//! List context.
//!
//! A [`ListProvider`] publishes list-wide state (selection, display flags)
//! into a shared cell and hands out [`ListItem`]s. Each item registers with
//! the provider's child registry to learn its index, then watches only the
//! "is my index the selected one" slice of the state. Changing the selection
//! therefore wakes the previously selected item and the newly selected one,
//! and no other item.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::reactive::{Selector, SharedCell};
use crate::registry::{ChildRegistry, ChildToken};

/// Configuration of a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListProps {
    pub debug: bool,
    /// Items are choices; clicking one selects it.
    pub selectable: bool,
    /// Items can be navigated through.
    pub navigable: bool,
    pub truncate_content: bool,
    pub truncate_header: bool,
    pub horizontal: bool,
    /// Controlled selection. When set, clicks only report the proposed index.
    pub selected_index: Option<usize>,
    /// Initial selection of an uncontrolled list.
    pub default_selected_index: Option<usize>,
}

/// The value list items observe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListState {
    pub debug: bool,
    pub selectable: bool,
    pub navigable: bool,
    pub truncate_content: bool,
    pub truncate_header: bool,
    pub horizontal: bool,
    pub selected_index: Option<usize>,
}

impl ListState {
    fn from_props(props: &ListProps, selected_index: Option<usize>) -> Self {
        Self {
            debug: props.debug,
            selectable: props.selectable,
            navigable: props.navigable,
            truncate_content: props.truncate_content,
            truncate_header: props.truncate_header,
            horizontal: props.horizontal,
            selected_index,
        }
    }
}

type SelectionHandler = Arc<dyn Fn(usize) + Send + Sync>;

struct ListShared {
    cell: SharedCell<ListState>,
    registry: Mutex<ChildRegistry>,
    controlled: AtomicBool,
    on_selected_index_change: Mutex<Option<SelectionHandler>>,
}

impl ListShared {
    fn item_click(&self, index: usize) {
        let state = self.cell.get();
        if !state.selectable {
            return;
        }

        if !self.controlled.load(Ordering::SeqCst) {
            self.cell.publish(ListState {
                selected_index: Some(index),
                ..(*state).clone()
            });
        }

        let handler = self.on_selected_index_change.lock().clone();
        if let Some(handler) = handler {
            handler(index);
        }
    }
}

/// Owner of a list's shared state.
pub struct ListProvider {
    shared: Arc<ListShared>,
}

impl ListProvider {
    /// Create a list whose selection starts from `props`.
    pub fn new(props: ListProps) -> Self {
        let selected = props.selected_index.or(props.default_selected_index);
        let state = ListState::from_props(&props, selected);

        Self {
            shared: Arc::new(ListShared {
                cell: SharedCell::new(state),
                registry: Mutex::new(ChildRegistry::new()),
                controlled: AtomicBool::new(props.selected_index.is_some()),
                on_selected_index_change: Mutex::new(None),
            }),
        }
    }

    /// Set the handler called with the proposed index when an item of a
    /// selectable list is clicked.
    pub fn on_selected_index_change<F>(self, handler: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        *self.shared.on_selected_index_change.lock() = Some(Arc::new(handler));
        self
    }

    /// Replace the props and republish the state.
    ///
    /// An uncontrolled list keeps its current selection.
    pub fn set_props(&self, props: ListProps) {
        let controlled = props.selected_index.is_some();
        self.shared.controlled.store(controlled, Ordering::SeqCst);

        let selected = if controlled {
            props.selected_index
        } else {
            self.shared.cell.get().selected_index
        };
        self.shared
            .cell
            .publish(ListState::from_props(&props, selected));
    }

    /// Click the item at `index`.
    pub fn item_click(&self, index: usize) {
        self.shared.item_click(index);
    }

    /// Current shared state.
    pub fn state(&self) -> Arc<ListState> {
        self.shared.cell.get()
    }

    /// Index of the selected item, if any.
    pub fn selected_index(&self) -> Option<usize> {
        self.state().selected_index
    }

    /// The cell items observe.
    pub fn cell(&self) -> &SharedCell<ListState> {
        &self.shared.cell
    }

    /// Number of mounted items.
    pub fn item_count(&self) -> usize {
        self.shared.registry.lock().len()
    }

    /// Mount an item whose owner polls [`ListItem::revision`].
    pub fn mount_item(&self) -> ListItem {
        self.mount(None)
    }

    /// Mount an item that calls `notify` whenever its selected flag flips.
    pub fn mount_item_notify<F>(&self, notify: F) -> ListItem
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.mount(Some(Box::new(notify)))
    }

    fn mount(&self, notify: Option<Box<dyn Fn(bool) + Send + Sync>>) -> ListItem {
        let token = ChildToken::new();
        let index = self.shared.registry.lock().register(token);

        let is_selected = move |state: &ListState| state.selected_index == Some(index);
        let selected = match notify {
            Some(notify) => Selector::attach_notify(&self.shared.cell, is_selected, move |s: &bool| notify(*s)),
            None => Selector::attach(&self.shared.cell, is_selected),
        };
        debug!(index, "list item mounted");

        ListItem {
            token,
            index,
            selected,
            shared: Arc::clone(&self.shared),
        }
    }
}

impl fmt::Debug for ListProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListProvider")
            .field("state", &self.state())
            .field("item_count", &self.item_count())
            .finish()
    }
}

/// One mounted list item.
pub struct ListItem {
    token: ChildToken,
    index: usize,
    selected: Selector<ListState, bool>,
    shared: Arc<ListShared>,
}

impl ListItem {
    /// Index assigned at mount.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether this item is the selected one.
    pub fn is_selected(&self) -> bool {
        self.selected.get()
    }

    /// Number of times the selected flag changed.
    pub fn revision(&self) -> u64 {
        self.selected.revision()
    }

    /// Click this item.
    pub fn click(&self) {
        self.shared.item_click(self.index);
    }

    /// Current list state.
    pub fn state(&self) -> Arc<ListState> {
        self.shared.cell.get()
    }
}

impl Drop for ListItem {
    fn drop(&mut self) {
        self.selected.detach();
        self.shared.registry.lock().unregister(self.token);
    }
}

impl fmt::Debug for ListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListItem")
            .field("index", &self.index)
            .field("selected", &self.is_selected())
            .finish()
    }
}
