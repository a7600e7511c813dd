//! Integration Tests for the List Context
//!
//! These tests mount several items on one list and check which of them are
//! woken by selection changes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use prism_core::list::{ListItem, ListProps, ListProvider};

fn selectable() -> ListProps {
    ListProps {
        selectable: true,
        ..ListProps::default()
    }
}

/// Mount `n` items, each recording its wakeups under its own index.
fn mount_recorded(list: &ListProvider, n: usize) -> (Vec<ListItem>, Arc<Mutex<Vec<(usize, bool)>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let items = (0..n)
        .map(|i| {
            let log = log.clone();
            list.mount_item_notify(move |selected| log.lock().push((i, selected)))
        })
        .collect();
    (items, log)
}

/// Test that items receive their mount position as index.
#[test]
fn items_are_indexed_in_mount_order() {
    let list = ListProvider::new(selectable());
    let items: Vec<_> = (0..4).map(|_| list.mount_item()).collect();

    let indices: Vec<_> = items.iter().map(ListItem::index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(list.item_count(), 4);
}

/// Test that moving the selection wakes exactly the old and new item.
#[test]
fn selection_change_wakes_only_affected_items() {
    let list = ListProvider::new(selectable());
    let (items, log) = mount_recorded(&list, 6);

    items[1].click();
    assert_eq!(*log.lock(), vec![(1, true)]);

    log.lock().clear();
    items[4].click();

    let mut woken = log.lock().clone();
    woken.sort();
    assert_eq!(woken, vec![(1, false), (4, true)]);

    for (i, item) in items.iter().enumerate() {
        assert_eq!(item.is_selected(), i == 4);
        let expected_revision = match i {
            1 => 2,
            4 => 1,
            _ => 0,
        };
        assert_eq!(item.revision(), expected_revision, "item {i}");
    }
}

/// Test that clicking the selected item again wakes nobody.
#[test]
fn reselecting_is_silent() {
    let list = ListProvider::new(selectable());
    let (items, log) = mount_recorded(&list, 3);

    items[2].click();
    log.lock().clear();
    items[2].click();

    assert!(log.lock().is_empty());
}

/// Test that a non-selectable list ignores clicks entirely.
#[test]
fn clicks_on_plain_list_are_ignored() {
    let changes = Arc::new(AtomicUsize::new(0));
    let changes_clone = changes.clone();
    let list = ListProvider::new(ListProps::default()).on_selected_index_change(move |_| {
        changes_clone.fetch_add(1, Ordering::SeqCst);
    });
    let (items, log) = mount_recorded(&list, 2);

    items[0].click();

    assert_eq!(list.selected_index(), None);
    assert_eq!(changes.load(Ordering::SeqCst), 0);
    assert!(log.lock().is_empty());
}

/// Test that a controlled list reports clicks without moving the selection.
#[test]
fn controlled_list_reports_proposed_index() {
    let proposed = Arc::new(Mutex::new(Vec::new()));
    let proposed_clone = proposed.clone();
    let list = ListProvider::new(ListProps {
        selected_index: Some(0),
        ..selectable()
    })
    .on_selected_index_change(move |index| proposed_clone.lock().push(index));
    let (items, log) = mount_recorded(&list, 3);

    items[2].click();
    assert_eq!(*proposed.lock(), vec![2]);
    assert_eq!(list.selected_index(), Some(0));
    assert!(log.lock().is_empty());

    // The owner accepts the proposal by passing new props.
    list.set_props(ListProps {
        selected_index: Some(2),
        ..selectable()
    });
    let mut woken = log.lock().clone();
    woken.sort();
    assert_eq!(woken, vec![(0, false), (2, true)]);
}

/// Test that changing unrelated props does not wake any item.
#[test]
fn unrelated_prop_change_is_silent() {
    let list = ListProvider::new(ListProps {
        default_selected_index: Some(1),
        ..selectable()
    });
    let (items, log) = mount_recorded(&list, 3);
    assert!(items[1].is_selected());

    list.set_props(ListProps {
        truncate_content: true,
        ..selectable()
    });

    assert!(log.lock().is_empty());
    assert!(items[0].state().truncate_content);
    assert_eq!(list.selected_index(), Some(1));
}

/// Test that an unmounted item leaves the registry and the cell.
#[test]
fn unmounted_item_is_forgotten() {
    let list = ListProvider::new(selectable());
    let mut items: Vec<_> = (0..3).map(|_| list.mount_item()).collect();
    let observers = list.cell().observer_count();

    drop(items.remove(1));

    assert_eq!(list.item_count(), 2);
    assert_eq!(list.cell().observer_count(), observers - 1);

    // A later item is appended after the survivors.
    let late = list.mount_item();
    assert_eq!(late.index(), 3);
}

/// Test that an item mounted after a middle sibling unmounts never shares
/// an index with a surviving sibling.
#[test]
fn remount_after_middle_unmount_keeps_indices_unique() {
    let list = ListProvider::new(selectable());
    let a = list.mount_item();
    let b = list.mount_item();
    let c = list.mount_item();

    drop(b);
    let d = list.mount_item();

    assert_eq!((a.index(), c.index()), (0, 2));
    assert_ne!(d.index(), c.index());
    assert_ne!(d.index(), a.index());

    d.click();
    assert!(d.is_selected());
    assert!(!c.is_selected());
    assert!(!a.is_selected());

    c.click();
    assert!(c.is_selected());
    assert!(!d.is_selected());
}
