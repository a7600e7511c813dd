//! Benchmarks for publish fan-out.
//!
//! Measures one publish against cells with many selectors, where either
//! every selector or a single one sees its slice change.
//!
//! Run with: cargo bench -p prism-core --bench dispatch

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use prism_core::list::{ListProps, ListProvider};
use prism_core::reactive::{Selector, SharedCell};

// =============================================================================
// Raw selectors
// =============================================================================

fn bench_selector_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch/selectors");

    for count in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("all_changed", count), &count, |b, &count| {
            let cell = SharedCell::new(0u64);
            let _selectors: Vec<_> = (0..count)
                .map(|_| Selector::attach(&cell, |v: &u64| *v))
                .collect();
            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                cell.publish(black_box(next));
            })
        });

        group.bench_with_input(BenchmarkId::new("none_changed", count), &count, |b, &count| {
            let cell = SharedCell::new(0u64);
            let _selectors: Vec<_> = (0..count)
                .map(|i| Selector::attach(&cell, move |v: &u64| *v == i as u64 + u64::MAX / 2))
                .collect();
            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                cell.publish(black_box(next));
            })
        });
    }

    group.finish();
}

// =============================================================================
// List selection
// =============================================================================

fn bench_list_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch/list");

    for count in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("move_selection", count), &count, |b, &count| {
            let list = ListProvider::new(ListProps {
                selectable: true,
                ..ListProps::default()
            });
            let _items: Vec<_> = (0..count).map(|_| list.mount_item()).collect();
            let mut index = 0usize;
            b.iter(|| {
                index = (index + 1) % count;
                list.item_click(black_box(index));
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_selector_fanout, bench_list_selection);
criterion_main!(benches);
