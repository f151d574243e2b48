use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use stockline_core::{BatchId, ProductId};
use stockline_inventory::{allocate, AllocationPolicy, Batch};

/// `count` batches of 25 units each, expiring one day apart.
fn batches(count: usize) -> Vec<Batch> {
    let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    (0..count)
        .map(|i| {
            Batch::new(
                BatchId::new(i as i64 + 1),
                25,
                start + chrono::Duration::days(i as i64),
            )
        })
        .collect()
}

fn bench_allocation_by_batch_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation_by_batch_count");

    for count in [1, 10, 100, 1000].iter() {
        let stock = batches(*count);
        // Draw roughly half the stock so the scan stops midway.
        let requested = (*count as i64 * 25) / 2 + 1;

        group.throughput(Throughput::Elements(*count as u64));
        for policy in AllocationPolicy::ALL {
            group.bench_with_input(
                BenchmarkId::new(policy.as_str(), count),
                &stock,
                |b, stock| {
                    b.iter(|| {
                        black_box(allocate(ProductId::new(1), black_box(stock), requested, policy)).ok();
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_shortfall_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("shortfall_detection");
    let stock = batches(1000);
    let requested = 1000 * 25 + 1;

    group.bench_function("full_scan_shortfall", |b| {
        b.iter(|| {
            black_box(allocate(ProductId::new(1), black_box(&stock), requested, AllocationPolicy::Fefo)).err();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_allocation_by_batch_count, bench_shortfall_detection);
criterion_main!(benches);
