use chrono::{Days, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Batch, OrderLine, Product, allocate};

fn product_with_shipments(sku: &str, batch_count: u32) -> Product {
    let today = Utc::now().date_naive();
    let mut product = Product::new(sku);
    for i in 0..batch_count {
        product.add_batch(Batch::new(
            format!("batch-{i:04}"),
            sku,
            100,
            Some(today + Days::new(u64::from(i))),
        ));
    }
    product
}

fn bench_allocate_small(c: &mut Criterion) {
    c.bench_function("domain/allocate_10_batches", |b| {
        b.iter_batched(
            || product_with_shipments("BENCH-WIDGET", 10),
            |mut product| {
                product.allocate(&OrderLine::new("BENCH-WIDGET", "order-1", 10));
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_allocate_many_batches(c: &mut Criterion) {
    c.bench_function("domain/allocate_1000_batches", |b| {
        b.iter_batched(
            || product_with_shipments("BENCH-WIDGET", 1000),
            |mut product| {
                product.allocate(&OrderLine::new("BENCH-WIDGET", "order-1", 10));
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_standalone_allocate(c: &mut Criterion) {
    let today = Utc::now().date_naive();
    c.bench_function("domain/standalone_allocate_100_batches", |b| {
        b.iter_batched(
            || {
                (0..100u32)
                    .map(|i| {
                        Batch::new(
                            format!("batch-{i:04}"),
                            "BENCH-WIDGET",
                            100,
                            Some(today + Days::new(u64::from(i))),
                        )
                    })
                    .collect::<Vec<_>>()
            },
            |mut batches| {
                allocate(&OrderLine::new("BENCH-WIDGET", "order-1", 10), &mut batches).unwrap();
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_change_batch_quantity_cascade(c: &mut Criterion) {
    c.bench_function("domain/change_batch_quantity_cascade", |b| {
        b.iter_batched(
            || {
                let mut product = Product::new("BENCH-WIDGET");
                product.add_batch(Batch::new("batch-0001", "BENCH-WIDGET", 1000, None));
                for i in 0..50 {
                    product.allocate(&OrderLine::new("BENCH-WIDGET", format!("order-{i}"), 10));
                }
                product
            },
            |mut product| {
                product
                    .change_batch_quantity(&"batch-0001".into(), 100)
                    .unwrap();
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_allocate_small,
    bench_allocate_many_batches,
    bench_standalone_allocate,
    bench_change_batch_quantity_cascade
);
criterion_main!(benches);
