//! # Bizframe Object Benchmarks
//!
//! Hot paths of the lifecycle engine:
//!
//! | Area | Operation | Target |
//! |------|-----------|--------|
//! | Properties | `set_property` with rules | < 10µs |
//! | Undo | `begin_edit` / `cancel_edit` on a 100-line graph | < 1ms |
//! | Rules | `check_rules` on a customer | < 20µs |
//! | Lists | `add` of a child line | < 10µs |

use bizframe_core::{ApplicationContext, BusinessList, FrameworkConfig};
use bizframe_tests::fixtures::{customer, order_line};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

fn bench_context() -> Arc<ApplicationContext> {
    Arc::new(ApplicationContext::new(FrameworkConfig::default()).unwrap())
}

// ============================================================================
// PROPERTIES
// ============================================================================

fn bench_set_property(c: &mut Criterion) {
    let mut group = c.benchmark_group("properties");
    let ctx = bench_context();
    let customer = customer(&ctx);
    let mut rng = rand::thread_rng();

    group.bench_function("set_property_with_rules", |b| {
        b.iter(|| {
            let name = format!("Customer {}", rng.gen_range(0..1_000));
            customer.set_property("Name", black_box(name)).unwrap();
        })
    });

    group.bench_function("read_property", |b| {
        b.iter(|| black_box(customer.read_property("Name").unwrap()))
    });

    let line = order_line(&ctx, "Anvil", 1);
    line.load_property("Price", 3).unwrap();
    group.bench_function("set_property_computed_total", |b| {
        b.iter(|| {
            let quantity: i64 = rng.gen_range(1..50);
            line.set_property("Quantity", black_box(quantity)).unwrap();
        })
    });
    group.finish();
}

// ============================================================================
// UNDO
// ============================================================================

fn bench_edit_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("undo");
    group.measurement_time(Duration::from_secs(5));

    for size in [10usize, 100] {
        let ctx = bench_context();
        let root = customer(&ctx);
        root.set_property("Name", "Acme").unwrap();
        let orders = BusinessList::new(&ctx);
        root.set_property("Orders", orders.clone()).unwrap();
        for i in 0..size {
            orders.add(order_line(&ctx, &format!("P{i}"), 1)).unwrap();
        }

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("begin_cancel", size), &size, |b, _| {
            b.iter(|| {
                root.begin_edit().unwrap();
                root.set_property("Email", "bench@acme.io").unwrap();
                root.cancel_edit();
            })
        });
        group.bench_with_input(BenchmarkId::new("begin_apply", size), &size, |b, _| {
            b.iter(|| {
                root.begin_edit().unwrap();
                root.apply_edit();
            })
        });
    }
    group.finish();
}

// ============================================================================
// RULES AND LISTS
// ============================================================================

fn bench_check_rules(c: &mut Criterion) {
    let ctx = bench_context();
    let customer = customer(&ctx);
    customer.set_property("Email", "a@b.io").unwrap();

    c.bench_function("check_rules_customer", |b| {
        b.iter(|| customer.check_rules().unwrap())
    });
}

fn bench_list_add(c: &mut Criterion) {
    let ctx = bench_context();
    let root = customer(&ctx);
    let orders = BusinessList::new(&ctx);
    root.set_property("Orders", orders.clone()).unwrap();

    c.bench_function("list_add_remove", |b| {
        b.iter(|| {
            orders.add(order_line(&ctx, "Widget", 2)).unwrap();
            black_box(orders.remove_at(0).unwrap());
        })
    });
}

criterion_group!(
    benches,
    bench_set_property,
    bench_edit_cycle,
    bench_check_rules,
    bench_list_add
);
criterion_main!(benches);
