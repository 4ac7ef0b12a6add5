//! Benchmark: chain construction for a fan-out change
//!
//! One invoice is linked to `n` orders. Each order carries a short stack of
//! computed attributes on top of a grand total read across the link. The
//! measured step is the update of the invoice's quantity: graph build,
//! ordering and assembly. The executor discards the chain.
//!
//! Throughput "elements" are linked orders (`n`).
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

use ripple_core::index::InMemoryDependencyIndex;
use ripple_core::model::{Attribute, Collection, LinkInstance, LinkType, Owner, Record};
use ripple_core::store::InMemoryStore;
use ripple_core::task::{TaskChain, TaskExecutor};
use ripple_core::Engine;

const STACK_DEPTH: usize = 4;

struct Discard;

impl TaskExecutor for Discard {
    fn submit(&self, chain: TaskChain) {
        black_box(chain);
    }
}

fn build_engine(n: usize) -> Engine {
    let store = Arc::new(InMemoryStore::new());
    let engine = Engine::new(
        Arc::new(InMemoryDependencyIndex::new()),
        store.clone(),
        store.clone(),
        Arc::new(Discard),
    );

    let mut inv = Collection::new("inv", "Invoices");
    inv.attributes.push(
        Attribute::new("total", "Total").with_function("price * qty", &["collection:inv.price", "collection:inv.qty"]),
    );

    let mut orders = Collection::new("orders", "Orders");
    orders.attributes.push(
        Attribute::new("grand_total", "Grand total").with_function("sum", &["collection:inv.total@order_invoice"]),
    );
    let mut previous = "grand_total".to_string();
    for level in 0..STACK_DEPTH {
        let id = format!("level_{level}");
        let input = format!("collection:orders.{previous}");
        orders
            .attributes
            .push(Attribute::new(id.as_str(), id.as_str()).with_function("x + 1", &[input.as_str()]));
        previous = id;
    }

    store.put_collection(inv.clone());
    store.put_collection(orders.clone());
    store.put_link_type(LinkType::new("order_invoice", "Order invoices", ["orders", "inv"]));
    for owner in [Owner::from(inv), Owner::from(orders)] {
        for attribute in owner.computed_attributes() {
            engine
                .on_computed_attribute_defined(&owner, attribute)
                .expect("benchmark definitions are well formed");
        }
    }

    store.put_record(Record::new("r1", "inv").with("qty", json!(2)));
    for i in 0..n {
        let order = format!("o{i}");
        store.put_record(Record::new(order.as_str(), "orders"));
        store.put_link_instance(LinkInstance::new(format!("li{i}"), "order_invoice", [order.as_str(), "r1"]));
    }

    engine
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_build");
    let old = Record::new("r1", "inv").with("qty", json!(1));
    let new = Record::new("r1", "inv").with("qty", json!(2));

    for &n in &[10usize, 100, 1_000] {
        group.throughput(Throughput::Elements(n as u64));
        let engine = build_engine(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                engine
                    .on_record_updated(black_box(&old), black_box(&new))
                    .expect("in-memory stores do not fail")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fan_out);
criterion_main!(benches);
