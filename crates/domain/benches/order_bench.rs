use common::ProductId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{OrderLine, OrderService, ProductService, RegisterOrder, RegisterProduct};
use store::InMemoryStore;

const BENCH_STOCK: i64 = 1_000_000_000;

fn seed(rt: &tokio::runtime::Runtime, store: &InMemoryStore, count: usize) -> Vec<ProductId> {
    let service = ProductService::new(store.clone());
    rt.block_on(async {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let product = service
                .register_product(RegisterProduct {
                    name: format!("Bench item {i}"),
                    price: 500,
                    stock: BENCH_STOCK,
                    ..RegisterProduct::default()
                })
                .await
                .unwrap();
            ids.push(product.id);
        }
        ids
    })
}

fn bench_register_single_line(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let ids = seed(&rt, &store, 1);
    let service = OrderService::new(store);

    c.bench_function("domain/register_order_1_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .register_order(RegisterOrder::new(vec![OrderLine::new(ids[0], 1)]))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_register_many_lines(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let ids = seed(&rt, &store, 20);
    let service = OrderService::new(store);

    c.bench_function("domain/register_order_20_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let lines = ids.iter().map(|id| OrderLine::new(*id, 1)).collect();
                service
                    .register_order(RegisterOrder::new(lines).customer_name("bench"))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_rejected_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let ids = seed(&rt, &store, 1);
    let service = OrderService::new(store);

    c.bench_function("domain/register_order_rejected", |b| {
        b.iter(|| {
            rt.block_on(async {
                let lines = vec![OrderLine::new(ids[0], 1), OrderLine::new(ProductId::new(0), 1)];
                service
                    .register_order(RegisterOrder::new(lines))
                    .await
                    .unwrap_err();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_register_single_line,
    bench_register_many_lines,
    bench_rejected_order
);
criterion_main!(benches);
