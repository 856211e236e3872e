use common::{LineItems, Money, PaymentMethod};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use domain::{OrderProcessor, OrderRequest};
use order_store::{InMemoryOrderStore, Product};

fn seeded_processor(
    rt: &tokio::runtime::Runtime,
    product_count: usize,
) -> OrderProcessor<InMemoryOrderStore> {
    let store = rt.block_on(InMemoryOrderStore::with_products((0..product_count).map(
        |i| Product::new(format!("SKU-{i:03}"), format!("Product {i}"), i32::MAX),
    )));
    OrderProcessor::new(store)
}

fn request(line_items: usize) -> OrderRequest {
    let products: LineItems = (0..line_items)
        .map(|i| common::LineItem::new(format!("SKU-{i:03}"), 1))
        .collect();
    OrderRequest::new(products, Money::from_cents(1000), PaymentMethod::Card)
}

fn bench_validate(c: &mut Criterion) {
    let req = request(50);

    c.bench_function("domain/validate_50_line_items", |b| {
        b.iter(|| req.validate().unwrap());
    });
}

fn bench_place_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("domain/place_order");

    for line_items in [1, 10, 50] {
        let processor = seeded_processor(&rt, line_items);
        let req = request(line_items);

        group.bench_with_input(
            BenchmarkId::from_parameter(line_items),
            &line_items,
            |b, _| {
                b.iter(|| {
                    rt.block_on(async { processor.place_order(req.clone()).await.unwrap() });
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_validate, bench_place_order);
criterion_main!(benches);
