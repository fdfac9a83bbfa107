use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use domain::{Money, ProductId, ProductRecord};
use views::{AvailabilityIndex, BoundedRecencyCache};

fn bench_cache_get_hit(c: &mut Criterion) {
    let cache = BoundedRecencyCache::new(1_024).unwrap();
    for i in 0..1_024u64 {
        cache.put(i, i);
    }

    c.bench_function("cache/get_hit", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i = (i + 7) % 1_024;
            cache.get(&i)
        });
    });
}

fn bench_cache_put_with_eviction(c: &mut Criterion) {
    let cache = BoundedRecencyCache::new(256).unwrap();

    c.bench_function("cache/put_evicting", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            cache.put(i, i);
        });
    });
}

fn bench_index_decrement(c: &mut Criterion) {
    let id = ProductId::new("SKU-0");

    c.bench_function("index/decrement", |b| {
        b.iter_batched(
            || {
                AvailabilityIndex::from_records((0..1_000).map(|i| {
                    ProductRecord::new(format!("SKU-{i}"), "Item", Money::from_cents(100), 1_000)
                }))
            },
            |index| {
                for _ in 0..100 {
                    index.decrement(&id, 1).unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_cache_get_hit,
    bench_cache_put_with_eviction,
    bench_index_decrement
);
criterion_main!(benches);
