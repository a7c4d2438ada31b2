// Index build and query latency for flat and HNSW indexes, plus end-to-end recommend
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use stylist::prelude::*;
use stylist_core::{IndexConfig, IndexEntry, IndexKind, Vector, VectorIndex};

const DIM: usize = 128;
const CATEGORIES: [&str; 5] = ["shirts", "dresses", "shoes", "jackets", "accessories"];
const WORDS: [&str; 12] = [
    "linen", "cotton", "summer", "slim", "relaxed", "leather", "floral", "striped", "wool", "denim", "silk", "running",
];

fn random_vector(rng: &mut StdRng, dim: usize) -> Vector {
    let data: Vec<f32> = (0..dim).map(|_| rng.random_range(-1.0f32..1.0f32)).collect();
    Vector::new(data)
}

fn random_entries(n: usize, dim: usize) -> Vec<IndexEntry> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|i| IndexEntry::new(format!("p{i:06}"), random_vector(&mut rng, dim)))
        .collect()
}

fn index_config(kind: IndexKind) -> IndexConfig {
    IndexConfig {
        kind,
        ..IndexConfig::default()
    }
}

fn random_catalog(n: usize) -> Catalog {
    let mut rng = StdRng::seed_from_u64(7);
    let products = (0..n)
        .map(|i| {
            let category = CATEGORIES[i % CATEGORIES.len()];
            let words: Vec<&str> = (0..4).map(|_| WORDS[rng.random_range(0..WORDS.len())]).collect();
            let description = format!("{} {}", words.join(" "), category);
            Product::new(format!("p{i:06}"), format!("Item {i}"), category, rng.random_range(10.0..200.0), description)
                .with_discount(f64::from(rng.random_range(0u8..60)))
                .with_popularity(rng.random_range(1.0..5.0), rng.random_range(0..500), rng.random_range(0.0..10.0))
        })
        .collect();
    Catalog::new(products).expect("generated catalog is valid")
}

fn benchmark_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    group.sample_size(10);

    for size in [1000, 10000].iter() {
        let entries = random_entries(*size, DIM);
        for kind in [IndexKind::Flat, IndexKind::Hnsw] {
            group.bench_with_input(BenchmarkId::new(format!("{kind:?}"), size), &entries, |b, entries| {
                b.iter(|| {
                    let index = VectorIndex::build(entries.clone(), index_config(kind)).unwrap();
                    black_box(index);
                });
            });
        }
    }

    group.finish();
}

fn benchmark_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    let entries = random_entries(10000, DIM);
    let mut rng = StdRng::seed_from_u64(1);
    let query = random_vector(&mut rng, DIM);

    for kind in [IndexKind::Flat, IndexKind::Hnsw] {
        let index = VectorIndex::build(entries.clone(), index_config(kind)).unwrap();
        for k in [10, 30].iter() {
            group.bench_with_input(BenchmarkId::new(format!("{kind:?}"), k), k, |b, &k| {
                b.iter(|| {
                    let hits = index.search(black_box(&query), k).unwrap();
                    black_box(hits);
                });
            });
        }
    }

    group.finish();
}

fn benchmark_recommend(c: &mut Criterion) {
    let mut group = c.benchmark_group("recommend");

    let stylist = Stylist::new(&StylistConfig::default(), Arc::new(HashEmbedder::new(DIM))).unwrap();
    stylist.load_catalog(random_catalog(5000)).unwrap();

    let query = Query::text("relaxed linen summer shirt");
    group.bench_function("semantic_k10", |b| {
        b.iter(|| {
            let result = stylist.recommend(black_box(&query), 10).unwrap();
            black_box(result);
        });
    });

    let filtered = Query::text("leather running shoes")
        .with_filters(ProductFilter::new().price_range(None, Some(80.0)).category("shoes"));
    group.bench_function("filtered_k10", |b| {
        b.iter(|| {
            let result = stylist.recommend(black_box(&filtered), 10).unwrap();
            black_box(result);
        });
    });

    let popular = stylist.engine();
    group.bench_function("popularity_k10", |b| {
        b.iter(|| {
            let result = popular.popularity(black_box(&ProductFilter::new()), 10).unwrap();
            black_box(result);
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_build, benchmark_search, benchmark_recommend);
criterion_main!(benches);
