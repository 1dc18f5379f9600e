//! Benchmarks for shardcache operations

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use shardcache::storage::{ContentStore, FormatConfig};
use shardcache::{ByteCache, Config, Key, KeyDeriver, Sha256Deriver, ShardTree};
use tempfile::TempDir;

fn keys(count: usize) -> Vec<Key> {
    (0..count)
        .map(|i| Sha256Deriver.derive(&format!("https://example.com/{}", i)))
        .collect()
}

fn store_benchmarks(c: &mut Criterion) {
    let keys = keys(10_000);
    let format = FormatConfig::default();

    c.bench_function("store_upsert_10k", |b| {
        b.iter(|| {
            let mut store = ContentStore::new();
            for key in &keys {
                store.upsert(*key, vec![0u8; 64]).unwrap();
            }
            black_box(store.len())
        })
    });

    let mut store = ContentStore::new();
    for key in &keys {
        store.upsert(*key, vec![0u8; 64]).unwrap();
    }

    c.bench_function("store_lookup", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % keys.len();
            black_box(store.lookup(&keys[i]).unwrap())
        })
    });

    c.bench_function("store_serialize_10k", |b| {
        b.iter(|| black_box(store.serialize(&format).unwrap().len()))
    });

    let bytes = store.serialize(&format).unwrap();
    c.bench_function("store_deserialize_10k", |b| {
        b.iter(|| black_box(ContentStore::deserialize(&bytes, &format).unwrap().len()))
    });
}

fn tree_benchmarks(c: &mut Criterion) {
    let keys = keys(10_000);

    c.bench_function("tree_insert_10k_threshold_256", |b| {
        b.iter(|| {
            let mut tree = ShardTree::new(256, FormatConfig::default()).unwrap();
            for key in &keys {
                tree.insert(*key, vec![0u8; 64]).unwrap();
            }
            black_box(tree.stats().leaf_count)
        })
    });
}

fn cache_benchmarks(c: &mut Criterion) {
    let page = b"<html><body>benchmark page</body></html>".repeat(50);

    c.bench_function("cache_store_and_save_1k", |b| {
        b.iter_batched(
            || TempDir::new().unwrap(),
            |dir| {
                let config = Config::builder()
                    .data_dir(dir.path())
                    .split_threshold(128)
                    .build();
                let mut cache = ByteCache::open(config).unwrap();
                for i in 0..1000 {
                    cache.store(&format!("https://example.com/{}", i), &page).unwrap();
                }
                cache.close().unwrap();
            },
            BatchSize::PerIteration,
        )
    });
}

criterion_group!(benches, store_benchmarks, tree_benchmarks, cache_benchmarks);
criterion_main!(benches);
