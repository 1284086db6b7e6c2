//! Throughput benchmarks for the store and the request decoder.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use emberkv::protocol::decode_command;
use emberkv::storage::Store;

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let store = Store::new();

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store.set(format!("key:{}", i), "small_value".to_string());
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = "x".repeat(1024); // 1KB value
        b.iter(|| {
            store.set(format!("key:{}", i), value.clone());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let store = Store::new();

    // Pre-populate with data
    for i in 0..100_000 {
        store.set(format!("key:{}", i), format!("value:{}", i));
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("key:{}", i % 100_000)));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("missing:{}", i)));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark INCR operations
fn bench_incr(c: &mut Criterion) {
    let store = Store::new();

    let mut group = c.benchmark_group("incr");
    group.throughput(Throughput::Elements(1));

    group.bench_function("single_counter", |b| {
        b.iter(|| {
            black_box(store.incr("counter").unwrap());
        });
    });

    group.bench_function("multiple_counters", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.incr(&format!("counter:{}", i % 1000)).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark KEYS pattern matching
fn bench_keys(c: &mut Criterion) {
    let store = Store::new();

    // Pre-populate with various key patterns
    for i in 0..1_000 {
        store.set(format!("user:{}", i), "user_data".to_string());
        store.set(format!("session:{}", i), "session_data".to_string());
        store.set(format!("cache:{}", i), "cache_data".to_string());
    }

    let mut group = c.benchmark_group("keys");

    group.bench_function("keys_pattern", |b| {
        b.iter(|| {
            black_box(store.keys("user:*"));
        });
    });

    group.bench_function("keys_all", |b| {
        b.iter(|| {
            black_box(store.keys("*"));
        });
    });

    group.finish();
}

/// Benchmark request decoding
fn bench_decode(c: &mut Criterion) {
    let set_frame = b"*3\r\n$3\r\nSET\r\n$8\r\nuser:101\r\n$5\r\nember\r\n";
    let get_frame = b"*2\r\n$3\r\nGET\r\n$8\r\nuser:101\r\n";

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("decode_set", |b| {
        b.iter(|| {
            black_box(decode_command(set_frame).unwrap());
        });
    });

    group.bench_function("decode_get", |b| {
        b.iter(|| {
            black_box(decode_command(get_frame).unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_set, bench_get, bench_incr, bench_keys, bench_decode);

criterion_main!(benches);
