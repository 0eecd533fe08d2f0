//! Benchmarks for codegrep
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn benchmark_queue_operations(c: &mut Criterion) {
    use codegrep::queue::SyncQueue;

    c.bench_function("queue_push_pull", |b| {
        let queue = SyncQueue::new();

        b.iter(|| {
            queue.push(black_box(42u64)).unwrap();
            let item = queue.pull().unwrap();
            black_box(item);
        })
    });
}

fn benchmark_pattern_scan(c: &mut Criterion) {
    use codegrep::scanner::{MatchOptions, PatternMatcher};

    let matcher = PatternMatcher::new("needle", MatchOptions::default()).unwrap();

    // ~64 KiB of source-like text with sparse matches.
    let mut data = Vec::new();
    for i in 0..2000 {
        if i % 100 == 0 {
            data.extend_from_slice(b"let x = needle(i);\n");
        } else {
            data.extend_from_slice(b"fn frobnicate(input: &str) -> usize { input.len() }\n");
        }
    }

    c.bench_function("scan_64k_sparse", |b| {
        b.iter(|| {
            let matches = matcher.scan_to_list(black_box(&data));
            black_box(matches.len());
        })
    });
}

fn benchmark_classify(c: &mut Criterion) {
    use codegrep::types::TypeManager;

    let types = TypeManager::with_default_types();
    let mut no_first_line = || None::<Vec<u8>>;

    c.bench_function("classify_known_extension", |b| {
        b.iter(|| {
            let result = types.classify(
                black_box("deeply_nested_module.cpp"),
                black_box("src/core/deeply_nested_module.cpp"),
                &mut no_first_line,
            );
            black_box(result);
        })
    });
}

criterion_group!(
    benches,
    benchmark_queue_operations,
    benchmark_pattern_scan,
    benchmark_classify
);
criterion_main!(benches);
