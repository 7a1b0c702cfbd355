//! Benchmarks for draining process output.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shellstage::exec::StreamCollector;
use shellstage::logging::NoOpLogger;
use std::sync::Arc;

fn drain_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let payload = vec![b'x'; 256 * 1024];

    c.bench_function("drain_256k_default_chunks", |b| {
        let collector = StreamCollector::new("exec", Arc::new(NoOpLogger));
        b.iter(|| {
            let capture = runtime.block_on(collector.drain(black_box(&payload[..])));
            black_box(capture.text.len())
        });
    });

    c.bench_function("drain_256k_16k_chunks", |b| {
        let collector =
            StreamCollector::new("exec", Arc::new(NoOpLogger)).with_chunk_size(16 * 1024);
        b.iter(|| {
            let capture = runtime.block_on(collector.drain(black_box(&payload[..])));
            black_box(capture.text.len())
        });
    });
}

criterion_group!(benches, drain_benchmark);
criterion_main!(benches);
