use std::time::Instant;

use criterion::async_executor::AsyncStdExecutor;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use indexed_lines::{Backend, BackendKind, Storage};
use rand::distributions::Uniform;
use rand::Rng;

const FILE: &str = "./testfiles/simple";

fn random_lines_bench(c: &mut Criterion) {
    for kind in [BackendKind::Buffered, BackendKind::Mapped].iter().copied() {
        c.bench_function(&format!("read random lines {:?}", kind), move |b| {
            b.to_async(AsyncStdExecutor).iter_custom(|iters| async move {
                let (mut backend, table) = Backend::open(FILE, kind).await.unwrap();

                let lines: Vec<_> = rand::thread_rng()
                    .sample_iter(Uniform::new(0, table.len()))
                    .take(table.len() * 4)
                    .collect();

                let mut buf = Vec::new();
                let start = Instant::now();

                for _i in 0..iters {
                    for line in &lines {
                        let entry = table.get(black_box(*line)).unwrap();
                        buf.clear();
                        backend
                            .read_range(entry.offset, entry.length, &mut buf)
                            .await
                            .unwrap();
                    }
                }

                start.elapsed()
            });
        });
    }
}

fn sequencial_bench(c: &mut Criterion) {
    for kind in [BackendKind::Buffered, BackendKind::Mapped].iter().copied() {
        c.bench_function(&format!("read sequential {:?}", kind), move |b| {
            b.to_async(AsyncStdExecutor).iter_custom(|iters| async move {
                let (mut backend, table) = Backend::open(FILE, kind).await.unwrap();

                let mut buf = Vec::new();
                let start = Instant::now();

                for _i in 0..iters {
                    for entry in table.iter() {
                        buf.clear();
                        backend
                            .read_range(black_box(entry.offset), entry.length, &mut buf)
                            .await
                            .unwrap();
                    }
                }

                start.elapsed()
            });
        });
    }
}

fn build_bench(c: &mut Criterion) {
    let data = std::fs::read(FILE).unwrap();
    c.bench_function("build table from bytes", |b| {
        b.iter(|| indexed_lines::LineTable::from_bytes(black_box(&data)))
    });
}

criterion_group!(benches, random_lines_bench, sequencial_bench, build_bench);
criterion_main!(benches);
