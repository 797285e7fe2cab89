use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::time::Duration;

use crawlmap::{Frontier, UrlItem};

// Frontier add/next throughput across host fan-outs.
fn bench_frontier_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("frontier_add");

    for hosts in [1, 16, 256] {
        group.bench_with_input(BenchmarkId::new("hosts", hosts), &hosts, |b, &hosts| {
            b.iter(|| {
                let frontier = Frontier::new(1_000_000, 0.01, Duration::ZERO).unwrap();
                for i in 0..10_000 {
                    let url = format!("http://host{}.test/page{}", i % hosts, i);
                    black_box(frontier.add(UrlItem::seed(url)));
                }
            });
        });
    }

    group.finish();
}

fn bench_frontier_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("frontier_drain");

    for hosts in [1, 16, 256] {
        group.bench_with_input(BenchmarkId::new("hosts", hosts), &hosts, |b, &hosts| {
            b.iter_batched(
                || {
                    let frontier = Frontier::new(1_000_000, 0.01, Duration::ZERO).unwrap();
                    for i in 0..10_000 {
                        let url = format!("http://host{}.test/page{}", i % hosts, i);
                        frontier.add(UrlItem::seed(url));
                    }
                    frontier
                },
                |frontier| {
                    while let Some(item) = frontier.next() {
                        black_box(item);
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_frontier_add, bench_frontier_drain);
criterion_main!(benches);
