use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dirsync_lib::core::{aggregate, Status};
use dirsync_lib::{EventSender, StatusKind, SyncCommand};
use std::hint::black_box;

fn statuses(count: usize, kind: StatusKind) -> Vec<Status> {
    (0..count)
        .map(|i| {
            if i % 3 == 0 {
                Status::new(StatusKind::Equally)
            } else {
                Status::new(kind)
            }
        })
        .collect()
}

fn benchmark_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let idle = SyncCommand::new("/bench", EventSender::disabled());

    for count in [10, 1_000, 100_000] {
        let equal = statuses(count, StatusKind::Equally);
        let newer = statuses(count, StatusKind::Newer);

        group.bench_with_input(BenchmarkId::new("all_equal", count), &equal, |b, children| {
            b.iter(|| aggregate(black_box(children).iter().map(|s| (s, &idle))));
        });
        group.bench_with_input(BenchmarkId::new("uniform_newer", count), &newer, |b, children| {
            b.iter(|| aggregate(black_box(children).iter().map(|s| (s, &idle))));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_aggregate);
criterion_main!(benches);
