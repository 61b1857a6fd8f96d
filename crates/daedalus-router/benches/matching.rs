//! Matching benchmarks.
//!
//! Run with: `cargo bench -p daedalus-router`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use daedalus_router::{RouteDescriptor, RouteTable};

fn build_table(num_routes: usize) -> RouteTable {
    let mut routes = Vec::with_capacity(num_routes);

    for i in 0..num_routes / 3 {
        routes.push(RouteDescriptor::page(&format!("/section{i}/about")).unwrap());
    }
    for i in 0..num_routes / 3 {
        routes.push(RouteDescriptor::page(&format!("/section{i}/[slug]")).unwrap());
    }
    for i in 0..num_routes / 3 {
        routes.push(RouteDescriptor::page(&format!("/section{i}/[...path]")).unwrap());
    }

    RouteTable::from_routes(routes)
}

fn bench_match_one(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_one");
    for size in [30, 300] {
        let table = build_table(size);
        group.bench_with_input(BenchmarkId::new("static", size), &table, |b, table| {
            b.iter(|| table.match_one(black_box("/section7/about")));
        });
        group.bench_with_input(BenchmarkId::new("rest", size), &table, |b, table| {
            b.iter(|| table.match_one(black_box("/section7/a/b/c")));
        });
    }
    group.finish();
}

fn bench_match_all(c: &mut Criterion) {
    let table = build_table(300);
    c.bench_function("match_all_overlapping", |b| {
        b.iter(|| table.match_all(black_box("/section7/about")));
    });
}

criterion_group!(benches, bench_match_one, bench_match_all);
criterion_main!(benches);
