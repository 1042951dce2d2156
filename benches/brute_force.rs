use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use mvgt::{aggregate, distance::uniform_weights, Metric, NeighborFinder, Record};

fn random_records(n: usize, num_vectors: usize, dim: usize, seed: u64) -> Vec<Record> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..n)
        .map(|i| {
            let embedding = (0..num_vectors)
                .map(|_| (0..dim).map(|_| rng.f64() * 2.0 - 1.0).collect::<Vec<f64>>())
                .collect::<Vec<_>>();
            Record::new(i as i64, embedding)
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let records = random_records(2, 8, 128, 1);
    let weights = uniform_weights(8);

    let mut group = c.benchmark_group("aggregate");
    for metric in Metric::ALL {
        group.bench_function(metric.name(), |b| {
            b.iter(|| {
                aggregate(
                    black_box(&records[0].embedding),
                    black_box(&records[1].embedding),
                    &weights,
                    metric,
                )
            })
        });
    }
    group.finish();
}

fn bench_neighbor_finder(c: &mut Criterion) {
    let mut group = c.benchmark_group("neighbor_finder");
    group.sample_size(10);

    for train_size in [1_000, 5_000] {
        let train = random_records(train_size, 4, 64, 2);
        let test = random_records(16, 4, 64, 3);

        for threads in [1, 0] {
            let finder = NeighborFinder::new(&train).unwrap().with_threads(threads);
            let id = BenchmarkId::new(format!("threads_{}", threads), train_size);
            group.bench_with_input(id, &test, |b, test| {
                b.iter(|| finder.run(black_box(test), 100).unwrap())
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_aggregate, bench_neighbor_finder);
criterion_main!(benches);
