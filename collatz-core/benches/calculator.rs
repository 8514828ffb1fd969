use collatz_core::recurrence::{next_collatz, test};
use collatz_core::CollatzCalculator;
use common::config::CalculatorConfig;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_recurrence(c: &mut Criterion) {
    c.bench_function("next_collatz odd", |b| b.iter(|| next_collatz(black_box(27))));
    c.bench_function("test 2^20 + 1 ..= 2^20 + 1001", |b| {
        b.iter(|| {
            ((1u64 << 20) + 1..(1u64 << 20) + 1001)
                .step_by(2)
                .map(|n| test(black_box(n)))
                .sum::<u64>()
        })
    });
}

fn bench_full_range(c: &mut Criterion) {
    let calculator = CollatzCalculator::new(CalculatorConfig::default()).unwrap();
    let mut group = c.benchmark_group("full range");
    group.sample_size(10);
    for to_power in [16u32, 20, 24] {
        group.bench_with_input(
            BenchmarkId::new("sequential", to_power),
            &to_power,
            |b, &to_power| b.iter(|| calculator.test_sequentially(to_power).unwrap()),
        );
        group.bench_with_input(
            BenchmarkId::new("concurrent", to_power),
            &to_power,
            |b, &to_power| b.iter(|| calculator.test_concurrently(to_power).unwrap()),
        );
    }
    group.finish();
}

fn bench_chunk_divisor(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk divisor at 2^22");
    group.sample_size(10);
    for divisor in [1u64, 4, 14, 64] {
        let config = CalculatorConfig::default().with_partition(divisor, 10_000);
        let calculator = CollatzCalculator::new(config).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(divisor), &divisor, |b, _| {
            b.iter(|| calculator.test_concurrently(22).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_recurrence,
    bench_full_range,
    bench_chunk_divisor
);
criterion_main!(benches);
