use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

use testlock_core::question::{sequence, Question, KIND_PRECEDENCE};

fn batch(size: usize) -> Vec<Question> {
    (0..size)
        .map(|i| Question {
            id: format!("q{i}"),
            prompt: format!("prompt {i}"),
            test_id: "bench".to_string(),
            kind: KIND_PRECEDENCE[i % KIND_PRECEDENCE.len()],
            duration: Some(Duration::from_secs(30)),
            choices: Vec::new(),
        })
        .collect()
}

fn bench_sequence(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence");
    for size in [16usize, 128, 1024] {
        let questions = batch(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &questions, |b, input| {
            let mut rng = StdRng::seed_from_u64(42);
            b.iter(|| sequence(black_box(input.clone()), &mut rng));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sequence);
criterion_main!(benches);
