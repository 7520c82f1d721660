//! Benchmarks for query pipeline operations

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use entail::cache::{self, ProofCache};
use entail::infer::{infer_declarations, HeuristicClassifier};
use entail::query::{Engine, ProveRequest, SolveRequest};
use entail::solver::SolverLimits;

fn inference_benchmark(c: &mut Criterion) {
    let small = vec!["H(s)", "Implies(H(s), M(s))", "M(s)"];
    let medium: Vec<String> = (0..50)
        .map(|i| format!("Implies(P{}(a{}), P{}(a{}))", i, i, i + 1, i))
        .collect();

    let mut group = c.benchmark_group("inference");

    group.bench_with_input(BenchmarkId::new("statements", "3"), &small, |b, input| {
        b.iter(|| {
            black_box(
                infer_declarations(input, &BTreeMap::new(), &BTreeMap::new(), &HeuristicClassifier::default())
                    .unwrap(),
            )
        });
    });

    group.bench_with_input(BenchmarkId::new("statements", "50"), &medium, |b, input| {
        b.iter(|| {
            black_box(
                infer_declarations(input, &BTreeMap::new(), &BTreeMap::new(), &HeuristicClassifier::default())
                    .unwrap(),
            )
        });
    });

    group.finish();
}

fn prove_benchmark(c: &mut Criterion) {
    let request = ProveRequest {
        premises: vec!["H(s)".to_string(), "Implies(H(s), M(s))".to_string()],
        conclusion: "M(s)".to_string(),
        ..ProveRequest::default()
    };

    let mut group = c.benchmark_group("prove");

    group.bench_function("modus_ponens_uncached", |b| {
        let engine = Engine::new(None, SolverLimits::default());
        b.iter(|| black_box(engine.prove(&request).unwrap()));
    });

    group.bench_function("modus_ponens_cached", |b| {
        let engine = Engine::new(Some(ProofCache::in_memory().unwrap()), SolverLimits::default());
        engine.prove(&request).unwrap();
        b.iter(|| black_box(engine.prove(&request).unwrap()));
    });

    group.finish();
}

fn solve_benchmark(c: &mut Criterion) {
    let request = SolveRequest {
        constraints: vec!["x + y == 10".to_string(), "x > 3".to_string(), "y > 2".to_string()],
        ..SolveRequest::default()
    };

    c.bench_function("solve_linear_integers", |b| {
        let engine = Engine::new(None, SolverLimits::default());
        b.iter(|| black_box(engine.solve(&request).unwrap()));
    });
}

fn identity_benchmark(c: &mut Criterion) {
    let premises: Vec<String> = (0..20).map(|i| format!("Implies(P{}(a), P{}(a))", i, i + 1)).collect();

    c.bench_function("identity_hash_20_premises", |b| {
        b.iter(|| black_box(cache::identity(&premises, Some("P20(a)"))));
    });
}

criterion_group!(benches, inference_benchmark, prove_benchmark, solve_benchmark, identity_benchmark);
criterion_main!(benches);
