//! Performance benchmarks for the verse pipeline.
//!
//! Each group builds a generated program once and measures one phase:
//! analysis, step compilation, stepped evaluation and direct
//! interpretation.
//!
//! ```bash
//! cargo bench --bench analysis_benchmarks
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use verse::Unit;
use verse_analysis::ProjectBuilder;
use verse_core::{NodeId, TreeBuilder};

/// `ƒ fib(n•#) n < 2 ? n : fib(n - 1) + fib(n - 2)`
fn fibonacci(b: &mut TreeBuilder) -> NodeId {
    let number = b.measurement_type("");
    let n = b.bind("n", Some(number), None);
    let n1 = b.reference("n");
    let two = b.number(2.0);
    let small = b.binary("<", n1, two);
    let n2 = b.reference("n");
    let recurse = |b: &mut TreeBuilder, by: f64| {
        let fib = b.reference("fib");
        let n = b.reference("n");
        let by = b.number(by);
        let less = b.binary("-", n, by);
        b.evaluate(fib, vec![less])
    };
    let left = recurse(b, 1.0);
    let right = recurse(b, 2.0);
    let sum = b.binary("+", left, right);
    let body = b.conditional(small, n2, sum);
    b.function("fib", vec![n], None, Some(body))
}

/// A chain of `binds` dependent binds followed by `fib(depth)`.
fn program(binds: usize, depth: f64) -> Unit {
    let mut project = ProjectBuilder::new();
    project
        .install(verse_modules::install)
        .expect("standard modules install");
    let b = project.builder();

    let mut statements = vec![fibonacci(b)];
    let zero = b.number(0.0);
    statements.push(b.bind("v0", None, Some(zero)));
    for i in 1..binds {
        let previous = b.reference(&format!("v{}", i - 1));
        let one = b.number(1.0);
        let next = b.binary("+", previous, one);
        statements.push(b.bind(&format!("v{i}"), None, Some(next)));
    }
    let fib = b.reference("fib");
    let depth = b.number(depth);
    statements.push(b.evaluate(fib, vec![depth]));
    let root = b.block(statements);

    project.add_source("main", root).expect("source is unique");
    let project = project.finish().expect("project is well-formed");
    Unit::new(project, "main").expect("main exists")
}

fn analysis_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");
    for binds in [10, 100, 1000] {
        let unit = program(binds, 1.0);
        group.throughput(Throughput::Elements(binds as u64));
        group.bench_with_input(BenchmarkId::new("analyze", binds), &unit, |b, unit| {
            b.iter(|| black_box(unit.analyze().expect("source exists").len()));
        });
        group.bench_with_input(BenchmarkId::new("compile", binds), &unit, |b, unit| {
            b.iter(|| black_box(unit.compile().expect("source exists")));
        });
    }
    group.finish();
}

fn evaluation_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation");
    for depth in [10.0, 15.0] {
        let unit = program(10, depth);
        let program = unit.compile().expect("source exists");
        group.bench_with_input(
            BenchmarkId::new("stepped", depth),
            &program,
            |b, program| {
                b.iter(|| {
                    let mut evaluator = unit.evaluator(program);
                    black_box(evaluator.start().expect("within the step limit"))
                });
            },
        );
        group.bench_function(BenchmarkId::new("interpreted", depth), |b| {
            b.iter(|| black_box(unit.interpret().expect("within the step limit")));
        });
    }
    group.finish();
}

criterion_group!(benches, analysis_benchmarks, evaluation_benchmarks);
criterion_main!(benches);
