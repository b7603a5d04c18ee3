use criterion::{criterion_group, criterion_main, Criterion};
use std::{hint::black_box, io};
use tal::{parser, vm::Vm};

static INPUT: &str = include_str!("../../demos/primes.tal");

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("build", |b| {
        b.iter(|| black_box(parser::parse_program(black_box(INPUT)).unwrap()));
    });

    let (program, symbols) = parser::parse_program(INPUT).unwrap();
    c.bench_function("render", |b| {
        b.iter(|| black_box(program.render(&symbols)));
    });

    c.bench_function("run", |b| {
        b.iter(|| {
            // Variables are mutated by a run, so each iteration starts afresh.
            let (program, mut symbols) = parser::parse_program(INPUT).unwrap();
            Vm::new(&program, &mut symbols, io::sink()).run().unwrap();
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
