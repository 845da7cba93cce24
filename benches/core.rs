use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use jumprope::JumpRope;
use rand::prelude::*;

use cowrite::TextOperation;

fn random_str(len: usize, rng: &mut SmallRng) -> String {
    let alphabet: Vec<char> = "abcdefghijklmnopqrstuvwxyz _\n".chars().collect();
    let mut str = String::new();
    for _ in 0..len {
        str.push(alphabet[rng.gen_range(0..alphabet.len())]);
    }
    str
}

fn random_operation(doc: &str, rng: &mut SmallRng) -> TextOperation {
    let mut op = TextOperation::new();
    let mut remaining = doc.chars().count();
    while remaining > 0 {
        let chunk = rng.gen_range(1..=remaining.min(10));
        match rng.gen_range(0..10) {
            0..=5 => {
                op.retain(chunk);
            }
            6 | 7 => {
                op.delete(chunk);
            }
            _ => {
                op.insert(&random_str(rng.gen_range(1..6), rng));
                continue;
            }
        }
        remaining -= chunk;
    }
    op
}

/// A chain of operations, each applying to the previous one's output.
fn sequential_ops(n: usize, seed: u64) -> (String, Vec<TextOperation>) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let start = random_str(200, &mut rng);
    let mut doc = start.clone();
    let mut ops = Vec::with_capacity(n);
    for _ in 0..n {
        let op = random_operation(&doc, &mut rng);
        doc = op.apply(&doc).unwrap();
        ops.push(op);
    }
    (start, ops)
}

fn apply_benchmarks(c: &mut Criterion) {
    let (start, ops) = sequential_ops(1000, 7);
    let mut group = c.benchmark_group("core");
    group.throughput(Throughput::Elements(ops.len() as u64));

    group.bench_function("apply_rope", |b| {
        b.iter(|| {
            let mut rope = JumpRope::from(start.as_str());
            for op in &ops {
                op.apply_to_rope(&mut rope).unwrap();
            }
            black_box(rope.len_chars());
        })
    });

    group.finish();
}

fn compose_benchmarks(c: &mut Criterion) {
    let (_, ops) = sequential_ops(300, 11);
    let mut group = c.benchmark_group("core");
    group.throughput(Throughput::Elements(ops.len() as u64));

    group.bench_function("compose_chain", |b| {
        b.iter(|| {
            let mut composed = ops[0].clone();
            for op in &ops[1..] {
                composed = composed.compose(op).unwrap();
            }
            black_box(composed.target_len());
        })
    });

    group.finish();
}

fn transform_benchmarks(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(9);
    let doc = random_str(500, &mut rng);
    let pairs: Vec<_> = (0..1000)
        .map(|_| (random_operation(&doc, &mut rng), random_operation(&doc, &mut rng)))
        .collect();

    let mut group = c.benchmark_group("core");
    group.throughput(Throughput::Elements(pairs.len() as u64));

    group.bench_function("transform", |b| {
        b.iter(|| {
            for (x, y) in &pairs {
                black_box(x.transform(y).unwrap());
            }
        })
    });

    group.finish();
}

criterion_group!(benches, apply_benchmarks, compose_benchmarks, transform_benchmarks);
criterion_main!(benches);
