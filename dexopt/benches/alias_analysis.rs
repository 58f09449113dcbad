use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dexopt::{AliasAnalysis, Design, Model, ModelOrder, Result};
use std::time::Duration;

// half fraction of the 2^k factorial, the last factor is the product of all others
fn half_fraction(factor_count: usize) -> Result<Design> {
    let base = factor_count - 1;
    let runs = (0..1usize << base)
        .map(|run| {
            let mut r = (0..base)
                .map(|f| if run >> f & 1 == 1 { 1. } else { -1. })
                .collect::<Vec<f64>>();
            r.push(r.iter().product());
            r
        })
        .collect::<Vec<_>>();
    Design::from_runs(&runs)
}

fn alias_two_factor_interactions(factor_count: usize) -> Result<()> {
    let design = half_fraction(factor_count)?;
    let model = Model::from_order(factor_count, ModelOrder::Quadratic, false);
    AliasAnalysis::new(&model, &design)?;
    Ok(())
}

fn benchmark_alias(c: &mut Criterion) {
    let mut group = c.benchmark_group("Alias Analysis Half Fraction");
    group.sample_size(10).warm_up_time(Duration::from_secs(1));
    for factor_count in (3..10).step_by(2) {
        group.bench_with_input(
            BenchmarkId::new("Factors", factor_count),
            &factor_count,
            |b, &k| {
                b.iter(|| alias_two_factor_interactions(k));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, benchmark_alias);
criterion_main!(benches);
