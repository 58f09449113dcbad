use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dexopt::{DeltaMethod, ExchangeCriteria, Model, ModelOrder, OptimalDesign, Result};
use rand::{SeedableRng, rngs::StdRng};
use std::time::Duration;

// f(x): 1 + x_i + x_i * x_j + x_i ^ 2
fn quadratic(factor_count: usize, delta_method: DeltaMethod) -> Result<()> {
    let model = Model::from_order(factor_count, ModelOrder::Quadratic, true);
    let criteria = ExchangeCriteria {
        delta_method,
        ..Default::default()
    };
    let mut od = OptimalDesign::new(model).with_criteria(criteria);
    let mut rng = StdRng::seed_from_u64(0);
    od.solve(&mut rng)?;
    Ok(())
}

fn benchmark_quadratic(c: &mut Criterion) {
    let mut group = c.benchmark_group("Coordinate Exchange Quadratic");
    group.sample_size(10).warm_up_time(Duration::from_secs(1));
    for factor_count in 2..7 {
        group.bench_with_input(
            BenchmarkId::new("Rank-2 update", factor_count),
            &factor_count,
            |b, &k| {
                b.iter(|| quadratic(k, DeltaMethod::RankTwo));
            },
        );
        group.bench_with_input(
            BenchmarkId::new("Reinversion", factor_count),
            &factor_count,
            |b, &k| {
                b.iter(|| quadratic(k, DeltaMethod::Reinversion));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, benchmark_quadratic);
criterion_main!(benches);
