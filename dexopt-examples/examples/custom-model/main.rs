use dexopt::{ExchangeCriteria, ModelEvaluator, OptimalDesign, Result, alias_list, factor_name};
use faer::Mat;
use rand::{SeedableRng, rngs::StdRng};

/// Linear trend with an exponential decay: 1 + x + exp(-rate * (x + 1))
struct Decay {
    rate: f64,
}

impl ModelEvaluator for Decay {
    fn factor_count(&self) -> usize {
        1
    }

    fn model_size(&self) -> usize {
        3
    }

    fn term_names(&self) -> Vec<String> {
        let x = factor_name(0);
        vec![
            "Intercept".to_string(),
            x.clone(),
            format!("exp(-{}*({x}+1))", self.rate),
        ]
    }

    fn feature_vec(&self, x: &[f64]) -> Mat<f64> {
        Mat::from_fn(3, 1, |i, _| match i {
            0 => 1.,
            1 => x[0],
            _ => (-self.rate * (x[0] + 1.)).exp(),
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // fine candidate grid for a single factor
    let criteria = ExchangeCriteria {
        steps: 41,
        ..Default::default()
    };
    let mut od = OptimalDesign::new(Decay { rate: 2. })
        .with_run_count(6)
        .with_criteria(criteria);
    let mut rng = StdRng::seed_from_u64(1);
    let design = od.solve(&mut rng)?.clone();
    println!("{od}");

    // an optimal design never aliases the terms it was built for
    let (aliases, _) = alias_list(od.model(), &design)?;
    println!("Aliases: {aliases:?}");

    Ok(())
}
