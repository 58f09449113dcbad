use dexopt::{ExchangeCriteria, Model, ModelOrder, OptimalDesign, Result, d_criterion};
use rand::{SeedableRng, rngs::StdRng};

// f(x, y): 1 + x + y + x * y + x ^ 2 + y ^ 2
fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // define model by its polynomial order
    let model = Model::from_order(2, ModelOrder::Quadratic, true);
    println!("Model: {model}");

    // keep the best of four independent searches
    let criteria = ExchangeCriteria {
        restarts: 4,
        ..Default::default()
    };

    // define Optimal Design resolver
    let mut od = OptimalDesign::new(model.clone())
        .with_run_count(6)
        .with_criteria(criteria);

    // find optimal design
    // get design by: let design = od.solve(&mut rng)?;
    // or after solving: let design = od.design();
    let mut rng = StdRng::seed_from_u64(42);
    let design = od.solve(&mut rng)?.clone();

    // display optimal design
    // - runs
    // - D-optimality, passes and exchanges of the search
    println!("{od}");
    println!("det(XtXi): {:.6e}", d_criterion(&model, &design)?.exp());

    Ok(())
}
