use dexopt::{AliasAnalysis, Design, Model, ModelOrder, Result};

// 2^(6-3) fractional factorial: X4 = X1 X2, X5 = X1 X3, X6 = X2 X3
fn main() -> Result<()> {
    let runs = (0..8usize)
        .map(|run| {
            let x: Vec<f64> = (0..3)
                .map(|f| if run >> f & 1 == 1 { 1. } else { -1. })
                .collect();
            vec![x[0], x[1], x[2], x[0] * x[1], x[0] * x[2], x[1] * x[2]]
        })
        .collect::<Vec<_>>();
    let design = Design::from_runs(&runs)?;
    println!("{design}");

    // main effects and two-factor interactions
    let model = Model::from_order(6, ModelOrder::Quadratic, false);
    let analysis = AliasAnalysis::new(&model, &design)?;

    println!("Estimable terms: {}", analysis.basis_names().join(", "));
    println!("Aliases:");
    for alias in analysis.aliases() {
        println!("  {alias}");
    }

    Ok(())
}
