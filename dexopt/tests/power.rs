use dexopt::{Design, Model, Result, f_power};

#[test]
fn test_power_of_2_9_factorial() -> Result<()> {
    // full 2^9 factorial with all interactions up to four factors, 256 terms in 512 runs
    let runs = (0..1usize << 9)
        .map(|run| {
            (0..9)
                .map(|f| if run >> f & 1 == 1 { 1. } else { -1. })
                .collect()
        })
        .collect::<Vec<Vec<f64>>>();
    let design = Design::from_runs(&runs)?;
    let model = Model::factorial(9, 4);
    let power = f_power(&model, &design, 0.2, 0.05)?;
    assert_eq!(power.len(), 256);
    // the intercept column is never negative
    assert!((power[0] - 0.994590).abs() < 1e-4);
    assert!(power[1..].iter().all(|p| (p - 0.615743).abs() < 1e-4));
    Ok(())
}
