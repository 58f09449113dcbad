use dexopt::{Design, ModelOrder, Result, build_optimal};

// temperature in [40, 80] and pressure in [1, 3]
fn main() -> Result<()> {
    let lows = [40., 1.];
    let highs = [80., 3.];

    // coded design in [-1, 1]^2 with two runs more than model terms
    let design = build_optimal(2, ModelOrder::Quadratic, Some(8), 11)?;
    println!("{design}");

    // runs in actual units
    let actual = design.to_actual(&lows, &highs)?;
    println!("Actual settings (columns):{actual}");

    // back to coded units
    let coded = Design::from_actual(&actual, &lows, &highs)?;
    println!("{coded}");

    Ok(())
}
