use dexopt::{Result, hit_and_run, uniform_simplex_sample};
use nalgebra::{dmatrix, dvector};
use rand::{SeedableRng, rngs::StdRng};

fn main() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);

    // triangle: x >= 0, y >= 0, x + y <= 1
    let a = dmatrix![
        -1., 0.;
        0., -1.;
        1., 1.
    ];
    let b = dvector![0., 0., 1.];
    let samples = hit_and_run(dvector![0.1, 0.1], a, b, 10, 5, &mut rng)?;
    println!("Hit-and-run samples (columns):{samples}");

    // mixture proportions of three components
    let mixtures = uniform_simplex_sample(5, 3, &mut rng)?;
    println!("Simplex samples (columns):{mixtures}");

    Ok(())
}
