use crate::{Error, Result};
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{Exp1, StandardNormal};

/// Tolerance for accepting a start point as feasible.
const FEASIBILITY_TOL: f64 = 1e-9;

/// Configuration of [HitAndRun].
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerOptions {
    /// Number of steps taken between two recorded samples.
    pub thin: usize,
    /// Number of directions drawn per step before giving up on a degenerate region.
    pub max_retries: usize,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            thin: 1,
            max_retries: 100,
        }
    }
}

#[cfg_attr(doc, katexit::katexit)]
/// Hit-and-run random walk over the polytope $\{x : A x \le b\}$.
///
/// Every step draws a uniform direction $d$ on the unit sphere, intersects the line $x + t d$
/// with the polytope and moves to a uniformly drawn point of the resulting chord.
#[derive(Debug, Clone)]
pub struct HitAndRun {
    a: DMatrix<f64>,
    b: DVector<f64>,
    x: DVector<f64>,
    options: SamplerOptions,
}

impl HitAndRun {
    /// Creates the walk from a feasible start point, a constraint matrix and its bounds.
    pub fn new(start: DVector<f64>, a: DMatrix<f64>, b: DVector<f64>) -> Result<Self> {
        if a.ncols() != start.nrows() {
            return Err(Error::ShapeMismatch {
                mat1: "constraint_matrix",
                mat2: "start",
                dim1: 1,
                dim2: 0,
                shape1: a.shape(),
                shape2: start.shape(),
            });
        }
        if a.nrows() != b.nrows() {
            return Err(Error::ShapeMismatch {
                mat1: "constraint_matrix",
                mat2: "bounds",
                dim1: 0,
                dim2: 0,
                shape1: a.shape(),
                shape2: b.shape(),
            });
        }
        let violation = &a * &start - &b;
        if let Some((constraint, v)) = violation
            .iter()
            .enumerate()
            .find(|(_, v)| **v > FEASIBILITY_TOL)
        {
            return Err(Error::InfeasibleStart {
                constraint,
                violation: *v,
            });
        }
        Ok(Self {
            a,
            b,
            x: start,
            options: SamplerOptions::default(),
        })
    }

    /// Returns the walk with given [SamplerOptions].
    pub fn with_options(mut self, options: SamplerOptions) -> Result<Self> {
        if options.thin == 0 {
            return Err(Error::MinValue {
                vector: "thin",
                dim: 0,
                value: 0,
                ge_value: 1,
            });
        }
        self.options = options;
        Ok(self)
    }

    /// Current point of the walk.
    pub fn current(&self) -> &DVector<f64> {
        &self.x
    }

    /// Moves the walk by a single hit-and-run step.
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        let slack = &self.b - &self.a * &self.x;
        for _ in 0..self.options.max_retries {
            let mut direction = DVector::<f64>::from_fn(self.x.nrows(), |_, _| {
                rng.sample::<f64, _>(StandardNormal)
            });
            let norm = direction.norm();
            if norm <= 0. {
                continue;
            }
            direction /= norm;
            match chord(&self.a, &slack, &direction) {
                Some((t_low, t_high)) => {
                    let t = if t_high > t_low {
                        rng.random_range(t_low..=t_high)
                    } else {
                        t_low
                    };
                    self.x.axpy(t, &direction, 1.);
                    return Ok(());
                }
                None => tracing::trace!("empty or unbounded chord, drawing a new direction"),
            }
        }
        Err(Error::DegenerateSampling {
            attempts: self.options.max_retries,
        })
    }

    /// Returns `n` samples as columns of a matrix, taking `thin` steps before each sample.
    pub fn sample<R: Rng>(&mut self, n: usize, rng: &mut R) -> Result<DMatrix<f64>> {
        let mut samples = DMatrix::<f64>::zeros(self.x.nrows(), n);
        for mut col in samples.column_iter_mut() {
            for _ in 0..self.options.thin {
                self.step(rng)?;
            }
            col.copy_from(&self.x);
        }
        Ok(samples)
    }
}

/// Returns the parameter interval $[t_{low}, t_{high}]$ for which $x + t d$ stays feasible, given
/// the slack $b - A x$. Rows orthogonal to the direction impose no bound.
fn chord(a: &DMatrix<f64>, slack: &DVector<f64>, direction: &DVector<f64>) -> Option<(f64, f64)> {
    let denom = a * direction;
    let mut t_low = f64::NEG_INFINITY;
    let mut t_high = f64::INFINITY;
    for (s, c) in slack.iter().zip(denom.iter()) {
        if *c > 0. {
            t_high = t_high.min(s / c);
        } else if *c < 0. {
            t_low = t_low.max(s / c);
        }
    }
    (t_low.is_finite() && t_high.is_finite() && t_low <= t_high).then_some((t_low, t_high))
}

/// Draws `n` points from the polytope $A x \le b$ by hit-and-run, starting from a feasible point.
///
/// The samples are returned as columns, one per point.
pub fn hit_and_run<R: Rng>(
    start: DVector<f64>,
    constraint_matrix: DMatrix<f64>,
    bounds: DVector<f64>,
    n: usize,
    thin: usize,
    rng: &mut R,
) -> Result<DMatrix<f64>> {
    let options = SamplerOptions {
        thin,
        ..SamplerOptions::default()
    };
    HitAndRun::new(start, constraint_matrix, bounds)?
        .with_options(options)?
        .sample(n, rng)
}

/// Returns the constraint system of the box $[low, high]^k$, two rows per factor.
pub fn box_constraints(factor_count: usize, low: f64, high: f64) -> (DMatrix<f64>, DVector<f64>) {
    let mut a = DMatrix::<f64>::zeros(2 * factor_count, factor_count);
    let mut b = DVector::<f64>::zeros(2 * factor_count);
    for f in 0..factor_count {
        a[(2 * f, f)] = -1.;
        b[2 * f] = -low;
        a[(2 * f + 1, f)] = 1.;
        b[2 * f + 1] = high;
    }
    (a, b)
}

/// Returns `n` points drawn uniformly from the simplex with `q` components as columns, each
/// summing to one.
pub fn uniform_simplex_sample<R: Rng>(n: usize, q: usize, rng: &mut R) -> Result<DMatrix<f64>> {
    if q == 0 {
        return Err(Error::MinValue {
            vector: "q",
            dim: 0,
            value: q,
            ge_value: 1,
        });
    }
    let mut sample = DMatrix::<f64>::from_fn(q, n, |_, _| rng.sample::<f64, _>(Exp1));
    for mut col in sample.column_iter_mut() {
        let sum = col.sum();
        col /= sum;
    }
    Ok(sample)
}

#[cfg_attr(doc, katexit::katexit)]
/// Returns points along the Cox direction of a mixture `point`, one column per location.
///
/// Component `coordinate` is set to each of `locations` while the remaining components keep their
/// relative proportions, $x_j' = x_j (1 - x_c') / (1 - x_c)$. If the point is the vertex
/// $x_c = 1$, the remaining components share $1 - x_c'$ equally.
pub fn cox_points(point: &[f64], coordinate: usize, locations: &[f64]) -> Result<DMatrix<f64>> {
    let q = point.len();
    if coordinate >= q {
        return Err(Error::ShapeMismatch {
            mat1: "coordinate",
            mat2: "point",
            dim1: 0,
            dim2: 0,
            shape1: (coordinate + 1, 1),
            shape2: (q, 1),
        });
    }
    let start = point[coordinate];
    let at_vertex = (1. - start).abs() <= f64::EPSILON;
    Ok(DMatrix::from_fn(q, locations.len(), |j, i| {
        let location = locations[i];
        if j == coordinate {
            location
        } else if at_vertex {
            (1. - location) / (q - 1) as f64
        } else {
            point[j] * (1. - location) / (1. - start)
        }
    }))
}

/// Returns [cox_points] at `n + 1` evenly spaced locations from 0 to 1, with `n` at least one.
pub fn cox_grid(point: &[f64], coordinate: usize, n: usize) -> Result<DMatrix<f64>> {
    let n = n.max(1);
    let locations = (0..=n).map(|i| i as f64 / n as f64).collect::<Vec<f64>>();
    cox_points(point, coordinate, &locations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{dmatrix, dvector};
    use rand::{SeedableRng, rngs::StdRng};

    const FEASIBLE_EPS: f64 = 1e-6;

    fn assert_feasible(a: &DMatrix<f64>, b: &DVector<f64>, samples: &DMatrix<f64>) {
        for x in samples.column_iter() {
            let ax = a * x;
            ax.iter()
                .zip(b.iter())
                .for_each(|(l, r)| assert!(*l <= r + FEASIBLE_EPS));
        }
    }

    #[test]
    fn unit_square() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(7);
        let a = dmatrix![1., 0.; 0., 1.; -1., 0.; 0., -1.];
        let b = dvector![1., 1., 0., 0.];
        let samples = hit_and_run(dvector![0.2, 0.7], a.clone(), b.clone(), 5, 2, &mut rng)?;
        assert_eq!(samples.shape(), (2, 5));
        assert_feasible(&a, &b, &samples);
        Ok(())
    }

    #[test]
    fn triangle() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(42);
        // x >= 0, y >= 0, x + y <= 1
        let a = dmatrix![-1., 0.; 0., -1.; 1., 1.];
        let b = dvector![0., 0., 1.];
        let samples = hit_and_run(dvector![0.1, 0.1], a.clone(), b.clone(), 500, 3, &mut rng)?;
        assert_feasible(&a, &b, &samples);
        // the walk moves away from the start
        assert!(samples.column_iter().any(|c| (c[0] - 0.1).abs() > 0.1));
        Ok(())
    }

    #[test]
    fn box_walk() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(3);
        let (a, b) = box_constraints(4, -1., 1.);
        let samples = hit_and_run(DVector::zeros(4), a.clone(), b.clone(), 200, 1, &mut rng)?;
        assert_feasible(&a, &b, &samples);
        assert!(samples.iter().all(|v| v.abs() <= 1. + FEASIBLE_EPS));
        Ok(())
    }

    #[test]
    fn box_constraint_rows() {
        let (a, b) = box_constraints(2, -1., 2.);
        assert_eq!(a, dmatrix![-1., 0.; 1., 0.; 0., -1.; 0., 1.]);
        assert_eq!(b, dvector![1., 2., 1., 2.]);
    }

    #[test]
    fn seeded_walk_is_reproducible() -> Result<()> {
        let (a, b) = box_constraints(3, -1., 1.);
        let mut rng = StdRng::seed_from_u64(11);
        let s1 = hit_and_run(DVector::zeros(3), a.clone(), b.clone(), 10, 2, &mut rng)?;
        let mut rng = StdRng::seed_from_u64(11);
        let s2 = hit_and_run(DVector::zeros(3), a, b, 10, 2, &mut rng)?;
        assert_eq!(s1, s2);
        Ok(())
    }

    #[test]
    fn infeasible_start() {
        let (a, b) = box_constraints(2, -1., 1.);
        let walk = HitAndRun::new(dvector![0., 1.5], a, b);
        assert!(matches!(
            walk,
            Err(Error::InfeasibleStart { constraint: 3, .. })
        ));
    }

    #[test]
    fn unbounded_region() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = dmatrix![1., 0.];
        let b = dvector![1.];
        let samples = hit_and_run(dvector![0., 0.], a, b, 1, 1, &mut rng);
        assert_eq!(samples, Err(Error::DegenerateSampling { attempts: 100 }));
    }

    #[test]
    fn zero_thin() {
        let (a, b) = box_constraints(1, -1., 1.);
        let samples = hit_and_run(dvector![0.], a, b, 1, 0, &mut StdRng::seed_from_u64(1));
        assert_eq!(
            samples,
            Err(Error::MinValue {
                vector: "thin",
                dim: 0,
                value: 0,
                ge_value: 1,
            })
        );
    }

    #[test]
    fn shape_mismatch() {
        let (a, b) = box_constraints(2, -1., 1.);
        let walk = HitAndRun::new(dvector![0., 0., 0.], a, b);
        assert!(matches!(walk, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn simplex_rows_sum_to_one() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(5);
        let sample = uniform_simplex_sample(5, 4, &mut rng)?;
        assert_eq!(sample.shape(), (4, 5));
        for c in sample.column_iter() {
            assert!((c.sum() - 1.).abs() < 1e-12);
            assert!(c.iter().all(|v| *v >= 0.));
        }
        let single = uniform_simplex_sample(1, 1, &mut rng)?;
        assert!((single[(0, 0)] - 1.).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn cox_points_keep_proportions() -> Result<()> {
        let point = [0.3, 0.23, 0.47];
        let points = cox_points(&point, 0, &[0., 0.3, 0.5, 1.])?;
        let expected = DMatrix::from_column_slice(
            3,
            4,
            &[
                0., 0.328571, 0.671429, 0.3, 0.23, 0.47, 0.5, 0.164286, 0.335714, 1., 0., 0.,
            ],
        );
        assert!(points.relative_eq(&expected, 1e-6, 1e-5));
        for c in points.column_iter() {
            assert!((c.sum() - 1.).abs() < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn cox_points_from_vertex() -> Result<()> {
        let vertex = [1., 0., 0.];
        let points = cox_points(&vertex, 0, &[0., 0.3, 1.])?;
        assert!(points.relative_eq(
            &dmatrix![0., 0.3, 1.; 0.5, 0.35, 0.; 0.5, 0.35, 0.],
            1e-12,
            1e-12
        ));
        // moving a zero component away from the vertex
        let points = cox_points(&vertex, 1, &[0., 0.3, 1.])?;
        assert!(points.relative_eq(
            &dmatrix![1., 0.7, 0.; 0., 0.3, 1.; 0., 0., 0.],
            1e-12,
            1e-12
        ));
        Ok(())
    }

    #[test]
    fn cox_grid_locations() -> Result<()> {
        let points = cox_grid(&[0.3, 0.23, 0.47], 2, 3)?;
        let expected = dmatrix![
            0.566038, 0.377358, 0.188679, 0.;
            0.433962, 0.289308, 0.144654, 0.;
            0., 1. / 3., 2. / 3., 1.
        ];
        assert!(points.relative_eq(&expected, 1e-6, 1e-5));
        let points = cox_grid(&[1., 0.], 0, 2)?;
        assert!(points.relative_eq(&dmatrix![0., 0.5, 1.; 1., 0.5, 0.], 1e-12, 1e-12));
        Ok(())
    }

    #[test]
    fn cox_coordinate_out_of_range() {
        assert!(matches!(
            cox_points(&[0.5, 0.5], 2, &[0.]),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
