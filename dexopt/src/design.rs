use crate::{
    Error, ModelEvaluator, Result,
    linalg::{inverse, log_det},
    model::ensure_factor_count,
};
use nalgebra::{DMatrix, DVector};
use std::fmt::Display;

/// Experimental design: an ordered set of runs (design points) over a fixed number of factors.
///
/// The points are stored column-orientated, the i-th column of [Design::points] holds the factor
/// settings of the i-th run.
#[derive(Debug, Clone, PartialEq)]
pub struct Design {
    points: DMatrix<f64>,
}

impl Display for Design {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = (6 + self.factor_count() * 9).max(28);
        let header = (0..self.factor_count())
            .map(|i| format!("{:>8}", crate::factor_name(i)))
            .collect::<Vec<String>>()
            .join(" ");
        let rows: String = self
            .points
            .column_iter()
            .enumerate()
            .map(|(i, p)| {
                let values = p
                    .iter()
                    .map(|v| format!("{:>+8.4}", v))
                    .collect::<Vec<String>>()
                    .join(" ");
                format!("{:>4}  {}", i + 1, values)
            })
            .collect::<Vec<String>>()
            .join("\n");
        write!(f, "{:-^1$}\n Run  {header}\n{rows}", " Design ", width)
    }
}

impl Design {
    /// Creates a design from a column-orientated point matrix (factor_count x run_count).
    pub fn new(points: DMatrix<f64>) -> Self {
        Self { points }
    }

    /// Creates a design from a list of runs. Every run has to contain the same number of factors.
    pub fn from_runs(runs: &[Vec<f64>]) -> Result<Self> {
        let factor_count = runs.first().map(|r| r.len()).unwrap_or(0);
        if let Some((idx, run)) = runs
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != factor_count)
        {
            return Err(Error::ShapeMismatch {
                mat1: "run",
                mat2: "runs",
                dim1: 0,
                dim2: 1,
                shape1: (run.len(), idx),
                shape2: (factor_count, runs.len()),
            });
        }
        let columns = runs
            .iter()
            .map(|r| DVector::from_column_slice(r))
            .collect::<Vec<_>>();
        let points = match columns.len() {
            0 => DMatrix::zeros(0, 0),
            _ => DMatrix::from_columns(&columns),
        };
        Ok(Self { points })
    }

    /// Creates a coded design from factor settings in actual units, mapping `lows` to -1 and
    /// `highs` to +1.
    pub fn from_actual(actual: &DMatrix<f64>, lows: &[f64], highs: &[f64]) -> Result<Self> {
        let (center, half_range) = coding(actual.nrows(), lows, highs)?;
        let mut points = actual.clone();
        for mut p in points.column_iter_mut() {
            p -= &center;
            p.component_div_assign(&half_range);
        }
        Ok(Self { points })
    }

    /// Returns the design in actual units, mapping -1 to `lows` and +1 to `highs`.
    pub fn to_actual(&self, lows: &[f64], highs: &[f64]) -> Result<DMatrix<f64>> {
        let (center, half_range) = coding(self.factor_count(), lows, highs)?;
        let mut actual = self.points.clone();
        for mut p in actual.column_iter_mut() {
            p.component_mul_assign(&half_range);
            p += &center;
        }
        Ok(actual)
    }

    /// Number of factors per run.
    pub fn factor_count(&self) -> usize {
        self.points.nrows()
    }

    /// Number of runs.
    pub fn run_count(&self) -> usize {
        self.points.ncols()
    }

    /// Returns the factor settings of the i-th run.
    pub fn point(&self, i: usize) -> &[f64] {
        let start = i * self.factor_count();
        &self.points.as_slice()[start..start + self.factor_count()]
    }

    /// Sets a single coordinate of a run.
    pub fn set_coordinate(&mut self, run: usize, factor: usize, value: f64) {
        self.points[(factor, run)] = value;
    }

    /// Column-orientated point matrix.
    pub fn points(&self) -> &DMatrix<f64> {
        &self.points
    }

    /// Returns the design as row-orientated matrix (run_count x factor_count).
    pub fn runs(&self) -> DMatrix<f64> {
        self.points.transpose()
    }
}

/// Returns center and half range of the coding interval per factor.
fn coding(
    factor_count: usize,
    lows: &[f64],
    highs: &[f64],
) -> Result<(DVector<f64>, DVector<f64>)> {
    if lows.len() != factor_count || highs.len() != factor_count {
        return Err(Error::ShapeMismatch {
            mat1: "lows",
            mat2: "highs",
            dim1: 0,
            dim2: 0,
            shape1: (lows.len(), 1),
            shape2: (highs.len(), 1),
        });
    }
    let lows = DVector::from_column_slice(lows);
    let highs = DVector::from_column_slice(highs);
    let (dim, distance) = (&highs - &lows).argmin();
    if factor_count > 0 && distance <= 0. {
        return Err(Error::MinDistanceBetweenVectors {
            vector1: "lows",
            vector2: "highs",
            dim,
            distance,
            gt_distance: 0.,
        });
    }
    Ok(((&highs + &lows) / 2., (&highs - &lows) / 2.))
}

#[cfg_attr(doc, katexit::katexit)]
/// Returns the D-criterion $\ln \det (X^T X)^{-1}$ of a design for a given model.
///
/// Lower values indicate more informative designs. Fails with [Error::SingularMatrix] if the model
/// matrix does not have full column rank.
pub fn d_criterion<M: ModelEvaluator + ?Sized>(model: &M, design: &Design) -> Result<f64> {
    ensure_factor_count(model, design)?;
    let x = model.model_matrix(design);
    let xtx = x.transpose() * &x;
    let xtxi = inverse(&xtx, "XtX")?;
    log_det(&xtxi, "XtXi")
}
