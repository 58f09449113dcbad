use crate::{
    Design, ModelEvaluator, Result,
    linalg::{EPS_SQRT, independent_columns, lstsq},
    model::ensure_factor_count,
};
use faer::Mat;
use faer_ext::IntoNalgebra;
use nalgebra::DMatrix;

#[cfg_attr(doc, katexit::katexit)]
/// Confounding structure of a model in a given design.
///
/// The leftmost linearly independent columns of the model matrix $X$ form the basis $B$ (at most
/// one column per run). Every model term is reconstructed from the basis by least squares,
/// $C = \arg\min \lVert B C - X \rVert$, and a basis term is aliased with every other term that
/// has a non-negligible coefficient in its row of $C$.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasAnalysis {
    basis: Vec<usize>,
    basis_names: Vec<String>,
    coefficients: DMatrix<f64>,
    aliases: Vec<String>,
}

impl AliasAnalysis {
    /// Analyzes the model matrix of `model` evaluated at the runs of `design`.
    pub fn new<M: ModelEvaluator + ?Sized>(model: &M, design: &Design) -> Result<Self> {
        ensure_factor_count(model, design)?;
        let x = model.model_matrix(design);
        let names = model.term_names();
        let mut basis = independent_columns(&x, EPS_SQRT);
        basis.truncate(design.run_count());
        let basis_names = basis.iter().map(|c| names[*c].clone()).collect::<Vec<_>>();
        if basis.is_empty() {
            return Ok(Self {
                basis,
                basis_names,
                coefficients: DMatrix::zeros(0, names.len()),
                aliases: vec![],
            });
        }

        let basis_x = Mat::from_fn(x.nrows(), basis.len(), |i, j| x[(i, basis[j])]);
        let coefficients = lstsq(&basis_x, &x)?;
        let aliases = basis
            .iter()
            .enumerate()
            .filter_map(|(r, &basis_col)| {
                let contributions = (0..names.len())
                    .filter(|c| *c != basis_col)
                    .filter_map(|c| contribution(coefficients[(r, c)], &names[c]))
                    .collect::<Vec<_>>();
                (!contributions.is_empty())
                    .then(|| format!("{} = {}", names[basis_col], contributions.join(" + ")))
            })
            .collect();
        let coefficients = coefficients.as_ref().into_nalgebra().into_owned();
        tracing::debug!(
            basis = basis.len(),
            terms = names.len(),
            "alias analysis finished"
        );
        Ok(Self {
            basis,
            basis_names,
            coefficients,
            aliases,
        })
    }

    /// Human-readable alias statements `"term = term_1 + c*term_2"`, one per aliased basis term.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Least-squares coefficients (basis_count x term_count), entry `(r, c)` is the share of term
    /// `c` explained by basis term `r`.
    pub fn coefficients(&self) -> &DMatrix<f64> {
        &self.coefficients
    }

    /// Column indices of the model terms kept in the basis.
    pub fn basis(&self) -> &[usize] {
        &self.basis
    }

    /// Names of the basis terms.
    pub fn basis_names(&self) -> &[String] {
        &self.basis_names
    }
}

fn contribution(coef: f64, term: &str) -> Option<String> {
    if coef.abs() <= EPS_SQRT {
        None
    } else if (coef - 1.).abs() < f64::EPSILON {
        Some(term.to_string())
    } else {
        Some(format!("{coef}*{term}"))
    }
}

/// Returns the alias statements and the alias coefficient matrix of a model in a design.
///
/// ```
/// use dexopt::{Design, Model, ModelOrder, alias_list};
///
/// // the second factor copies the first one
/// let design = Design::from_runs(&[
///     vec![-1., -1.],
///     vec![1., 1.],
///     vec![0., 0.],
/// ])
/// .unwrap();
/// let model = Model::from_order(2, ModelOrder::Linear, false);
/// let (aliases, coefficients) = alias_list(&model, &design).unwrap();
/// assert_eq!(aliases, vec!["X1 = X2".to_string()]);
/// assert_eq!(coefficients.shape(), (2, 3));
/// ```
pub fn alias_list<M: ModelEvaluator + ?Sized>(
    model: &M,
    design: &Design,
) -> Result<(Vec<String>, DMatrix<f64>)> {
    let analysis = AliasAnalysis::new(model, design)?;
    Ok((analysis.aliases, analysis.coefficients))
}
