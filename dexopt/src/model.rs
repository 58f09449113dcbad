use crate::{Design, Error, Result};
use faer::Mat;
use std::{fmt::Display, str::FromStr};

/// Returns the name of the i-th factor (zero-based), `X1`, `X2`, ...
pub fn factor_name(i: usize) -> String {
    format!("X{}", i + 1)
}

/// Returns the names of the first `factor_count` factors.
pub fn factor_names(factor_count: usize) -> Vec<String> {
    (0..factor_count).map(factor_name).collect()
}

/// Expands design points into the basis functions of a linear model.
///
/// The coordinate exchange and the alias analysis only depend on this interface, any model
/// grammar can be plugged in by implementing it.
pub trait ModelEvaluator: Send + Sync {
    /// Number of factors (coordinates) of a design point.
    fn factor_count(&self) -> usize;
    /// Number of basis terms, the minimal rank of a non-singular design.
    fn model_size(&self) -> usize;
    /// Names of the basis terms in column order.
    fn term_names(&self) -> Vec<String>;
    /// Returns the basis expansion of a single point as a column vector of length
    /// [ModelEvaluator::model_size].
    fn feature_vec(&self, x: &[f64]) -> Mat<f64>;

    /// Returns the model matrix $X$ whose i-th row is the expansion of the i-th run.
    fn model_matrix(&self, design: &Design) -> Mat<f64> {
        let model_size = self.model_size();
        let mut x = Mat::<f64>::zeros(design.run_count(), model_size);
        for i in 0..design.run_count() {
            let feature_vec = self.feature_vec(design.point(i));
            for j in 0..model_size {
                x[(i, j)] = feature_vec[(j, 0)];
            }
        }
        x
    }
}

/// Returns [Error::ShapeMismatch] if the design does not have as many factors as the model.
pub(crate) fn ensure_factor_count<M: ModelEvaluator + ?Sized>(
    model: &M,
    design: &Design,
) -> Result<()> {
    if model.factor_count() != design.factor_count() {
        return Err(Error::ShapeMismatch {
            mat1: "model",
            mat2: "design",
            dim1: 1,
            dim2: 0,
            shape1: (model.model_size(), model.factor_count()),
            shape2: (design.factor_count(), design.run_count()),
        });
    }
    Ok(())
}

/// Polynomial order of a generated model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelOrder {
    /// Intercept only.
    Constant,
    /// Intercept and main effects.
    Linear,
    /// Linear terms plus two-factor interactions (and squares if powers are included).
    Quadratic,
    /// Quadratic terms plus three-factor interactions (and cubic powers if included).
    Cubic,
}

impl FromStr for ModelOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constant" => Ok(ModelOrder::Constant),
            "linear" => Ok(ModelOrder::Linear),
            "quadratic" => Ok(ModelOrder::Quadratic),
            "cubic" => Ok(ModelOrder::Cubic),
            _ => Err(Error::UnknownModelOrder {
                name: s.to_string(),
            }),
        }
    }
}

/// Monomial basis term $\prod_i x_i^{p_i}$; the empty product is the intercept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    powers: Vec<u32>,
}

impl Term {
    /// Creates a term from its factor powers.
    pub fn new(powers: Vec<u32>) -> Self {
        Self { powers }
    }

    /// Creates the intercept term.
    pub fn intercept(factor_count: usize) -> Self {
        Self::new(vec![0; factor_count])
    }

    /// Creates the product of the given factors, each with power one.
    ///
    /// Fails with [Error::ShapeMismatch] if a factor index is not below `factor_count`.
    pub fn interaction(factor_count: usize, factors: &[usize]) -> Result<Self> {
        ensure_factor_indices(factor_count, factors)?;
        Ok(Self::product(factor_count, factors))
    }

    /// Creates the term $x_f^p$.
    ///
    /// Fails with [Error::ShapeMismatch] if `factor` is not below `factor_count`.
    pub fn power(factor_count: usize, factor: usize, power: u32) -> Result<Self> {
        ensure_factor_indices(factor_count, &[factor])?;
        Ok(Self::pure_power(factor_count, factor, power))
    }

    fn product(factor_count: usize, factors: &[usize]) -> Self {
        let mut powers = vec![0; factor_count];
        factors.iter().for_each(|&f| powers[f] += 1);
        Self::new(powers)
    }

    fn pure_power(factor_count: usize, factor: usize, power: u32) -> Self {
        let mut powers = vec![0; factor_count];
        powers[factor] = power;
        Self::new(powers)
    }

    /// Powers per factor.
    pub fn powers(&self) -> &[u32] {
        &self.powers
    }

    /// Total degree of the term.
    pub fn order(&self) -> u32 {
        self.powers.iter().sum()
    }

    /// Evaluates the term at point x.
    pub fn val(&self, x: &[f64]) -> f64 {
        self.powers
            .iter()
            .zip(x)
            .filter(|(p, _)| **p > 0)
            .map(|(p, v)| v.powi(*p as i32))
            .product()
    }
}

fn ensure_factor_indices(factor_count: usize, factors: &[usize]) -> Result<()> {
    match factors.iter().find(|f| **f >= factor_count) {
        Some(f) => Err(Error::ShapeMismatch {
            mat1: "factor",
            mat2: "factors",
            dim1: 0,
            dim2: 0,
            shape1: (f + 1, 1),
            shape2: (factor_count, 1),
        }),
        None => Ok(()),
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.order() == 0 {
            return write!(f, "Intercept");
        }
        let name = self
            .powers
            .iter()
            .enumerate()
            .filter(|(_, p)| **p > 0)
            .map(|(i, p)| match p {
                1 => factor_name(i),
                _ => format!("{}^{}", factor_name(i), p),
            })
            .collect::<Vec<String>>()
            .join(":");
        write!(f, "{name}")
    }
}

/// Linear model built from an ordered list of polynomial terms.
///
/// ```
/// use dexopt::{Model, ModelEvaluator, ModelOrder};
///
/// let model = Model::from_order(2, ModelOrder::Quadratic, true);
/// assert_eq!(model.model_size(), 6);
/// assert_eq!(model.to_string(), "Intercept + X1 + X2 + X1:X2 + X1^2 + X2^2");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    factor_count: usize,
    terms: Vec<Term>,
}

impl Model {
    /// Creates a model from its terms. Every term has to carry one power per factor.
    pub fn new(factor_count: usize, terms: Vec<Term>) -> Result<Self> {
        if let Some(term) = terms.iter().find(|t| t.powers.len() != factor_count) {
            return Err(Error::ShapeMismatch {
                mat1: "term",
                mat2: "factors",
                dim1: 0,
                dim2: 0,
                shape1: (term.powers.len(), 1),
                shape2: (factor_count, 1),
            });
        }
        Ok(Self {
            factor_count,
            terms,
        })
    }

    /// Creates the polynomial model of a given order.
    ///
    /// Terms are ordered by intercept, main effects, two-factor interactions, squares (if
    /// `include_powers`), three-factor interactions, and finally the cubic powers $x_i^2 x_j$ and
    /// $x_i^3$ (if `include_powers`).
    pub fn from_order(factor_count: usize, order: ModelOrder, include_powers: bool) -> Self {
        let mut terms = vec![Term::intercept(factor_count)];
        if order == ModelOrder::Constant {
            return Self {
                factor_count,
                terms,
            };
        }
        terms.extend((0..factor_count).map(|f| Term::product(factor_count, &[f])));
        if order == ModelOrder::Linear {
            return Self {
                factor_count,
                terms,
            };
        }
        terms.extend(
            combinations(factor_count, 2)
                .iter()
                .map(|c| Term::product(factor_count, c)),
        );
        if include_powers {
            terms.extend((0..factor_count).map(|f| Term::pure_power(factor_count, f, 2)));
        }
        if order == ModelOrder::Quadratic {
            return Self {
                factor_count,
                terms,
            };
        }
        terms.extend(
            combinations(factor_count, 3)
                .iter()
                .map(|c| Term::product(factor_count, c)),
        );
        if include_powers {
            for i in 0..factor_count {
                for j in (0..factor_count).filter(|j| *j != i) {
                    let mut powers = vec![0; factor_count];
                    powers[i] = 2;
                    powers[j] = 1;
                    terms.push(Term::new(powers));
                }
            }
            terms.extend((0..factor_count).map(|f| Term::pure_power(factor_count, f, 3)));
        }
        Self {
            factor_count,
            terms,
        }
    }

    /// Creates the factorial model containing all interactions up to `max_order` factors.
    pub fn factorial(factor_count: usize, max_order: usize) -> Self {
        let terms = (0..=max_order.min(factor_count))
            .flat_map(|k| combinations(factor_count, k))
            .map(|c| Term::product(factor_count, &c))
            .collect();
        Self {
            factor_count,
            terms,
        }
    }

    /// Ordered list of terms.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }
}

impl ModelEvaluator for Model {
    fn factor_count(&self) -> usize {
        self.factor_count
    }

    fn model_size(&self) -> usize {
        self.terms.len()
    }

    fn term_names(&self) -> Vec<String> {
        self.terms.iter().map(|t| t.to_string()).collect()
    }

    fn feature_vec(&self, x: &[f64]) -> Mat<f64> {
        let mut feature_vec = Mat::<f64>::zeros(self.terms.len(), 1);
        feature_vec
            .col_mut(0)
            .iter_mut()
            .enumerate()
            .for_each(|(idx, r)| {
                *r = self.terms[idx].val(x);
            });
        feature_vec
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.term_names().join(" + "))
    }
}

/// Returns all k-combinations of `0..n` in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn build(
        start: usize,
        n: usize,
        k: usize,
        current: &mut Vec<usize>,
        out: &mut Vec<Vec<usize>>,
    ) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            build(i + 1, n, k, current, out);
            current.pop();
        }
    }
    let mut out = vec![];
    build(0, n, k, &mut vec![], &mut out);
    out
}
