use crate::{
    Design, Error, ModelEvaluator, Result, linalg::inverse, model::ensure_factor_count,
};
use statrs::{
    distribution::{Discrete, Poisson},
    function::beta::{beta_reg, inv_beta_reg},
};

/// Relative weight below which the Poisson series of the non-central F distribution is cut.
const SERIES_EPS: f64 = 1e-15;
const MAX_SERIES_TERMS: u64 = 100_000;

#[cfg_attr(doc, katexit::katexit)]
/// Returns the power of the F-test of every model term, in term order.
///
/// The power is the probability that the partial F statistic of a term with one numerator degree
/// of freedom exceeds its critical value at level `alpha` if the true effect has the size
/// $s$ = `effect_size`, in units of the noise standard deviation over the full factor range.
/// With the inverse information matrix $M = (X^T X)^{-1}$ the non-centrality of term $t$ is
///
/// $$ \lambda_t = \frac{s^2}{4 M_{tt}} $$
///
/// where terms whose column never takes negative values (e.g. the intercept and pure squares)
/// range over $[0, 1]$ instead of $[-1, 1]$ and get a four times larger non-centrality.
///
/// Fails with [Error::MinValue] if the design leaves no residual degrees of freedom.
pub fn f_power<M: ModelEvaluator + ?Sized>(
    model: &M,
    design: &Design,
    effect_size: f64,
    alpha: f64,
) -> Result<Vec<f64>> {
    ensure_factor_count(model, design)?;
    if alpha.is_nan() || alpha <= 0. || alpha >= 1. {
        return Err(Error::OutOfRange {
            name: "alpha",
            value: alpha,
            low: 0.,
            high: 1.,
        });
    }
    if !effect_size.is_finite() {
        return Err(Error::OutOfRange {
            name: "effect_size",
            value: effect_size,
            low: f64::NEG_INFINITY,
            high: f64::INFINITY,
        });
    }
    let residual_df = design.run_count().saturating_sub(model.model_size());
    if residual_df == 0 {
        return Err(Error::MinValue {
            vector: "residual_df",
            dim: 0,
            value: residual_df,
            ge_value: 1,
        });
    }

    let x = model.model_matrix(design);
    let xtxi = inverse(&(x.transpose() * &x), "XtX")?;
    let residual_df = residual_df as f64;
    let crit_value = f_critical_value(1., residual_df, alpha);
    let power = (0..x.ncols())
        .map(|t| {
            let column = (0..x.nrows()).map(|i| x[(i, t)]);
            let nc = adjust_non_centrality(1. / xtxi[(t, t)], column);
            let nc = nc * effect_size * effect_size / 4.;
            1. - noncentral_f_cdf(crit_value, 1., residual_df, nc)
        })
        .collect::<Vec<f64>>();
    tracing::debug!(
        terms = power.len(),
        residual_df,
        crit_value,
        "F-test power evaluated"
    );
    Ok(power)
}

/// Quadruples the non-centrality of a term whose column is never negative.
fn adjust_non_centrality(nc: f64, mut column: impl Iterator<Item = f64>) -> f64 {
    if column.all(|v| v >= 0.) { nc * 4. } else { nc }
}

/// Upper `alpha` quantile of the central F distribution.
fn f_critical_value(df1: f64, df2: f64, alpha: f64) -> f64 {
    let y = inv_beta_reg(df1 / 2., df2 / 2., 1. - alpha);
    df2 * y / (df1 * (1. - y))
}

#[cfg_attr(doc, katexit::katexit)]
/// CDF of the non-central F distribution as Poisson mixture of regularized incomplete beta
/// functions, $\sum_j \mathrm{Pois}(j; \lambda / 2) \, I_y(d_1 / 2 + j, d_2 / 2)$ with
/// $y = d_1 f / (d_1 f + d_2)$.
fn noncentral_f_cdf(f: f64, df1: f64, df2: f64, nc: f64) -> f64 {
    if f <= 0. {
        return 0.;
    }
    let y = df1 * f / (df1 * f + df2);
    let poisson = match Poisson::new(nc / 2.) {
        Ok(poisson) => poisson,
        Err(_) => return beta_reg(df1 / 2., df2 / 2., y),
    };
    let mean = nc / 2.;
    let mut cdf = 0.;
    for j in 0..MAX_SERIES_TERMS {
        let weight = poisson.pmf(j);
        cdf += weight * beta_reg(df1 / 2. + j as f64, df2 / 2., y);
        if j as f64 > mean && weight < SERIES_EPS {
            break;
        }
    }
    cdf.min(1.)
}
