use crate::{
    Error, Result,
    linalg::{EPS_SQRT, inverse, log_det, rank},
};
use faer::{Mat, mat};

/// Method used to evaluate the change of $\det X^T X$ caused by a row exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeltaMethod {
    /// Closed form of the rank-2 update, $O(p^2)$.
    #[default]
    RankTwo,
    /// Determinant of the updated information matrix, $O(p^3)$.
    Reinversion,
}

#[cfg_attr(doc, katexit::katexit)]
/// Information matrix $X^T X$ of a design together with its inverse and the running D-optimality
/// $\ln \det (X^T X)^{-1}$.
///
/// Exchanging the row $v_{old}$ of $X$ by $v_{new}$ is a rank-2 modification
/// $X^T X + v_{new} v_{new}^T - v_{old} v_{old}^T = X^T X + F_1 F_2^T$ with $F_1 = (v_{new},
/// v_{old})$ and $F_2 = (v_{new}, -v_{old})$. The inverse is updated with the Woodbury identity
///
/// $$ (X^T X + F_1 F_2^T)^{-1} = M - M F_1 (I_2 + F_2^T M F_1)^{-1} F_2^T M, \quad M = (X^T X)^{-1}$$
///
/// and the determinant changes by the factor $\delta = \det(I_2 + F_2^T M F_1)$.
#[derive(Debug, Clone)]
pub struct InformationMatrix {
    xtx: Mat<f64>,
    xtxi: Mat<f64>,
    d_optimality: f64,
}

impl InformationMatrix {
    /// Builds the information matrix of a model matrix with full column rank.
    pub fn from_model_matrix(x: &Mat<f64>) -> Result<Self> {
        if rank(x) < x.ncols() {
            return Err(Error::SingularMatrix { mat: "X" });
        }
        let xtx = x.transpose() * x;
        let xtxi = inverse(&xtx, "XtX")?;
        let d_optimality = log_det(&xtxi, "XtXi")?;
        Ok(Self {
            xtx,
            xtxi,
            d_optimality,
        })
    }

    /// Inverse information matrix $(X^T X)^{-1}$.
    pub fn xtxi(&self) -> &Mat<f64> {
        &self.xtxi
    }

    /// Information matrix $X^T X$.
    pub fn xtx(&self) -> &Mat<f64> {
        &self.xtx
    }

    /// Running D-optimality $\ln \det (X^T X)^{-1}$, lower is better.
    pub fn d_optimality(&self) -> f64 {
        self.d_optimality
    }

    /// Returns the multiplicative change of $\det X^T X$ when the row `v_old` is replaced by
    /// `v_new`, both given as column vectors.
    ///
    /// With $a = v_{new}^T M v_{new}$, $r = v_{old}^T M v_{old}$ and $c = v_{new}^T M v_{old}$:
    /// $\delta = 1 + (a - r) + (c^2 - a r)$.
    pub fn delta(&self, v_new: &Mat<f64>, v_old: &Mat<f64>) -> f64 {
        let (added, removed, cov) = self.quadratic_forms(v_new, v_old);
        1. + (added - removed) + (cov * cov - added * removed)
    }

    /// Returns the same quantity as [InformationMatrix::delta] by evaluating the determinant of the
    /// updated information matrix. Singular updates yield zero.
    pub fn delta_by_reinversion(&self, v_new: &Mat<f64>, v_old: &Mat<f64>) -> f64 {
        let mut xtx = self.xtx.clone();
        xtx += v_new * v_new.transpose();
        xtx -= v_old * v_old.transpose();
        match log_det(&xtx, "XtX") {
            Ok(ln_det) => (ln_det + self.d_optimality).exp(),
            Err(_) => 0.,
        }
    }

    /// Returns delta computed with the given [DeltaMethod].
    pub fn delta_with(&self, method: DeltaMethod, v_new: &Mat<f64>, v_old: &Mat<f64>) -> f64 {
        match method {
            DeltaMethod::RankTwo => self.delta(v_new, v_old),
            DeltaMethod::Reinversion => self.delta_by_reinversion(v_new, v_old),
        }
    }

    /// Replaces the row `v_old` by `v_new`, updating the inverse by the rank-2 formula, and
    /// returns $\ln \delta$ by which the D-optimality decreased.
    ///
    /// Fails with [Error::SingularMatrix] if the exchange makes the information matrix
    /// numerically singular, leaving the state untouched.
    pub fn exchange(&mut self, v_new: &Mat<f64>, v_old: &Mat<f64>) -> Result<f64> {
        let p = self.xtxi.nrows();
        let a = &self.xtxi * v_new;
        let b = &self.xtxi * v_old;
        let added = v_new.col(0).transpose() * a.col(0);
        let removed = v_old.col(0).transpose() * b.col(0);
        let cov = v_new.col(0).transpose() * b.col(0);

        // I + F2^T M F1
        let small = mat![[1. + added, cov], [-cov, 1. - removed]];
        let delta = small[(0, 0)] * small[(1, 1)] - small[(0, 1)] * small[(1, 0)];
        if !delta.is_finite() || delta <= EPS_SQRT {
            return Err(Error::SingularMatrix { mat: "I + F2'XtXiF1" });
        }
        let small_inv = mat![
            [small[(1, 1)] / delta, -small[(0, 1)] / delta],
            [-small[(1, 0)] / delta, small[(0, 0)] / delta]
        ];
        let left = Mat::from_fn(p, 2, |i, j| if j == 0 { a[(i, 0)] } else { b[(i, 0)] });
        let right = Mat::from_fn(2, p, |i, j| if i == 0 { a[(j, 0)] } else { -b[(j, 0)] });
        let correction = &(&left * &small_inv) * &right;

        self.xtxi -= correction;
        self.xtx += v_new * v_new.transpose();
        self.xtx -= v_old * v_old.transpose();
        let ln_delta = delta.ln();
        self.d_optimality -= ln_delta;
        Ok(ln_delta)
    }

    fn quadratic_forms(&self, v_new: &Mat<f64>, v_old: &Mat<f64>) -> (f64, f64, f64) {
        let a = &self.xtxi * v_new;
        let b = &self.xtxi * v_old;
        let added = v_new.col(0).transpose() * a.col(0);
        let removed = v_old.col(0).transpose() * b.col(0);
        let cov = v_new.col(0).transpose() * b.col(0);
        (added, removed, cov)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Design, Model, ModelEvaluator, ModelOrder};

    const EQ_EPS: f64 = 1e-9;

    fn setup() -> (Model, Design) {
        let model = Model::from_order(2, ModelOrder::Quadratic, true);
        let design = Design::from_runs(&[
            vec![-1., -1.],
            vec![1., -1.],
            vec![-1., 1.],
            vec![1., 1.],
            vec![0., 0.],
            vec![0.5, -0.2],
            vec![-0.3, 0.8],
        ])
        .unwrap();
        (model, design)
    }

    fn assert_mat_eq(a: &Mat<f64>, b: &Mat<f64>) {
        assert_eq!((a.nrows(), a.ncols()), (b.nrows(), b.ncols()));
        for i in 0..a.nrows() {
            for j in 0..a.ncols() {
                assert!((a[(i, j)] - b[(i, j)]).abs() < EQ_EPS);
            }
        }
    }

    #[test]
    fn rank_two_delta_matches_reinversion() -> Result<()> {
        let (model, design) = setup();
        let info = InformationMatrix::from_model_matrix(&model.model_matrix(&design))?;
        let v_old = model.feature_vec(design.point(5));
        for candidate in [[0.9, 0.1], [-1., 0.], [0.5, -0.2], [0.2, 0.3]] {
            let v_new = model.feature_vec(&candidate);
            let rank_two = info.delta_with(DeltaMethod::RankTwo, &v_new, &v_old);
            let reinversion = info.delta_with(DeltaMethod::Reinversion, &v_new, &v_old);
            assert!((rank_two - reinversion).abs() < EQ_EPS);
        }
        Ok(())
    }

    #[test]
    fn unchanged_row_has_unit_delta() -> Result<()> {
        let (model, design) = setup();
        let info = InformationMatrix::from_model_matrix(&model.model_matrix(&design))?;
        let v = model.feature_vec(design.point(2));
        assert!((info.delta(&v, &v) - 1.).abs() < EQ_EPS);
        Ok(())
    }

    #[test]
    fn exchange_matches_full_inverse() -> Result<()> {
        let (model, mut design) = setup();
        let mut info = InformationMatrix::from_model_matrix(&model.model_matrix(&design))?;
        let v_old = model.feature_vec(design.point(4));
        let v_new = model.feature_vec(&[0.3, -0.9]);
        let delta = info.delta(&v_new, &v_old);
        let before = info.d_optimality();
        let ln_delta = info.exchange(&v_new, &v_old)?;
        assert!((ln_delta - delta.ln()).abs() < EQ_EPS);
        assert!((info.d_optimality() - (before - delta.ln())).abs() < EQ_EPS);

        design.set_coordinate(4, 0, 0.3);
        design.set_coordinate(4, 1, -0.9);
        let direct = InformationMatrix::from_model_matrix(&model.model_matrix(&design))?;
        assert_mat_eq(info.xtxi(), direct.xtxi());
        assert_mat_eq(info.xtx(), direct.xtx());
        assert!((info.d_optimality() - direct.d_optimality()).abs() < EQ_EPS);
        Ok(())
    }

    #[test]
    fn singular_model_matrix() {
        let model = Model::from_order(2, ModelOrder::Quadratic, true);
        let design = Design::from_runs(&[vec![-1., -1.], vec![1., 1.], vec![0., 0.]]).unwrap();
        let info = InformationMatrix::from_model_matrix(&model.model_matrix(&design));
        assert!(matches!(info, Err(Error::SingularMatrix { mat: "X" })));
    }

    #[test]
    fn exchange_into_singularity_fails() -> Result<()> {
        // six runs for six terms: replacing a run by a copy of another one is singular
        let model = Model::from_order(2, ModelOrder::Quadratic, true);
        let design = Design::from_runs(&[
            vec![-1., -1.],
            vec![1., -1.],
            vec![-1., 1.],
            vec![1., 1.],
            vec![0., 0.],
            vec![0.5, -0.2],
        ])?;
        let mut info = InformationMatrix::from_model_matrix(&model.model_matrix(&design))?;
        let v_old = model.feature_vec(design.point(5));
        let v_new = model.feature_vec(design.point(4));
        assert!(info.delta(&v_new, &v_old).abs() < EQ_EPS);
        let before = info.d_optimality();
        assert!(info.exchange(&v_new, &v_old).is_err());
        assert_eq!(info.d_optimality(), before);
        Ok(())
    }
}
