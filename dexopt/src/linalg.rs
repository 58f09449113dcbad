use crate::{Error, Result};
use faer::{
    Conj, Mat,
    linalg::solvers::{Solve, SolveLstsqCore},
};

/// Square root of the machine epsilon, the threshold below which a column is treated as
/// linearly dependent.
pub const EPS_SQRT: f64 = 1.490_116_119_384_765_6e-8;

fn select_columns(x: &Mat<f64>, columns: &[usize]) -> Mat<f64> {
    Mat::from_fn(x.nrows(), columns.len(), |i, j| x[(i, columns[j])])
}

#[cfg_attr(doc, katexit::katexit)]
/// Returns the indices of a maximal set of linearly independent columns of $X$.
///
/// Walks the diagonal of the triangular factor of $X = QR$. As long as all preceding columns are
/// independent, $|R_{jj}|$ is the distance of column $j$ to their span, so column $j$ enters the
/// basis if it exceeds `tol`. A dependent column is dropped and the factorization is repeated on
/// the basis followed by the remaining columns. The result is the leftmost full-rank column
/// subset and its length never exceeds the number of rows.
pub fn independent_columns(x: &Mat<f64>, tol: f64) -> Vec<usize> {
    let nrows = x.nrows();
    let mut basis: Vec<usize> = Vec::with_capacity(x.ncols().min(nrows));
    let mut next = 0;
    while next < x.ncols() && basis.len() < nrows {
        let candidates = basis
            .iter()
            .copied()
            .chain(next..x.ncols())
            .collect::<Vec<usize>>();
        let r = select_columns(x, &candidates).qr().R().to_owned();
        let mut dependent = None;
        for k in basis.len()..candidates.len().min(nrows) {
            if r[(k, k)].abs() > tol {
                basis.push(candidates[k]);
            } else {
                dependent = Some(candidates[k]);
                break;
            }
        }
        match dependent {
            Some(col) => next = col + 1,
            None => break,
        }
    }
    basis
}

/// Returns the numerical rank of a matrix, see [independent_columns].
pub fn rank(x: &Mat<f64>) -> usize {
    independent_columns(x, EPS_SQRT).len()
}

/// Returns the inverse of a square matrix or [Error::SingularMatrix].
pub fn inverse(m: &Mat<f64>, name: &'static str) -> Result<Mat<f64>> {
    if m.nrows() != m.ncols() {
        return Err(Error::ShapeMismatch {
            mat1: name,
            mat2: name,
            dim1: 0,
            dim2: 1,
            shape1: (m.nrows(), m.ncols()),
            shape2: (m.nrows(), m.ncols()),
        });
    }
    let n = m.nrows();
    if rank(m) < n {
        return Err(Error::SingularMatrix { mat: name });
    }
    let inv = m.partial_piv_lu().solve(Mat::<f64>::identity(n, n));
    let finite = (0..n).all(|j| (0..n).all(|i| inv[(i, j)].is_finite()));
    if finite {
        Ok(inv)
    } else {
        Err(Error::SingularMatrix { mat: name })
    }
}

#[cfg_attr(doc, katexit::katexit)]
/// Returns $\ln \det M$ of a symmetric positive definite matrix or [Error::SingularMatrix].
///
/// The determinant is taken of the unit-diagonal scaling $C = D^{-1/2} M D^{-1/2}$ with
/// $D = \operatorname{diag}(M)$, so $\ln \det M = \sum_i \ln M_{ii} + \ln \det C$ does not
/// overflow or underflow for large information matrices.
pub fn log_det(m: &Mat<f64>, name: &'static str) -> Result<f64> {
    let n = m.nrows();
    let diag = (0..n).map(|i| m[(i, i)]).collect::<Vec<f64>>();
    if diag.iter().any(|d| !d.is_finite() || *d <= 0.) {
        return Err(Error::SingularMatrix { mat: name });
    }
    let scale = diag.iter().map(|d| d.sqrt()).collect::<Vec<f64>>();
    let c = Mat::from_fn(n, n, |i, j| m[(i, j)] / (scale[i] * scale[j]));
    let det = c.determinant();
    if det.is_finite() && det > 0. {
        Ok(diag.iter().map(|d| d.ln()).sum::<f64>() + det.ln())
    } else {
        Err(Error::SingularMatrix { mat: name })
    }
}

#[cfg_attr(doc, katexit::katexit)]
/// Returns the least squares solution $C$ of $A C = B$ for a matrix $A$ with full column rank.
///
/// Solves $R C = Q^T B$ with the QR decomposition of $A$. Rank deficiency is detected with the
/// same tolerance as [independent_columns] uses, so any basis it returns is accepted here.
pub fn lstsq(a: &Mat<f64>, b: &Mat<f64>) -> Result<Mat<f64>> {
    if a.nrows() != b.nrows() {
        return Err(Error::ShapeMismatch {
            mat1: "a",
            mat2: "b",
            dim1: 0,
            dim2: 0,
            shape1: (a.nrows(), a.ncols()),
            shape2: (b.nrows(), b.ncols()),
        });
    }
    if rank(a) < a.ncols() {
        return Err(Error::SingularMatrix { mat: "A" });
    }
    let mut out = b.clone();
    a.qr()
        .solve_lstsq_in_place_with_conj(Conj::No, out.as_mut());
    out.truncate(a.ncols(), b.ncols());
    Ok(out)
}
