#![allow(clippy::needless_range_loop)]
//! Matrix decompositions and solvers.
//!
//! Cholesky is the workhorse: both the ridge posterior and the forward
//! recursion factor a precision matrix and then run triangular solves
//! against the factor. QR (modified Gram-Schmidt) is kept as an
//! independent dense solver for checking those results.

use crate::dense::DenseMatrix;
use crate::triangular::{solve_lower, solve_lower_transpose};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinalgError {
    #[error("Matrix is not positive definite (pivot {pivot} = {value:.3e})")]
    NotPositiveDefinite { pivot: usize, value: f64 },

    #[error("Singular matrix encountered")]
    SingularMatrix,

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Result of a Cholesky decomposition.
#[derive(Debug, Clone)]
pub struct CholeskyDecomp {
    /// Lower triangular factor L such that A = L * L'.
    pub l: DenseMatrix,
}

impl CholeskyDecomp {
    /// Compute the Cholesky decomposition of a symmetric positive definite matrix.
    ///
    /// Only the lower triangle of `a` is read. Fails on the first pivot that
    /// is not strictly positive (or is NaN).
    pub fn new(a: &DenseMatrix) -> Result<Self, LinalgError> {
        let n = a.nrows();
        if n != a.ncols() {
            return Err(LinalgError::DimensionMismatch {
                expected: n,
                got: a.ncols(),
            });
        }
        let mut l = DenseMatrix::zeros(n, n);

        for j in 0..n {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l.get(j, k) * l.get(j, k);
            }
            let diag = a.get(j, j) - sum;
            if diag.is_nan() || diag <= 0.0 {
                return Err(LinalgError::NotPositiveDefinite {
                    pivot: j,
                    value: diag,
                });
            }
            l.set(j, j, diag.sqrt());

            for i in (j + 1)..n {
                let mut sum = 0.0;
                for k in 0..j {
                    sum += l.get(i, k) * l.get(j, k);
                }
                l.set(i, j, (a.get(i, j) - sum) / l.get(j, j));
            }
        }

        Ok(CholeskyDecomp { l })
    }

    /// Dimension of the factored matrix.
    pub fn dim(&self) -> usize {
        self.l.nrows()
    }

    /// Upper triangular factor R = L' such that A = R' * R.
    pub fn upper(&self) -> DenseMatrix {
        self.l.transpose()
    }

    /// Solve L * L' * x = b.
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let y = solve_lower(&self.l, b);
        solve_lower_transpose(&self.l, &y)
    }

    /// Compute the inverse of the original matrix A^{-1} = (L L')^{-1}.
    pub fn inverse(&self) -> DenseMatrix {
        let n = self.l.nrows();
        let mut inv = DenseMatrix::zeros(n, n);
        for j in 0..n {
            let mut e = vec![0.0; n];
            e[j] = 1.0;
            let col = self.solve(&e);
            inv.set_col(j, &col);
        }
        inv
    }
}

/// Result of a QR decomposition: A = Q * R.
pub struct QrDecomp {
    pub q: DenseMatrix,
    pub r: DenseMatrix,
}

impl QrDecomp {
    /// Compute the thin QR decomposition of an m x n matrix (m >= n).
    /// Uses modified Gram-Schmidt.
    pub fn new(a: &DenseMatrix) -> Result<Self, LinalgError> {
        let m = a.nrows();
        let n = a.ncols();
        if m < n {
            return Err(LinalgError::DimensionMismatch {
                expected: n,
                got: m,
            });
        }

        let mut q = DenseMatrix::zeros(m, n);
        let mut r = DenseMatrix::zeros(n, n);

        let mut cols: Vec<Vec<f64>> = (0..n).map(|j| a.col(j)).collect();

        for j in 0..n {
            for i in 0..j {
                let q_col = q.col(i);
                let rij = dot(&q_col, &cols[j]);
                r.set(i, j, rij);
                for k in 0..m {
                    cols[j][k] -= rij * q_col[k];
                }
            }

            let norm = dot(&cols[j], &cols[j]).sqrt();
            if norm < 1e-14 {
                return Err(LinalgError::SingularMatrix);
            }
            r.set(j, j, norm);
            for k in 0..m {
                q.set(k, j, cols[j][k] / norm);
            }
        }

        Ok(QrDecomp { q, r })
    }

    /// Solve R * x = Q' * b (least squares; exact for square A).
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let qtb = self.q.tr_mat_vec(b);
        crate::triangular::solve_upper(&self.r, &qtb)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
