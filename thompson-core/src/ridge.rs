//! Posterior draws for Bayesian ridge regression.
//!
//! With a Gaussian likelihood y ~ N(X b, I) and prior precision K, the
//! posterior of b is N(mu, Q^{-1}) where
//!   Q  = X'X + K
//!   mu = Q^{-1} X'y
//! With Q = R'R (R upper triangular) the mean comes from two triangular
//! solves, R'w = X'y then R mu = w, and a draw is mu + v with R v = z for
//! z ~ N(0, I), since Var(R^{-1} z) = (R'R)^{-1} = Q^{-1}.

use thompson_linalg::triangular::{solve_upper, solve_upper_transpose};
use thompson_linalg::{CholeskyDecomp, DenseMatrix};
use tracing::warn;

use crate::error::{check_dim, PosteriorError, Result};
use crate::normal::NormalSource;

/// Factored ridge posterior, reusable across many draws.
#[derive(Debug, Clone)]
pub struct RidgePosterior {
    chol: CholeskyDecomp,
    r: DenseMatrix,
    mean: Vec<f64>,
}

impl RidgePosterior {
    /// Factor Q = X'X + K and solve for the posterior mean.
    ///
    /// # Arguments
    /// - `x`: Design matrix (n x k)
    /// - `k`: Symmetric PSD penalty matrix (k x k)
    /// - `y`: Response, length n
    pub fn new(x: &DenseMatrix, k: &DenseMatrix, y: &[f64]) -> Result<Self> {
        let p = x.ncols();
        if p == 0 {
            return Err(PosteriorError::Precondition(
                "design matrix has no columns".to_string(),
            ));
        }
        check_dim("rows of X vs length of y", x.nrows(), y.len())?;
        check_dim("rows of K vs columns of X", p, k.nrows())?;
        check_dim("columns of K vs columns of X", p, k.ncols())?;

        let q = x.gram().add(k);
        let chol = CholeskyDecomp::new(&q).map_err(|e| {
            warn!("Ridge precision factorization failed: {}", e);
            PosteriorError::RidgeFactorization(e)
        })?;
        let r = chol.upper();

        let xty = x.tr_mat_vec(y);
        let w = solve_upper_transpose(&r, &xty);
        let mean = solve_upper(&r, &w);

        Ok(Self { chol, r, mean })
    }

    /// Number of coefficients.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Posterior mean (X'X + K)^{-1} X'y.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Upper Cholesky factor R with R'R = X'X + K.
    pub fn upper_factor(&self) -> &DenseMatrix {
        &self.r
    }

    /// Posterior covariance (X'X + K)^{-1}.
    pub fn covariance(&self) -> DenseMatrix {
        self.chol.inverse()
    }

    /// Turn a standard-normal vector `z` into a posterior draw.
    pub fn sample_with(&self, z: &[f64]) -> Result<Vec<f64>> {
        check_dim("length of standard-normal draw", self.dim(), z.len())?;
        let v = solve_upper(&self.r, z);
        Ok(self.mean.iter().zip(v.iter()).map(|(m, vi)| m + vi).collect())
    }

    /// Draw once, pulling `z` from the injected source.
    pub fn sample<N: NormalSource + ?Sized>(&self, normals: &mut N) -> Result<Vec<f64>> {
        let z = normals.draw_standard_normal(self.dim());
        self.sample_with(&z)
    }
}

/// Draw one sample of the ridge regression coefficients.
pub fn ridge_regression_sample<N: NormalSource + ?Sized>(
    x: &DenseMatrix,
    k: &DenseMatrix,
    y: &[f64],
    normals: &mut N,
) -> Result<Vec<f64>> {
    RidgePosterior::new(x, k, y)?.sample(normals)
}

/// Same as [`ridge_regression_sample`] with the standard-normal vector given.
pub fn ridge_regression_sample_with(
    x: &DenseMatrix,
    k: &DenseMatrix,
    y: &[f64],
    z: &[f64],
) -> Result<Vec<f64>> {
    check_dim("length of standard-normal draw", x.ncols(), z.len())?;
    RidgePosterior::new(x, k, y)?.sample_with(z)
}

/// Posterior mean (X'X + K)^{-1} X'y alone.
pub fn ridge_posterior_mean(x: &DenseMatrix, k: &DenseMatrix, y: &[f64]) -> Result<Vec<f64>> {
    Ok(RidgePosterior::new(x, k, y)?.mean)
}
