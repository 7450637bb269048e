//! thompson-core: Posterior computation for linear-Gaussian models
//!
//! Two independent routines built on the Cholesky and triangular-solve
//! layer in `thompson-linalg`:
//! - a one-shot posterior draw of ridge regression coefficients, and
//! - the forward pass of the Thompson recursion for block-tridiagonal
//!   precision systems (dynamic linear model smoothing).
//!
//! Both are pure per call; `batch` fans independent calls out over rayon.

pub mod batch;
pub mod error;
pub mod forward;
pub mod input;
pub mod normal;
pub mod ridge;

pub use error::{PosteriorError, Result};
pub use forward::{thompson_forward, thompson_forward_dense, ForwardPass, StepRecord};
pub use input::PrecisionBlock;
pub use normal::{FixedNormals, NormalSource, RngNormalSource};
pub use ridge::{
    ridge_posterior_mean, ridge_regression_sample, ridge_regression_sample_with, RidgePosterior,
};
