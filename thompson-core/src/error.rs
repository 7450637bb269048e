//! Error type shared by the ridge sampler and the forward recursion.

use thiserror::Error;
use thompson_linalg::LinalgError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PosteriorError {
    /// Inputs disagree on shape or are empty. Raised before any arithmetic.
    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Ridge precision X'X + K is not positive definite: {0}")]
    RidgeFactorization(#[source] LinalgError),

    #[error("Reduced precision block at step {step} is not positive definite: {source}")]
    StepFactorization {
        step: usize,
        #[source]
        source: LinalgError,
    },
}

impl PosteriorError {
    /// Step index at which the forward recursion failed, if any.
    pub fn step(&self) -> Option<usize> {
        match self {
            PosteriorError::StepFactorization { step, .. } => Some(*step),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PosteriorError>;

/// Fail with a precondition error unless `got == expected`.
pub(crate) fn check_dim(what: &str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(PosteriorError::Precondition(format!(
            "{}: expected {}, got {}",
            what, expected, got
        )));
    }
    Ok(())
}
