//! thompson-linalg: Linear algebra wrappers for thompson-rs
//!
//! Provides the dense matrix type, sparse input conversion, Cholesky and
//! QR decompositions, and the triangular solves shared by the ridge
//! sampler and the forward recursion.

pub mod dense;
pub mod sparse;
pub mod decomposition;
pub mod triangular;

pub use decomposition::{CholeskyDecomp, LinalgError};
pub use dense::DenseMatrix;
pub use sparse::SparseMatrix;
