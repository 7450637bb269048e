#![allow(clippy::needless_range_loop)]
//! Dense matrix operations backed by faer.
//!
//! Wraps faer's column-major Mat<f64> with the handful of products the
//! posterior routines need: A*B, A'*B, A*v, A'*v, element-wise sums and
//! differences, and column access.

use faer::Mat;
use serde::{Deserialize, Serialize};

/// A dense matrix wrapper around faer's `Mat<f64>`.
///
/// Serializes as `{ nrows, ncols, data }` with `data` in column-major order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DenseRepr", into = "DenseRepr")]
pub struct DenseMatrix {
    inner: Mat<f64>,
}

#[derive(Serialize, Deserialize)]
struct DenseRepr {
    nrows: usize,
    ncols: usize,
    data: Vec<f64>,
}

impl From<DenseMatrix> for DenseRepr {
    fn from(m: DenseMatrix) -> Self {
        DenseRepr {
            nrows: m.nrows(),
            ncols: m.ncols(),
            data: m.to_col_major(),
        }
    }
}

impl TryFrom<DenseRepr> for DenseMatrix {
    type Error = String;

    fn try_from(r: DenseRepr) -> Result<Self, Self::Error> {
        if r.data.len() != r.nrows * r.ncols {
            return Err(format!(
                "dense matrix data has {} entries, expected {}x{}",
                r.data.len(),
                r.nrows,
                r.ncols
            ));
        }
        Ok(DenseMatrix::from_col_major(r.nrows, r.ncols, r.data))
    }
}

impl DenseMatrix {
    /// Create a new dense matrix filled with zeros.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            inner: Mat::zeros(nrows, ncols),
        }
    }

    /// Create a dense matrix from a flat vec (column-major order).
    pub fn from_col_major(nrows: usize, ncols: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), nrows * ncols);
        let inner = Mat::from_fn(nrows, ncols, |i, j| data[j * nrows + i]);
        Self { inner }
    }

    /// Create a dense matrix from a 2D slice (row-major input).
    pub fn from_row_major(nrows: usize, ncols: usize, data: &[f64]) -> Self {
        assert_eq!(data.len(), nrows * ncols);
        let inner = Mat::from_fn(nrows, ncols, |i, j| data[i * ncols + j]);
        Self { inner }
    }

    /// Build a matrix by evaluating `f(row, col)` at every entry.
    pub fn from_fn(nrows: usize, ncols: usize, f: impl FnMut(usize, usize) -> f64) -> Self {
        Self {
            inner: Mat::from_fn(nrows, ncols, f),
        }
    }

    /// Create an identity matrix of size n x n.
    pub fn identity(n: usize) -> Self {
        let inner = Mat::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.0 });
        Self { inner }
    }

    /// Create a diagonal matrix from a vector.
    pub fn from_diag(diag: &[f64]) -> Self {
        let n = diag.len();
        let inner = Mat::from_fn(n, n, |i, j| if i == j { diag[i] } else { 0.0 });
        Self { inner }
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    /// `(nrows, ncols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    pub fn is_square(&self) -> bool {
        self.nrows() == self.ncols()
    }

    /// Get element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.inner.read(row, col)
    }

    /// Set element at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.inner.write(row, col, value);
    }

    /// Matrix-vector product: self * v -> result vector.
    pub fn mat_vec(&self, v: &[f64]) -> Vec<f64> {
        assert_eq!(self.ncols(), v.len());
        let n = self.nrows();
        let mut result = vec![0.0; n];
        for j in 0..self.ncols() {
            let vj = v[j];
            for i in 0..n {
                result[i] += self.inner.read(i, j) * vj;
            }
        }
        result
    }

    /// Transposed matrix-vector product: self' * v.
    pub fn tr_mat_vec(&self, v: &[f64]) -> Vec<f64> {
        assert_eq!(self.nrows(), v.len());
        let n = self.nrows();
        let mut result = vec![0.0; self.ncols()];
        for j in 0..self.ncols() {
            let mut s = 0.0;
            for i in 0..n {
                s += self.inner.read(i, j) * v[i];
            }
            result[j] = s;
        }
        result
    }

    /// Matrix-matrix product: self * other.
    pub fn mat_mul(&self, other: &DenseMatrix) -> DenseMatrix {
        assert_eq!(self.ncols(), other.nrows());
        let result = &self.inner * &other.inner;
        DenseMatrix { inner: result }
    }

    /// Cross product: self' * other, without materializing the transpose.
    pub fn tr_mul(&self, other: &DenseMatrix) -> DenseMatrix {
        assert_eq!(self.nrows(), other.nrows());
        let result = self.inner.transpose() * other.inner.as_ref();
        DenseMatrix { inner: result }
    }

    /// Gram matrix self' * self. The result is exactly symmetric.
    pub fn gram(&self) -> DenseMatrix {
        let n = self.nrows();
        let p = self.ncols();
        let mut result = DenseMatrix::zeros(p, p);
        for j in 0..p {
            for k in j..p {
                let mut s = 0.0;
                for i in 0..n {
                    s += self.inner.read(i, j) * self.inner.read(i, k);
                }
                result.set(j, k, s);
                if j != k {
                    result.set(k, j, s);
                }
            }
        }
        result
    }

    /// Transpose.
    pub fn transpose(&self) -> DenseMatrix {
        let inner = self.inner.transpose().to_owned();
        DenseMatrix { inner }
    }

    /// Extract column as a Vec<f64>.
    pub fn col(&self, j: usize) -> Vec<f64> {
        let n = self.nrows();
        let mut v = Vec::with_capacity(n);
        for i in 0..n {
            v.push(self.inner.read(i, j));
        }
        v
    }

    /// Set an entire column from a slice.
    pub fn set_col(&mut self, j: usize, data: &[f64]) {
        assert_eq!(data.len(), self.nrows());
        for i in 0..self.nrows() {
            self.inner.write(i, j, data[i]);
        }
    }

    /// Element-wise addition: self + other.
    pub fn add(&self, other: &DenseMatrix) -> DenseMatrix {
        assert_eq!(self.shape(), other.shape());
        let inner = Mat::from_fn(self.nrows(), self.ncols(), |i, j| {
            self.inner.read(i, j) + other.inner.read(i, j)
        });
        DenseMatrix { inner }
    }

    /// Element-wise subtraction: self - other.
    pub fn sub(&self, other: &DenseMatrix) -> DenseMatrix {
        assert_eq!(self.shape(), other.shape());
        let inner = Mat::from_fn(self.nrows(), self.ncols(), |i, j| {
            self.inner.read(i, j) - other.inner.read(i, j)
        });
        DenseMatrix { inner }
    }

    /// Largest absolute element-wise difference between two matrices.
    pub fn max_abs_diff(&self, other: &DenseMatrix) -> f64 {
        assert_eq!(self.shape(), other.shape());
        let mut worst = 0.0f64;
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                worst = worst.max((self.inner.read(i, j) - other.inner.read(i, j)).abs());
            }
        }
        worst
    }

    /// Extract column data as a flat Vec in column-major order.
    pub fn to_col_major(&self) -> Vec<f64> {
        let mut data = Vec::with_capacity(self.nrows() * self.ncols());
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                data.push(self.inner.read(i, j));
            }
        }
        data
    }
}

impl PartialEq for DenseMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape() && self.to_col_major() == other.to_col_major()
    }
}

impl std::fmt::Display for DenseMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for i in 0..self.nrows() {
            for j in 0..self.ncols() {
                if j > 0 {
                    write!(f, "\t")?;
                }
                write!(f, "{:.6}", self.inner.read(i, j))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
