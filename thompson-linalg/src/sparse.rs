#![allow(clippy::needless_range_loop)]
//! Sparse matrix input backed by sprs.
//!
//! Precision blocks sometimes arrive in triplet/CSR form. They are only
//! ever converted to dense before factorization; no sparse arithmetic is
//! done here.

use sprs::{CsMatI, TriMat};

use crate::dense::DenseMatrix;

/// A sparse matrix wrapper around sprs CSR format.
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    inner: CsMatI<f64, usize>,
    nrows: usize,
    ncols: usize,
}

impl SparseMatrix {
    /// Create a sparse matrix from COO (coordinate) triplets.
    ///
    /// Duplicate coordinates are summed.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        rows: &[usize],
        cols: &[usize],
        vals: &[f64],
    ) -> Self {
        assert_eq!(rows.len(), cols.len());
        assert_eq!(rows.len(), vals.len());
        let mut tri = TriMat::new((nrows, ncols));
        for i in 0..rows.len() {
            tri.add_triplet(rows[i], cols[i], vals[i]);
        }
        let csr = tri.to_csr();
        Self {
            inner: csr,
            nrows,
            ncols,
        }
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Expand into a dense matrix; unstored entries become 0.0.
    pub fn to_dense(&self) -> DenseMatrix {
        let mut dense = DenseMatrix::zeros(self.nrows, self.ncols);
        for (&val, (i, j)) in self.inner.iter() {
            dense.set(i, j, dense.get(i, j) + val);
        }
        dense
    }
}
