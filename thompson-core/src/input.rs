//! Input representation for precision blocks.
//!
//! A block may arrive dense or sparse. It is resolved to a dense matrix
//! exactly once, at the call boundary; the recursion itself only ever
//! sees `DenseMatrix`.

use thompson_linalg::{DenseMatrix, SparseMatrix};

#[derive(Debug, Clone)]
pub enum PrecisionBlock {
    Dense(DenseMatrix),
    Sparse(SparseMatrix),
}

impl PrecisionBlock {
    pub fn nrows(&self) -> usize {
        match self {
            PrecisionBlock::Dense(m) => m.nrows(),
            PrecisionBlock::Sparse(m) => m.nrows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self {
            PrecisionBlock::Dense(m) => m.ncols(),
            PrecisionBlock::Sparse(m) => m.ncols(),
        }
    }

    /// Densify the block.
    pub fn to_dense(&self) -> DenseMatrix {
        match self {
            PrecisionBlock::Dense(m) => m.clone(),
            PrecisionBlock::Sparse(m) => m.to_dense(),
        }
    }

    /// Densify, reusing the buffer when already dense.
    pub fn into_dense(self) -> DenseMatrix {
        match self {
            PrecisionBlock::Dense(m) => m,
            PrecisionBlock::Sparse(m) => m.to_dense(),
        }
    }
}

impl From<DenseMatrix> for PrecisionBlock {
    fn from(m: DenseMatrix) -> Self {
        PrecisionBlock::Dense(m)
    }
}

impl From<SparseMatrix> for PrecisionBlock {
    fn from(m: SparseMatrix) -> Self {
        PrecisionBlock::Sparse(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_and_dense_agree() {
        let sparse =
            SparseMatrix::from_triplets(2, 2, &[0, 0, 1, 1], &[0, 1, 0, 1], &[3.0, 1.0, 1.0, 2.0]);
        let dense = DenseMatrix::from_row_major(2, 2, &[3.0, 1.0, 1.0, 2.0]);
        let a = PrecisionBlock::from(sparse);
        let b = PrecisionBlock::from(dense.clone());
        assert_eq!((a.nrows(), a.ncols()), (2, 2));
        assert_eq!(a.to_dense(), dense);
        assert_eq!(b.into_dense(), dense);
        assert_eq!(a.into_dense(), dense);
    }
}
