#![allow(clippy::needless_range_loop)]
//! Forward and backward substitution.
//!
//! Each solver reads only the relevant triangle of its factor, so a full
//! matrix may be passed and the other triangle is ignored. Transposed
//! variants solve against the transpose without forming it.
//!
//! Callers guarantee a non-zero diagonal (Cholesky factors of PD matrices
//! always have one).

use crate::dense::DenseMatrix;

/// Solve L * x = b by forward substitution (L lower-triangular).
pub fn solve_lower(l: &DenseMatrix, b: &[f64]) -> Vec<f64> {
    let n = l.nrows();
    assert!(l.is_square());
    assert_eq!(b.len(), n);
    let mut x = vec![0.0; n];
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l.get(i, j) * x[j];
        }
        x[i] = (b[i] - sum) / l.get(i, i);
    }
    x
}

/// Solve L' * x = b by backward substitution (L lower-triangular).
pub fn solve_lower_transpose(l: &DenseMatrix, b: &[f64]) -> Vec<f64> {
    let n = l.nrows();
    assert!(l.is_square());
    assert_eq!(b.len(), n);
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l.get(j, i) * x[j];
        }
        x[i] = (b[i] - sum) / l.get(i, i);
    }
    x
}

/// Solve L * X = B column by column (L lower-triangular).
pub fn solve_lower_mat(l: &DenseMatrix, b: &DenseMatrix) -> DenseMatrix {
    assert_eq!(l.nrows(), b.nrows());
    let mut x = DenseMatrix::zeros(b.nrows(), b.ncols());
    for j in 0..b.ncols() {
        let col = solve_lower(l, &b.col(j));
        x.set_col(j, &col);
    }
    x
}

/// Solve R * x = b by backward substitution (R upper-triangular).
pub fn solve_upper(r: &DenseMatrix, b: &[f64]) -> Vec<f64> {
    let n = r.nrows();
    assert!(r.is_square());
    assert_eq!(b.len(), n);
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += r.get(i, j) * x[j];
        }
        x[i] = (b[i] - sum) / r.get(i, i);
    }
    x
}

/// Solve R' * x = b by forward substitution (R upper-triangular).
pub fn solve_upper_transpose(r: &DenseMatrix, b: &[f64]) -> Vec<f64> {
    let n = r.nrows();
    assert!(r.is_square());
    assert_eq!(b.len(), n);
    let mut x = vec![0.0; n];
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += r.get(j, i) * x[j];
        }
        x[i] = (b[i] - sum) / r.get(i, i);
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower() -> DenseMatrix {
        DenseMatrix::from_row_major(3, 3, &[2.0, 0.0, 0.0, 1.0, 3.0, 0.0, -1.0, 0.5, 4.0])
    }

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for i in 0..a.len() {
            assert!((a[i] - b[i]).abs() < 1e-12, "[{}]: {} vs {}", i, a[i], b[i]);
        }
    }

    #[test]
    fn test_solve_lower() {
        let l = lower();
        let b = vec![2.0, 7.0, 3.0];
        let x = solve_lower(&l, &b);
        assert_close(&l.mat_vec(&x), &b);
    }

    #[test]
    fn test_solve_lower_transpose() {
        let l = lower();
        let b = vec![1.0, -2.0, 5.0];
        let x = solve_lower_transpose(&l, &b);
        assert_close(&l.transpose().mat_vec(&x), &b);
    }

    #[test]
    fn test_solve_lower_ignores_upper_triangle() {
        let mut l = lower();
        l.set(0, 2, 99.0);
        let x = solve_lower(&l, &[2.0, 7.0, 3.0]);
        assert_close(&x, &solve_lower(&lower(), &[2.0, 7.0, 3.0]));
    }

    #[test]
    fn test_solve_lower_mat() {
        let l = lower();
        let b = DenseMatrix::from_row_major(3, 2, &[1.0, 0.0, 0.0, 1.0, 2.0, 2.0]);
        let x = solve_lower_mat(&l, &b);
        assert!(l.mat_mul(&x).max_abs_diff(&b) < 1e-12);
    }

    #[test]
    fn test_solve_upper_pair() {
        let r = lower().transpose();
        let b = vec![4.0, 1.0, -3.0];
        let x = solve_upper(&r, &b);
        assert_close(&r.mat_vec(&x), &b);
        let y = solve_upper_transpose(&r, &b);
        assert_close(&r.transpose().mat_vec(&y), &b);
    }
}
