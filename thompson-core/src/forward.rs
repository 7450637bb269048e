//! Forward pass of the Thompson recursion (McCausland, Miller & Pelletier).
//!
//! For a block-tridiagonal precision system with diagonal blocks
//! Omega_tt and a constant off-diagonal block Omega_{t,t-1}, the forward
//! pass computes for t = 0..n-1:
//!
//!   Sigma_tt = Omega_tt - LO_{t-1}' LO_{t-1}      (Sigma_00 = Omega_00)
//!   L_t      = chol(Sigma_tt)
//!   LO_t     = L_t^{-1} Omega_{t,t-1}
//!   m_t      = Sigma_tt^{-1} (c_t - Omega_{t,t-1} m_{t-1})   (m_0 = Sigma_00^{-1} c_0)
//!
//! Each step depends on the previous step's LO and m, so the pass is a
//! strict left fold. The backward sampling pass consumes its output.

use serde::{Deserialize, Serialize};
use thompson_linalg::triangular::{solve_lower, solve_lower_mat, solve_lower_transpose};
use thompson_linalg::{CholeskyDecomp, DenseMatrix};
use tracing::{debug, warn};

use crate::error::{check_dim, PosteriorError, Result};
use crate::input::PrecisionBlock;

/// Output of one forward step. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Lower Cholesky factor of the reduced precision block.
    pub l: DenseMatrix,
    /// L_t^{-1} Omega_{t,t-1}.
    pub lo: DenseMatrix,
    /// Filtered mean.
    pub m: Vec<f64>,
}

impl StepRecord {
    /// First step: factor Omega_00 directly.
    ///
    /// Shapes are checked against `omega.nrows()`; a mismatch is a
    /// [`PosteriorError::Precondition`].
    pub fn initial(omega: &DenseMatrix, c: &[f64], coupling: &DenseMatrix) -> Result<Self> {
        check_step_shapes(0, omega, c, coupling)?;
        Self::from_reduced(0, omega, c.to_vec(), coupling)
    }

    /// Advance the recursion by one block, using this record as the carry.
    ///
    /// The reduced block Omega_tt - LO'LO is factored reading only its lower
    /// triangle, so rounding asymmetry in the upper triangle is ignored.
    pub fn advance(
        &self,
        step: usize,
        omega: &DenseMatrix,
        c: &[f64],
        coupling: &DenseMatrix,
    ) -> Result<Self> {
        check_step_shapes(step, omega, c, coupling)?;
        let k = omega.nrows();
        check_dim("rows of carried LO", k, self.lo.nrows())?;
        check_dim("columns of carried LO", k, self.lo.ncols())?;
        check_dim("length of carried mean", k, self.m.len())?;

        let reduced = omega.sub(&self.lo.tr_mul(&self.lo));
        let propagated = coupling.mat_vec(&self.m);
        let c_reduced: Vec<f64> = c
            .iter()
            .zip(propagated.iter())
            .map(|(ci, pi)| ci - pi)
            .collect();
        Self::from_reduced(step, &reduced, c_reduced, coupling)
    }

    fn from_reduced(
        step: usize,
        sigma: &DenseMatrix,
        c: Vec<f64>,
        coupling: &DenseMatrix,
    ) -> Result<Self> {
        let chol = CholeskyDecomp::new(sigma).map_err(|source| {
            warn!("Cholesky failed at forward step {}: {}", step, source);
            PosteriorError::StepFactorization { step, source }
        })?;
        let l = chol.l;
        let lo = solve_lower_mat(&l, coupling);
        let w = solve_lower(&l, &c);
        let m = solve_lower_transpose(&l, &w);
        debug!("Forward step {} done (k={})", step, l.nrows());
        Ok(Self { l, lo, m })
    }
}

/// All step records of one forward pass, in step order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardPass {
    pub steps: Vec<StepRecord>,
}

impl ForwardPass {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Cholesky factors L_t.
    pub fn factors(&self) -> Vec<&DenseMatrix> {
        self.steps.iter().map(|s| &s.l).collect()
    }

    /// Coupling-solved matrices LO_t.
    pub fn coupling_solved(&self) -> Vec<&DenseMatrix> {
        self.steps.iter().map(|s| &s.lo).collect()
    }

    /// Filtered means m_t.
    pub fn means(&self) -> Vec<&[f64]> {
        self.steps.iter().map(|s| s.m.as_slice()).collect()
    }

    /// Split into the three parallel sequences (L, LO, m).
    pub fn into_parts(self) -> (Vec<DenseMatrix>, Vec<DenseMatrix>, Vec<Vec<f64>>) {
        let n = self.steps.len();
        let mut ls = Vec::with_capacity(n);
        let mut los = Vec::with_capacity(n);
        let mut ms = Vec::with_capacity(n);
        for s in self.steps {
            ls.push(s.l);
            los.push(s.lo);
            ms.push(s.m);
        }
        (ls, los, ms)
    }
}

/// Run the forward pass. Blocks may be dense or sparse; each is densified
/// once before the recursion starts.
///
/// # Arguments
/// - `omega_tt`: Diagonal precision blocks, n >= 1, each k x k
/// - `c`: Linear terms, length n, each of length k
/// - `coupling`: Off-diagonal block Omega_{t,t-1} (k x k), same at every step
pub fn thompson_forward(
    omega_tt: &[PrecisionBlock],
    c: &[Vec<f64>],
    coupling: &DenseMatrix,
) -> Result<ForwardPass> {
    let shapes: Vec<(usize, usize)> = omega_tt.iter().map(|b| (b.nrows(), b.ncols())).collect();
    validate(&shapes, c, coupling)?;
    let dense: Vec<DenseMatrix> = omega_tt.iter().map(PrecisionBlock::to_dense).collect();
    fold_steps(&dense, c, coupling)
}

/// [`thompson_forward`] for blocks that are already dense.
pub fn thompson_forward_dense(
    omega_tt: &[DenseMatrix],
    c: &[Vec<f64>],
    coupling: &DenseMatrix,
) -> Result<ForwardPass> {
    let shapes: Vec<(usize, usize)> = omega_tt.iter().map(|b| (b.nrows(), b.ncols())).collect();
    validate(&shapes, c, coupling)?;
    fold_steps(omega_tt, c, coupling)
}

fn fold_steps(
    omega_tt: &[DenseMatrix],
    c: &[Vec<f64>],
    coupling: &DenseMatrix,
) -> Result<ForwardPass> {
    let mut steps: Vec<StepRecord> = Vec::with_capacity(omega_tt.len());
    for (t, (omega, ct)) in omega_tt.iter().zip(c.iter()).enumerate() {
        let next = match steps.last() {
            None => StepRecord::initial(omega, ct, coupling)?,
            Some(prev) => prev.advance(t, omega, ct, coupling)?,
        };
        steps.push(next);
    }

    Ok(ForwardPass { steps })
}

/// Shape checks over `(nrows, ncols)` of every block, run before any block
/// is densified or factored.
fn validate(shapes: &[(usize, usize)], c: &[Vec<f64>], coupling: &DenseMatrix) -> Result<()> {
    let &(k, _) = shapes.first().ok_or_else(|| {
        PosteriorError::Precondition("forward recursion needs at least one block".to_string())
    })?;
    check_dim("number of linear terms vs precision blocks", shapes.len(), c.len())?;

    if k == 0 {
        return Err(PosteriorError::Precondition(
            "precision blocks are empty".to_string(),
        ));
    }
    check_dim("rows of coupling matrix", k, coupling.nrows())?;
    check_dim("columns of coupling matrix", k, coupling.ncols())?;
    for (t, (&(nrows, ncols), ct)) in shapes.iter().zip(c.iter()).enumerate() {
        check_dim(&format!("rows of precision block {}", t), k, nrows)?;
        check_dim(&format!("columns of precision block {}", t), k, ncols)?;
        check_dim(&format!("length of linear term {}", t), k, ct.len())?;
    }
    Ok(())
}

/// Per-step shape checks for callers driving the fold by hand.
fn check_step_shapes(
    step: usize,
    omega: &DenseMatrix,
    c: &[f64],
    coupling: &DenseMatrix,
) -> Result<()> {
    let k = omega.nrows();
    if k == 0 {
        return Err(PosteriorError::Precondition(format!(
            "precision block {} is empty",
            step
        )));
    }
    check_dim(&format!("columns of precision block {}", step), k, omega.ncols())?;
    check_dim(&format!("length of linear term {}", step), k, c.len())?;
    check_dim("rows of coupling matrix", k, coupling.nrows())?;
    check_dim("columns of coupling matrix", k, coupling.ncols())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use thompson_linalg::SparseMatrix;

    fn block(a: f64, b: f64, d: f64) -> DenseMatrix {
        DenseMatrix::from_row_major(2, 2, &[a, b, b, d])
    }

    #[test]
    fn test_single_step_known_values() {
        let omega = vec![PrecisionBlock::Dense(DenseMatrix::from_diag(&[2.0, 2.0]))];
        let c = vec![vec![4.0, 4.0]];
        let coupling = DenseMatrix::from_row_major(2, 2, &[0.5, 0.0, 0.1, 0.5]);
        let pass = thompson_forward(&omega, &c, &coupling).unwrap();

        assert_eq!(pass.len(), 1);
        let s = 2.0f64.sqrt();
        let l = &pass.steps[0].l;
        assert!((l.get(0, 0) - s).abs() < 1e-12);
        assert!((l.get(1, 1) - s).abs() < 1e-12);
        assert_eq!(l.get(1, 0), 0.0);
        assert_eq!(l.get(0, 1), 0.0);
        assert!((pass.steps[0].m[0] - 2.0).abs() < 1e-12);
        assert!((pass.steps[0].m[1] - 2.0).abs() < 1e-12);
        // LO_0 = L_0^{-1} Omega_{t,t-1} = coupling / sqrt(2)
        let expected_lo = DenseMatrix::from_row_major(2, 2, &[0.5 / s, 0.0, 0.1 / s, 0.5 / s]);
        assert!(pass.steps[0].lo.max_abs_diff(&expected_lo) < 1e-12);
    }

    #[test]
    fn test_second_step_hand_computed() {
        // k = 1: Omega_00 = 4, Omega_11 = 5, coupling = 2, c = [8, 3]
        // L_0 = 2, LO_0 = 1, m_0 = 2
        // Sigma_11 = 5 - 1 = 4, L_1 = 2, LO_1 = 1, c_red = 3 - 2*2 = -1, m_1 = -1/4
        let omega = vec![DenseMatrix::from_diag(&[4.0]), DenseMatrix::from_diag(&[5.0])];
        let c = vec![vec![8.0], vec![3.0]];
        let coupling = DenseMatrix::from_diag(&[2.0]);
        let pass = thompson_forward_dense(&omega, &c, &coupling).unwrap();
        assert_eq!(pass.len(), 2);
        assert!((pass.steps[0].m[0] - 2.0).abs() < 1e-12);
        assert!((pass.steps[1].l.get(0, 0) - 2.0).abs() < 1e-12);
        assert!((pass.steps[1].lo.get(0, 0) - 1.0).abs() < 1e-12);
        assert!((pass.steps[1].m[0] + 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_factor_invariants() {
        let omega = vec![
            block(4.0, 1.0, 3.0),
            block(5.0, 0.5, 4.0),
            block(6.0, -1.0, 5.0),
        ];
        let c = vec![vec![1.0, 2.0], vec![-1.0, 0.5], vec![0.0, 3.0]];
        let coupling = block(-1.0, 0.3, -0.8);
        let pass = thompson_forward_dense(&omega, &c, &coupling).unwrap();

        let llt0 = pass.steps[0].l.mat_mul(&pass.steps[0].l.transpose());
        assert!(llt0.max_abs_diff(&omega[0]) < 1e-12);
        for t in 1..3 {
            let prev = &pass.steps[t - 1].lo;
            let expected = omega[t].sub(&prev.tr_mul(prev));
            let got = pass.steps[t].l.mat_mul(&pass.steps[t].l.transpose());
            assert!(got.max_abs_diff(&expected) < 1e-12, "step {}", t);
            let l_lo = pass.steps[t].l.mat_mul(&pass.steps[t].lo);
            assert!(l_lo.max_abs_diff(&coupling) < 1e-12, "step {}", t);
        }
    }

    #[test]
    fn test_sparse_first_block_matches_dense() {
        let dense_blocks = vec![block(4.0, 1.0, 3.0), block(5.0, 0.5, 4.0)];
        let sparse_first = SparseMatrix::from_triplets(
            2,
            2,
            &[0, 0, 1, 1],
            &[0, 1, 0, 1],
            &[4.0, 1.0, 1.0, 3.0],
        );
        let mixed = vec![
            PrecisionBlock::Sparse(sparse_first),
            PrecisionBlock::Dense(dense_blocks[1].clone()),
        ];
        let c = vec![vec![1.0, 2.0], vec![0.5, -0.5]];
        let coupling = block(-1.0, 0.2, -1.0);
        let a = thompson_forward(&mixed, &c, &coupling).unwrap();
        let b = thompson_forward_dense(&dense_blocks, &c, &coupling).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_non_pd_reduction_reports_step() {
        // Omega_11 = 1 but LO_0'LO_0 = 4 => Sigma_11 = -3
        let omega = vec![
            DenseMatrix::from_diag(&[1.0]),
            DenseMatrix::from_diag(&[1.0]),
            DenseMatrix::from_diag(&[10.0]),
        ];
        let c = vec![vec![0.0], vec![0.0], vec![0.0]];
        let coupling = DenseMatrix::from_diag(&[2.0]);
        let err = thompson_forward_dense(&omega, &c, &coupling).unwrap_err();
        assert_eq!(err.step(), Some(1));
        assert!(matches!(err, PosteriorError::StepFactorization { step: 1, .. }));
    }

    #[test]
    fn test_non_pd_first_block_reports_step_zero() {
        let omega = vec![block(1.0, 2.0, 1.0)];
        let c = vec![vec![0.0, 0.0]];
        let err = thompson_forward_dense(&omega, &c, &DenseMatrix::identity(2)).unwrap_err();
        assert_eq!(err.step(), Some(0));
    }

    #[test]
    fn test_preconditions() {
        let coupling = DenseMatrix::identity(2);
        let empty: Vec<DenseMatrix> = Vec::new();
        assert!(matches!(
            thompson_forward_dense(&empty, &[], &coupling),
            Err(PosteriorError::Precondition(_))
        ));

        let omega = vec![DenseMatrix::identity(2), DenseMatrix::identity(2)];
        assert!(matches!(
            thompson_forward_dense(&omega, &[vec![0.0, 0.0]], &coupling),
            Err(PosteriorError::Precondition(_))
        ));
        assert!(matches!(
            thompson_forward_dense(&omega, &[vec![0.0, 0.0], vec![0.0]], &coupling),
            Err(PosteriorError::Precondition(_))
        ));
        assert!(matches!(
            thompson_forward_dense(
                &omega,
                &[vec![0.0, 0.0], vec![0.0, 0.0]],
                &DenseMatrix::identity(3)
            ),
            Err(PosteriorError::Precondition(_))
        ));
        let ragged = vec![DenseMatrix::identity(2), DenseMatrix::identity(3)];
        assert!(matches!(
            thompson_forward_dense(&ragged, &[vec![0.0, 0.0], vec![0.0, 0.0]], &coupling),
            Err(PosteriorError::Precondition(_))
        ));
    }

    #[test]
    fn test_step_record_rejects_mismatched_shapes() {
        let i2 = DenseMatrix::identity(2);
        assert!(matches!(
            StepRecord::initial(&i2, &[1.0], &i2),
            Err(PosteriorError::Precondition(_))
        ));
        assert!(matches!(
            StepRecord::initial(&i2, &[1.0, 1.0], &DenseMatrix::identity(3)),
            Err(PosteriorError::Precondition(_))
        ));
        assert!(matches!(
            StepRecord::initial(&DenseMatrix::zeros(2, 3), &[1.0, 1.0], &i2),
            Err(PosteriorError::Precondition(_))
        ));

        let first = StepRecord::initial(&block(4.0, 1.0, 3.0), &[1.0, 2.0], &i2).unwrap();
        // Block of a different size than the carried LO and m
        assert!(matches!(
            first.advance(1, &DenseMatrix::identity(3), &[1.0, 1.0, 1.0], &i2),
            Err(PosteriorError::Precondition(_))
        ));
        assert!(matches!(
            first.advance(1, &i2, &[1.0], &i2),
            Err(PosteriorError::Precondition(_))
        ));
        // Well-shaped step still goes through
        assert!(first.advance(1, &block(5.0, 0.5, 4.0), &[0.5, -0.5], &i2).is_ok());
    }

    #[test]
    fn test_advance_reads_lower_triangle_of_reduced_block() {
        let i2 = DenseMatrix::identity(2);
        let first = StepRecord::initial(&block(4.0, 1.0, 3.0), &[1.0, 2.0], &i2).unwrap();
        let symmetric = block(5.0, 0.5, 4.0);
        // Perturb only the upper off-diagonal entry
        let mut skewed = symmetric.clone();
        skewed.set(0, 1, 0.5 + 1e-9);
        let a = first.advance(1, &symmetric, &[0.5, -0.5], &i2).unwrap();
        let b = first.advance(1, &skewed, &[0.5, -0.5], &i2).unwrap();
        assert_eq!(a.l, b.l);
        assert_eq!(a.lo, b.lo);
    }

    #[test]
    fn test_sparse_shape_errors_precede_densifying() {
        let sparse = |n: usize| {
            PrecisionBlock::Sparse(SparseMatrix::from_triplets(
                n,
                n,
                &[0, 1],
                &[0, 1],
                &[2.0, 2.0],
            ))
        };
        let coupling = DenseMatrix::identity(2);
        assert!(matches!(
            thompson_forward(&[sparse(2), sparse(2)], &[vec![0.0, 0.0]], &coupling),
            Err(PosteriorError::Precondition(_))
        ));
        assert!(matches!(
            thompson_forward(&[sparse(2), sparse(3)], &[vec![0.0; 2], vec![0.0; 2]], &coupling),
            Err(PosteriorError::Precondition(_))
        ));
        assert!(matches!(
            thompson_forward(&[], &[], &coupling),
            Err(PosteriorError::Precondition(_))
        ));
    }

    #[test]
    fn test_into_parts_and_accessors() {
        let omega = vec![DenseMatrix::from_diag(&[4.0]), DenseMatrix::from_diag(&[5.0])];
        let c = vec![vec![8.0], vec![3.0]];
        let coupling = DenseMatrix::from_diag(&[2.0]);
        let pass = thompson_forward_dense(&omega, &c, &coupling).unwrap();
        assert!(!pass.is_empty());
        assert_eq!(pass.factors().len(), 2);
        assert_eq!(pass.coupling_solved().len(), 2);
        assert_eq!(pass.means()[0], &[2.0][..]);
        let (ls, los, ms) = pass.clone().into_parts();
        assert_eq!(ls.len(), 2);
        assert_eq!(los[1], pass.steps[1].lo);
        assert_eq!(ms[1], pass.steps[1].m);
    }
}
