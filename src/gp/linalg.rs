//! gp::linalg — Cholesky factorization bridge between ndarray and nalgebra.
//!
//! Covariance matrices are assembled as `ndarray::Array2` and factorized with
//! `nalgebra::Cholesky`. When the plain factorization fails, a diagonal jitter
//! of `1e-6 · mean(diag K)` is added and grown tenfold up to five times.
use crate::gp::errors::{GpError, GpResult};
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use ndarray::{Array1, Array2};

const JITTER_RELATIVE: f64 = 1e-6;
const JITTER_TRIES: usize = 5;

#[derive(Clone)]
pub struct CholeskyFactor {
    factor: Cholesky<f64, Dyn>,
    jitter: f64,
}

impl std::fmt::Debug for CholeskyFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CholeskyFactor")
            .field("size", &self.size())
            .field("jitter", &self.jitter)
            .finish()
    }
}

/// Factorize a symmetric positive (semi-)definite matrix, adding jitter if needed.
///
/// Errors
/// ------
/// - `GpError::NotPositiveDefinite` when every jitter level fails or the
///   matrix contains non-finite entries.
pub fn factorize(k: &Array2<f64>) -> GpResult<CholeskyFactor> {
    let n = k.nrows();
    if n == 0 {
        return Err(GpError::EmptyTrainingSet);
    }
    if k.iter().any(|v| !v.is_finite()) {
        return Err(GpError::NotPositiveDefinite { size: n, jitter: 0.0 });
    }
    let base = to_dmatrix(k);
    if let Some(factor) = base.clone().cholesky() {
        return Ok(CholeskyFactor { factor, jitter: 0.0 });
    }
    let mean_diag = (k.diag().sum() / n as f64).abs().max(f64::MIN_POSITIVE);
    let mut jitter = JITTER_RELATIVE * mean_diag;
    for _ in 0..JITTER_TRIES {
        let mut jittered = base.clone();
        for i in 0..n {
            jittered[(i, i)] += jitter;
        }
        if let Some(factor) = jittered.cholesky() {
            return Ok(CholeskyFactor { factor, jitter });
        }
        jitter *= 10.0;
    }
    Err(GpError::NotPositiveDefinite { size: n, jitter: jitter / 10.0 })
}

impl CholeskyFactor {
    pub fn size(&self) -> usize {
        self.factor.l_dirty().nrows()
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// `K⁻¹ b`
    pub fn solve_vec(&self, b: &Array1<f64>) -> Array1<f64> {
        let rhs = DVector::from_iterator(b.len(), b.iter().copied());
        let sol = self.factor.solve(&rhs);
        Array1::from_iter(sol.iter().copied())
    }

    /// `K⁻¹ B`
    pub fn solve_mat(&self, b: &Array2<f64>) -> Array2<f64> {
        let sol = self.factor.solve(&to_dmatrix(b));
        from_dmatrix(&sol)
    }

    pub fn inverse(&self) -> Array2<f64> {
        from_dmatrix(&self.factor.inverse())
    }

    /// `log |K|` from the Cholesky diagonal.
    pub fn log_det(&self) -> f64 {
        2.0 * self.factor.l_dirty().diagonal().iter().map(|d| d.ln()).sum::<f64>()
    }
}

fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}
