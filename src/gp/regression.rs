//! gp::regression — single-fidelity Gaussian-process regression for one QoI.
//!
//! Purpose
//! -------
//! Hold a GP fitted to one output column: training inputs, standardized
//! targets, the kernel hyperparameters, the noise variance and the Cholesky
//! factor of the training covariance. Expose predictions, posterior
//! covariances and the marginal likelihood used for calibration.
//!
//! Key behaviors
//! -------------
//! - Targets are standardized with a [`Normalizer`] (population mean/std);
//!   kernel variance and noise are expressed on that standardized scale and
//!   predictions are mapped back to model units.
//! - [`GpRegression::fit`] binds data and hyperparameters; it never optimizes.
//!   Calibration produces a new model through
//!   [`GpRegression::with_hyperparameters`].
//! - [`GpRegression::leave_one_out`] refits on `n − 1` rows with fixed
//!   hyperparameters (the normalizer is recomputed on the reduced data).
//! - [`GpRegression::with_pseudo_points`] appends inputs with a placeholder
//!   target of zero and keeps the normalizer. Predictive variances of the
//!   result reflect the extra points; the mean is not meaningful.
//!
//! Invariants & assumptions
//! ------------------------
//! - `x.nrows() == y.len() > 0`, all entries finite.
//! - `kernel.x_dim() == x.ncols()`, `noise >= 0`.
//! - Predictive variances include the noise term and are clamped at zero.
//!
//! Downstream usage
//! ----------------
//! - `gp::calibration` evaluates [`marginal_likelihood_and_gradient`] inside
//!   the optimizer and rebuilds the model from the best hyperparameters.
//! - `doe` uses [`GpRegression::predict`], the prior/posterior covariances and
//!   pseudo points to score candidates.
//!
//! Testing notes
//! -------------
//! - Unit tests cover interpolation of noiseless data, LOO shape, the
//!   variance reduction from pseudo points, and the analytic likelihood
//!   gradient against finite differences.
use crate::gp::{
    errors::{GpError, GpResult},
    kernel::KernelParams,
    linalg::{factorize, CholeskyFactor},
};
use ndarray::{concatenate, s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    pub mean: f64,
    pub std: f64,
}

impl Normalizer {
    pub fn fit(y: ArrayView1<f64>) -> Self {
        let n = y.len().max(1) as f64;
        let mean = y.sum() / n;
        let var = y.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let std = var.sqrt();
        Self { mean, std: if std > 0.0 && std.is_finite() { std } else { 1.0 } }
    }

    pub fn standardize(&self, y: ArrayView1<f64>) -> Array1<f64> {
        y.mapv(|v| (v - self.mean) / self.std)
    }

    pub fn scale2(&self) -> f64 {
        self.std * self.std
    }
}

/// Predictive mean and variance in model units.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub mean: Array1<f64>,
    pub variance: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct GpRegression {
    kernel: KernelParams,
    noise: f64,
    x: Array2<f64>,
    y: Array1<f64>,
    normalizer: Normalizer,
    factor: CholeskyFactor,
    alpha: Array1<f64>,
}

impl GpRegression {
    /// Bind training data and hyperparameters.
    ///
    /// Parameters
    /// ----------
    /// - `x`: `n × d` inputs.
    /// - `y`: `n` targets in model space (already log-transformed if needed).
    /// - `kernel`: covariance hyperparameters on the standardized scale.
    /// - `noise`: noise variance on the standardized scale.
    ///
    /// Errors
    /// ------
    /// - `EmptyTrainingSet`, `ShapeMismatch`, `NonFiniteData` for bad inputs.
    /// - `NotPositiveDefinite` when the covariance cannot be factorized.
    pub fn fit(x: Array2<f64>, y: Array1<f64>, kernel: KernelParams, noise: f64) -> GpResult<Self> {
        validate_training(x.view(), y.view(), &kernel)?;
        let normalizer = Normalizer::fit(y.view());
        Self::assemble(x, y, normalizer, kernel, noise)
    }

    fn assemble(
        x: Array2<f64>, y: Array1<f64>, normalizer: Normalizer, kernel: KernelParams, noise: f64,
    ) -> GpResult<Self> {
        let y_std = normalizer.standardize(y.view());
        let factor = factorize(&training_covariance(&kernel, noise, x.view()))?;
        let alpha = factor.solve_vec(&y_std);
        Ok(Self { kernel, noise, x, y, normalizer, factor, alpha })
    }

    pub fn with_hyperparameters(&self, kernel: KernelParams, noise: f64) -> GpResult<Self> {
        Self::assemble(self.x.clone(), self.y.clone(), self.normalizer, kernel, noise)
    }

    pub fn leave_one_out(&self, row: usize) -> GpResult<Self> {
        let n = self.n_samples();
        if row >= n {
            return Err(GpError::RowOutOfRange { row, len: n });
        }
        if n < 2 {
            return Err(GpError::EmptyTrainingSet);
        }
        let keep: Vec<usize> = (0..n).filter(|&i| i != row).collect();
        let x = self.x.select(Axis(0), &keep);
        let y = self.y.select(Axis(0), &keep);
        Self::fit(x, y, self.kernel.clone(), self.noise)
    }

    pub fn with_pseudo_points(&self, x_new: ArrayView2<f64>) -> GpResult<Self> {
        if x_new.ncols() != self.x_dim() {
            return Err(GpError::ShapeMismatch {
                what: "pseudo point columns",
                expected: self.x_dim(),
                found: x_new.ncols(),
            });
        }
        let x = concatenate(Axis(0), &[self.x.view(), x_new.view()]).map_err(|_| {
            GpError::ShapeMismatch {
                what: "pseudo points",
                expected: self.x_dim(),
                found: x_new.ncols(),
            }
        })?;
        let zeros = Array1::<f64>::zeros(x_new.nrows());
        let y = stack_targets(self.y.view(), zeros.view());
        Self::assemble(x, y, self.normalizer, self.kernel.clone(), self.noise)
    }

    /// Log marginal likelihood of the standardized targets.
    pub fn log_likelihood(&self) -> f64 {
        let y_std = self.standardized_targets();
        let n = y_std.len() as f64;
        -0.5 * y_std.dot(&self.alpha) - 0.5 * self.factor.log_det() - 0.5 * n * (2.0 * PI).ln()
    }

    pub fn predict(&self, xq: ArrayView2<f64>) -> GpResult<Prediction> {
        self.check_query(xq)?;
        let ks = self.kernel.matrix(self.x.view(), xq);
        let v = self.factor.solve_mat(&ks);
        let prior = self.kernel.diag(xq);
        let s2 = self.normalizer.scale2();
        let mean = ks.t().dot(&self.alpha).mapv(|m| m * self.normalizer.std + self.normalizer.mean);
        let variance = Array1::from_shape_fn(xq.nrows(), |j| {
            let explained = ks.column(j).dot(&v.column(j));
            (prior[j] - explained + self.noise).max(0.0) * s2
        });
        Ok(Prediction { mean, variance })
    }

    /// Posterior covariance of the latent function between `xa` and `xb`.
    pub fn posterior_covariance(
        &self, xa: ArrayView2<f64>, xb: ArrayView2<f64>,
    ) -> GpResult<Array2<f64>> {
        self.check_query(xa)?;
        self.check_query(xb)?;
        let ka = self.kernel.matrix(self.x.view(), xa);
        let kb = self.kernel.matrix(self.x.view(), xb);
        let vb = self.factor.solve_mat(&kb);
        let cov = self.kernel.matrix(xa, xb) - ka.t().dot(&vb);
        Ok(cov * self.normalizer.scale2())
    }

    /// Prior covariance in model units.
    pub fn prior_covariance(&self, xa: ArrayView2<f64>, xb: ArrayView2<f64>) -> Array2<f64> {
        self.kernel.matrix(xa, xb) * self.normalizer.scale2()
    }

    pub fn standardized_targets(&self) -> Array1<f64> {
        self.normalizer.standardize(self.y.view())
    }

    pub fn kernel(&self) -> &KernelParams {
        &self.kernel
    }

    /// Noise variance on the standardized scale.
    pub fn noise(&self) -> f64 {
        self.noise
    }

    /// Noise variance in model units.
    pub fn noise_variance(&self) -> f64 {
        self.noise * self.normalizer.scale2()
    }

    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn normalizer(&self) -> Normalizer {
        self.normalizer
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn x_dim(&self) -> usize {
        self.x.ncols()
    }

    fn check_query(&self, xq: ArrayView2<f64>) -> GpResult<()> {
        if xq.ncols() != self.x_dim() {
            return Err(GpError::ShapeMismatch {
                what: "query columns",
                expected: self.x_dim(),
                found: xq.ncols(),
            });
        }
        Ok(())
    }
}

/// `a` followed by `b`.
pub(crate) fn stack_targets(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Array1<f64> {
    a.iter().chain(b.iter()).copied().collect()
}

pub(crate) fn validate_training(
    x: ArrayView2<f64>, y: ArrayView1<f64>, kernel: &KernelParams,
) -> GpResult<()> {
    if x.nrows() == 0 {
        return Err(GpError::EmptyTrainingSet);
    }
    if x.nrows() != y.len() {
        return Err(GpError::ShapeMismatch {
            what: "training rows",
            expected: x.nrows(),
            found: y.len(),
        });
    }
    if kernel.x_dim() != x.ncols() {
        return Err(GpError::ShapeMismatch {
            what: "kernel length scales",
            expected: x.ncols(),
            found: kernel.x_dim(),
        });
    }
    if let Some((index, &value)) = x.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(GpError::NonFiniteData { what: "inputs", index, value });
    }
    if let Some((index, &value)) = y.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(GpError::NonFiniteData { what: "targets", index, value });
    }
    Ok(())
}

pub(crate) fn training_covariance(
    kernel: &KernelParams, noise: f64, x: ArrayView2<f64>,
) -> Array2<f64> {
    let mut k = kernel.matrix(x, x);
    k.diag_mut().mapv_inplace(|v| v + noise);
    k
}

/// Log marginal likelihood of standardized targets `y_std`.
pub fn marginal_likelihood(
    kernel: &KernelParams, noise: f64, x: ArrayView2<f64>, y_std: &Array1<f64>,
) -> GpResult<f64> {
    let factor = factorize(&training_covariance(kernel, noise, x))?;
    let alpha = factor.solve_vec(y_std);
    let n = y_std.len() as f64;
    Ok(-0.5 * y_std.dot(&alpha) - 0.5 * factor.log_det() - 0.5 * n * (2.0 * PI).ln())
}

/// Log marginal likelihood and its gradient in natural parameters.
///
/// The gradient is ordered `ℓ_0 … ℓ_{d−1}, σ², [v_0 … v_{d−1}], noise`, i.e.
/// the kernel block from [`KernelParams::contract_gradient`] followed by the
/// noise derivative `½ tr(ααᵀ − K⁻¹)`.
pub fn marginal_likelihood_and_gradient(
    kernel: &KernelParams, noise: f64, x: ArrayView2<f64>, y_std: &Array1<f64>,
) -> GpResult<(f64, Array1<f64>)> {
    let factor = factorize(&training_covariance(kernel, noise, x))?;
    let alpha = factor.solve_vec(y_std);
    let n = y_std.len();
    let value = -0.5 * y_std.dot(&alpha)
        - 0.5 * factor.log_det()
        - 0.5 * n as f64 * (2.0 * PI).ln();

    let a_col = alpha.view().insert_axis(Axis(1));
    let w = a_col.dot(&a_col.t()) - factor.inverse();
    let kernel_grad = kernel.contract_gradient(x, &w) * 0.5;
    let mut grad = Array1::<f64>::zeros(kernel_grad.len() + 1);
    grad.slice_mut(s![..kernel_grad.len()]).assign(&kernel_grad);
    grad[kernel_grad.len()] = 0.5 * w.diag().sum();
    Ok((value, grad))
}
