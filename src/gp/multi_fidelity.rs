//! gp::multi_fidelity — AR(1) co-kriging of a low- and a high-fidelity source.
//!
//! Purpose
//! -------
//! Model the high-fidelity response as `f_H(x) = ρ·f_L(x) + δ(x)` with
//! independent GPs `f_L` and `δ`, fitted jointly on both datasets, and predict
//! the high-fidelity channel only.
//!
//! Key behaviors
//! -------------
//! - The joint training covariance over `[X_L; X_H]` is
//!   `K_LL = k_L + n_L·I`, `K_LH = ρ·k_L`, `K_HH = ρ²·k_L + k_δ + n_H·I`.
//! - Both output sets share one [`Normalizer`] fitted on their concatenation.
//! - Pseudo points are appended to the adaptive fidelity (the one a simulator
//!   grows), so DoE variance updates follow where samples will land.
//! - [`MultiFidelityGp::leave_one_out`] removes one high-fidelity row.
//!
//! Invariants & assumptions
//! ------------------------
//! - Both datasets are non-empty and share the input dimension.
//! - There is no linear kernel term in the co-kriging model.
//! - Calibration uses finite-difference gradients of [`co_kriging_likelihood`].
use crate::gp::{
    errors::{GpError, GpResult},
    hyper::{NuggetPolicy, ThetaLayout, DEFAULT_NOISE},
    kernel::{KernelParams, KernelType},
    linalg::{factorize, CholeskyFactor},
    regression::{stack_targets, validate_training, Normalizer, Prediction},
};
use crate::optimization::loglik_optimizer::Theta;
use ndarray::{concatenate, s, Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fidelity {
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoKrigingParams {
    pub low: KernelParams,
    pub delta: KernelParams,
    pub rho: f64,
    pub noise_low: f64,
    pub noise_high: f64,
}

impl CoKrigingParams {
    pub fn new(kind: KernelType, x_dim: usize) -> Self {
        let mut delta = KernelParams::new(kind, x_dim);
        delta.variance = 0.1;
        Self {
            low: KernelParams::new(kind, x_dim),
            delta,
            rho: 1.0,
            noise_low: DEFAULT_NOISE,
            noise_high: DEFAULT_NOISE,
        }
    }

    pub fn x_dim(&self) -> usize {
        self.low.x_dim()
    }

    /// Prior covariance of the high-fidelity latent function.
    pub fn high_prior(&self, xa: ArrayView2<f64>, xb: ArrayView2<f64>) -> Array2<f64> {
        self.low.matrix(xa, xb) * (self.rho * self.rho) + self.delta.matrix(xa, xb)
    }

    fn high_prior_diag(&self, x: ArrayView2<f64>) -> Array1<f64> {
        self.low.diag(x) * (self.rho * self.rho) + self.delta.diag(x)
    }

    pub fn joint_covariance(&self, x_low: ArrayView2<f64>, x_high: ArrayView2<f64>) -> Array2<f64> {
        let (nl, nh) = (x_low.nrows(), x_high.nrows());
        let mut k = Array2::<f64>::zeros((nl + nh, nl + nh));
        let k_ll = self.low.matrix(x_low, x_low);
        let k_lh = self.low.matrix(x_low, x_high) * self.rho;
        let k_hh = self.high_prior(x_high, x_high);
        k.slice_mut(s![..nl, ..nl]).assign(&k_ll);
        k.slice_mut(s![..nl, nl..]).assign(&k_lh);
        k.slice_mut(s![nl.., ..nl]).assign(&k_lh.t());
        k.slice_mut(s![nl.., nl..]).assign(&k_hh);
        for i in 0..nl {
            k[[i, i]] += self.noise_low;
        }
        for i in nl..nl + nh {
            k[[i, i]] += self.noise_high;
        }
        k
    }

    /// Covariance between the training vector and the HF latent at `xq`.
    fn cross_high(
        &self, x_low: ArrayView2<f64>, x_high: ArrayView2<f64>, xq: ArrayView2<f64>,
    ) -> Array2<f64> {
        let nl = x_low.nrows();
        let mut c = Array2::<f64>::zeros((nl + x_high.nrows(), xq.nrows()));
        c.slice_mut(s![..nl, ..]).assign(&(self.low.matrix(x_low, xq) * self.rho));
        c.slice_mut(s![nl.., ..]).assign(&self.high_prior(x_high, xq));
        c
    }
}

/// θ layout for co-kriging:
/// `θ_L (d+1), θ_δ (d+1), ρ, [noise_L], [noise_H]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoKrigingLayout {
    kernel: ThetaLayout,
    pub nugget: NuggetPolicy,
}

impl CoKrigingLayout {
    /// `nugget` must already be on the standardized scale.
    pub fn new(kind: KernelType, x_dim: usize, nugget: NuggetPolicy) -> Self {
        Self { kernel: ThetaLayout::new(kind, x_dim, false, NuggetPolicy::Zero), nugget }
    }

    pub fn len(&self) -> usize {
        2 * self.kernel.kernel_len() + 1 + 2 * usize::from(self.nugget.has_slot())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encode(&self, params: &CoKrigingParams) -> Theta {
        let mut theta = Vec::with_capacity(self.len());
        theta.extend(self.kernel.encode(&params.low, 0.0));
        theta.extend(self.kernel.encode(&params.delta, 0.0));
        theta.push(params.rho);
        theta.extend(self.nugget.encode_noise(params.noise_low));
        theta.extend(self.nugget.encode_noise(params.noise_high));
        Array1::from(theta)
    }

    pub fn decode(&self, theta: &Theta) -> CoKrigingParams {
        let k = self.kernel.kernel_len();
        let (low, _) = self.kernel.decode(&theta.slice(s![..k]).to_owned());
        let (delta, _) = self.kernel.decode(&theta.slice(s![k..2 * k]).to_owned());
        let rho = theta[2 * k];
        let slot = |i: usize| theta.get(2 * k + 1 + i).copied().unwrap_or(0.0);
        CoKrigingParams {
            low,
            delta,
            rho,
            noise_low: self.nugget.decode_noise(slot(0)),
            noise_high: self.nugget.decode_noise(slot(1)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MultiFidelityGp {
    params: CoKrigingParams,
    x_low: Array2<f64>,
    y_low: Array1<f64>,
    x_high: Array2<f64>,
    y_high: Array1<f64>,
    normalizer: Normalizer,
    adaptive: Fidelity,
    factor: CholeskyFactor,
    alpha: Array1<f64>,
}

impl MultiFidelityGp {
    /// Bind both datasets and the co-kriging hyperparameters.
    ///
    /// Errors
    /// ------
    /// - Training-data errors for either fidelity.
    /// - `NotPositiveDefinite` when the joint covariance cannot be factorized.
    pub fn fit(
        x_low: Array2<f64>, y_low: Array1<f64>, x_high: Array2<f64>, y_high: Array1<f64>,
        params: CoKrigingParams, adaptive: Fidelity,
    ) -> GpResult<Self> {
        validate_training(x_low.view(), y_low.view(), &params.low)?;
        validate_training(x_high.view(), y_high.view(), &params.delta)?;
        let stacked = stack_targets(y_low.view(), y_high.view());
        let normalizer = Normalizer::fit(stacked.view());
        Self::assemble(x_low, y_low, x_high, y_high, normalizer, params, adaptive)
    }

    fn assemble(
        x_low: Array2<f64>, y_low: Array1<f64>, x_high: Array2<f64>, y_high: Array1<f64>,
        normalizer: Normalizer, params: CoKrigingParams, adaptive: Fidelity,
    ) -> GpResult<Self> {
        let y_std = normalizer.standardize(stack_targets(y_low.view(), y_high.view()).view());
        let factor = factorize(&params.joint_covariance(x_low.view(), x_high.view()))?;
        let alpha = factor.solve_vec(&y_std);
        Ok(Self { params, x_low, y_low, x_high, y_high, normalizer, adaptive, factor, alpha })
    }

    pub fn with_params(&self, params: CoKrigingParams) -> GpResult<Self> {
        Self::assemble(
            self.x_low.clone(),
            self.y_low.clone(),
            self.x_high.clone(),
            self.y_high.clone(),
            self.normalizer,
            params,
            self.adaptive,
        )
    }

    /// Refit without high-fidelity row `row`, hyperparameters fixed.
    pub fn leave_one_out(&self, row: usize) -> GpResult<Self> {
        let n = self.x_high.nrows();
        if row >= n {
            return Err(GpError::RowOutOfRange { row, len: n });
        }
        if n < 2 {
            return Err(GpError::EmptyTrainingSet);
        }
        let keep: Vec<usize> = (0..n).filter(|&i| i != row).collect();
        Self::fit(
            self.x_low.clone(),
            self.y_low.clone(),
            self.x_high.select(Axis(0), &keep),
            self.y_high.select(Axis(0), &keep),
            self.params.clone(),
            self.adaptive,
        )
    }

    pub fn with_pseudo_points(&self, x_new: ArrayView2<f64>) -> GpResult<Self> {
        if x_new.ncols() != self.x_dim() {
            return Err(GpError::ShapeMismatch {
                what: "pseudo point columns",
                expected: self.x_dim(),
                found: x_new.ncols(),
            });
        }
        let zeros = Array1::<f64>::zeros(x_new.nrows());
        let grow = |x: &Array2<f64>, y: &Array1<f64>| -> GpResult<(Array2<f64>, Array1<f64>)> {
            let x = concatenate(Axis(0), &[x.view(), x_new.view()]).map_err(|_| {
                GpError::ShapeMismatch {
                    what: "pseudo points",
                    expected: x.ncols(),
                    found: x_new.ncols(),
                }
            })?;
            Ok((x, stack_targets(y.view(), zeros.view())))
        };
        let (x_low, y_low, x_high, y_high) = match self.adaptive {
            Fidelity::Low => {
                let (x, y) = grow(&self.x_low, &self.y_low)?;
                (x, y, self.x_high.clone(), self.y_high.clone())
            }
            Fidelity::High => {
                let (x, y) = grow(&self.x_high, &self.y_high)?;
                (self.x_low.clone(), self.y_low.clone(), x, y)
            }
        };
        let params = self.params.clone();
        Self::assemble(x_low, y_low, x_high, y_high, self.normalizer, params, self.adaptive)
    }

    pub fn log_likelihood(&self) -> f64 {
        let n = self.alpha.len() as f64;
        let y_std = self.standardized_targets();
        -0.5 * y_std.dot(&self.alpha) - 0.5 * self.factor.log_det() - 0.5 * n * (2.0 * PI).ln()
    }

    /// High-fidelity predictive mean and variance (noise included).
    pub fn predict(&self, xq: ArrayView2<f64>) -> GpResult<Prediction> {
        self.check_query(xq)?;
        let c = self.params.cross_high(self.x_low.view(), self.x_high.view(), xq);
        let v = self.factor.solve_mat(&c);
        let prior = self.params.high_prior_diag(xq);
        let s2 = self.normalizer.scale2();
        let mean = c.t().dot(&self.alpha).mapv(|m| m * self.normalizer.std + self.normalizer.mean);
        let variance = Array1::from_shape_fn(xq.nrows(), |j| {
            let explained = c.column(j).dot(&v.column(j));
            (prior[j] - explained + self.params.noise_high).max(0.0) * s2
        });
        Ok(Prediction { mean, variance })
    }

    pub fn posterior_covariance(
        &self, xa: ArrayView2<f64>, xb: ArrayView2<f64>,
    ) -> GpResult<Array2<f64>> {
        self.check_query(xa)?;
        self.check_query(xb)?;
        let ca = self.params.cross_high(self.x_low.view(), self.x_high.view(), xa);
        let cb = self.params.cross_high(self.x_low.view(), self.x_high.view(), xb);
        let vb = self.factor.solve_mat(&cb);
        let cov = self.params.high_prior(xa, xb) - ca.t().dot(&vb);
        Ok(cov * self.normalizer.scale2())
    }

    pub fn prior_covariance(&self, xa: ArrayView2<f64>, xb: ArrayView2<f64>) -> Array2<f64> {
        self.params.high_prior(xa, xb) * self.normalizer.scale2()
    }

    pub fn standardized_targets(&self) -> Array1<f64> {
        let stacked = stack_targets(self.y_low.view(), self.y_high.view());
        self.normalizer.standardize(stacked.view())
    }

    pub fn params(&self) -> &CoKrigingParams {
        &self.params
    }

    pub fn adaptive(&self) -> Fidelity {
        self.adaptive
    }

    pub fn x_low(&self) -> &Array2<f64> {
        &self.x_low
    }

    pub fn y_low(&self) -> &Array1<f64> {
        &self.y_low
    }

    pub fn x_high(&self) -> &Array2<f64> {
        &self.x_high
    }

    pub fn y_high(&self) -> &Array1<f64> {
        &self.y_high
    }

    /// Inputs of the fidelity that DoE grows.
    pub fn adaptive_inputs(&self) -> &Array2<f64> {
        match self.adaptive {
            Fidelity::Low => &self.x_low,
            Fidelity::High => &self.x_high,
        }
    }

    pub fn normalizer(&self) -> Normalizer {
        self.normalizer
    }

    /// High-fidelity noise variance in model units.
    pub fn noise_variance(&self) -> f64 {
        self.params.noise_high * self.normalizer.scale2()
    }

    pub fn x_dim(&self) -> usize {
        self.x_high.ncols()
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


/// Joint log marginal likelihood of standardized stacked targets.
pub fn co_kriging_likelihood(
    params: &CoKrigingParams, x_low: ArrayView2<f64>, x_high: ArrayView2<f64>,
    y_std: &Array1<f64>,
) -> GpResult<f64> {
    let factor = factorize(&params.joint_covariance(x_low, x_high))?;
    let alpha = factor.solve_vec(y_std);
    let n = y_std.len() as f64;
    Ok(-0.5 * y_std.dot(&alpha) - 0.5 * factor.log_det() - 0.5 * n * (2.0 * PI).ln())
}

/// Starting point with all length scales set to `ranges` and no bias.
pub(crate) fn initial_params(
    kind: KernelType, ranges: &Array1<f64>, noise: f64,
) -> CoKrigingParams {
    let mut params = CoKrigingParams::new(kind, ranges.len());
    params.low.lengthscales = ranges.clone();
    params.delta.lengthscales = ranges.clone();
    params.noise_low = noise;
    params.noise_high = noise;
    params
}
