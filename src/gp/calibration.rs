//! gp::calibration — multi-start maximum-likelihood calibration of GP models.
//!
//! Purpose
//! -------
//! Fit kernel hyperparameters and noise by maximizing the log marginal
//! likelihood with L-BFGS from several starting points, then rebuild the
//! model at the best point.
//!
//! Key behaviors
//! -------------
//! - Start 0 sets the length scales to the variable-range magnitudes, unit
//!   signal variance and the policy's initial noise.
//! - Start 1 warm-starts from the model's current hyperparameters.
//! - Later starts multiply the best length scales so far by `Exp(1)` draws.
//! - A single start slower than `time_cap` ends the sequence.
//! - Constant targets force a zero nugget; if every start then fails the
//!   model keeps its initial hyperparameters instead of erroring.
//!
//! Invariants & assumptions
//! ------------------------
//! - Nugget policies arrive in output units and are standardized here with
//!   the population variance of the model-space targets.
//! - Single-fidelity objectives supply analytic gradients; the co-kriging
//!   objective relies on the optimizer's finite-difference fallback.
//!
//! Downstream usage
//! ----------------
//! - `gp::bank::SurrogateBank::calibrate` runs one calibration per QoI and
//!   collects the [`CalibrationReport`]s for logging and export.
use crate::gp::{
    errors::{GpError, GpResult},
    hyper::{NuggetPolicy, ThetaLayout},
    kernel::KernelParams,
    multi_fidelity::{co_kriging_likelihood, initial_params, CoKrigingLayout, MultiFidelityGp},
    regression::{marginal_likelihood, marginal_likelihood_and_gradient, GpRegression},
};
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        maximize_with_restarts, validation::validate_theta_input, Cost, Grad, LogLikelihood,
        MLEOptions, RestartOptions, RestartOutcome, Theta,
    },
    numerical_stability::POSITIVE_FLOOR,
};
use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use rand_distr::Exp1;
use std::time::Duration;
use tracing::{debug, warn};

/// Number of starts used per calibration unless configured otherwise.
pub const DEFAULT_RESTARTS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSettings {
    pub num_restarts: usize,
    pub mle: MLEOptions,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self { num_restarts: DEFAULT_RESTARTS, mle: MLEOptions::default() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationReport {
    pub qoi: usize,
    pub log_likelihood: f64,
    pub attempts: usize,
    pub failures: usize,
    pub best_start: Option<usize>,
    pub elapsed: Duration,
    pub nugget_forced_zero: bool,
}

impl CalibrationReport {
    fn from_outcome(qoi: usize, outcome: &RestartOutcome, forced_zero: bool) -> Self {
        Self {
            qoi,
            log_likelihood: outcome.best.as_ref().map_or(f64::NAN, |b| b.value),
            attempts: outcome.attempts,
            failures: outcome.failures,
            best_start: outcome.best_index,
            elapsed: outcome.elapsed,
            nugget_forced_zero: forced_zero,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegressionData {
    pub x: Array2<f64>,
    pub y_std: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct RegressionObjective {
    pub layout: ThetaLayout,
}

impl LogLikelihood for RegressionObjective {
    type Data = RegressionData;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost> {
        let (kernel, noise) = self.layout.decode(theta);
        Ok(marginal_likelihood(&kernel, noise, data.x.view(), &data.y_std)?)
    }

    fn check(&self, theta: &Theta, _data: &Self::Data) -> OptResult<()> {
        validate_theta_input(theta, self.layout.len())
    }

    fn grad(&self, theta: &Theta, data: &Self::Data) -> OptResult<Grad> {
        let (kernel, noise) = self.layout.decode(theta);
        let (_, natural) =
            marginal_likelihood_and_gradient(&kernel, noise, data.x.view(), &data.y_std)?;
        let chain = self.layout.chain_factors(theta);
        let k = self.layout.kernel_len();
        Ok(Array1::from_shape_fn(theta.len(), |i| {
            if i < k {
                natural[i] * chain[i]
            } else {
                natural[k] * chain[i]
            }
        }))
    }
}

#[derive(Debug, Clone)]
pub struct CoKrigingData {
    pub x_low: Array2<f64>,
    pub x_high: Array2<f64>,
    pub y_std: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct CoKrigingObjective {
    pub layout: CoKrigingLayout,
}

impl LogLikelihood for CoKrigingObjective {
    type Data = CoKrigingData;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost> {
        let params = self.layout.decode(theta);
        Ok(co_kriging_likelihood(&params, data.x_low.view(), data.x_high.view(), &data.y_std)?)
    }

    fn check(&self, theta: &Theta, _data: &Self::Data) -> OptResult<()> {
        validate_theta_input(theta, self.layout.len())
    }
}

/// Calibrate one single-fidelity model.
///
/// Parameters
/// ----------
/// - `qoi`: column index, used in errors and reports.
/// - `nugget`: policy in output units.
/// - `linear`: whether the kernel carries the linear ARD term.
/// - `ranges`: variable-range magnitudes seeding start 0.
/// - `time_cap`: per-start wall-clock cap.
///
/// Errors
/// ------
/// - `GpError::CalibrationFailed` when every start fails and the targets are
///   not constant.
pub fn calibrate_regression<R: Rng + ?Sized>(
    model: &GpRegression, qoi: usize, nugget: &NuggetPolicy, linear: bool, ranges: &Array1<f64>,
    settings: &CalibrationSettings, time_cap: Option<Duration>, rng: &mut R,
) -> GpResult<(GpRegression, CalibrationReport)> {
    let variance = population_variance(model.y().view());
    let forced_zero = !(variance > 0.0);
    let policy = if forced_zero { NuggetPolicy::Zero } else { nugget.standardized(variance) };
    let d = model.x_dim();
    let layout = ThetaLayout::new(model.kernel().kind, d, linear, policy.clone());
    let objective = RegressionObjective { layout: layout.clone() };
    let data = RegressionData { x: model.x().clone(), y_std: model.standardized_targets() };

    let mut initial = KernelParams::new(model.kernel().kind, d);
    initial.lengthscales = start_scales(ranges);
    if linear {
        initial = initial.with_linear(Array1::ones(d));
    }
    let mut warm = model.kernel().clone();
    warm.linear_variances = match (linear, warm.linear_variances.take()) {
        (true, Some(v)) => Some(v),
        (true, None) => Some(Array1::ones(d)),
        (false, _) => None,
    };
    let theta_initial = layout.encode(&initial, policy.initial_noise());
    let theta_warm = layout.encode(&warm, clamp_noise(&policy, model.noise()));

    let restarts = RestartOptions::new(settings.num_restarts, time_cap)?;
    let outcome =
        maximize_with_restarts(&objective, &data, &settings.mle, &restarts, |index, best| {
            match (index, best) {
                (0, _) => theta_initial.clone(),
                (1, _) => theta_warm.clone(),
                (_, Some(best)) => {
                    let (mut kernel, noise) = layout.decode(&best.theta_hat);
                    kernel.lengthscales.mapv_inplace(|l| l * rng.sample::<f64, _>(Exp1));
                    layout.encode(&kernel, noise)
                }
                (_, None) => {
                    let mut kernel = initial.clone();
                    kernel.lengthscales.mapv_inplace(|l| l * rng.sample::<f64, _>(Exp1));
                    layout.encode(&kernel, policy.initial_noise())
                }
            }
        })?;
    let report = CalibrationReport::from_outcome(qoi, &outcome, forced_zero);
    debug!(qoi, attempts = report.attempts, failures = report.failures, log_lik = report.log_likelihood, "calibrated");

    match &outcome.best {
        Some(best) => {
            let (kernel, noise) = layout.decode(&best.theta_hat);
            Ok((model.with_hyperparameters(kernel, noise)?, report))
        }
        None if forced_zero => {
            warn!(qoi, "calibration failed on constant targets; keeping initial hyperparameters");
            Ok((model.with_hyperparameters(initial, 0.0)?, report))
        }
        None => Err(GpError::CalibrationFailed {
            qoi,
            attempts: outcome.attempts,
            reason: failure_reason(&outcome),
        }),
    }
}

/// Calibrate a co-kriging model over `(θ_L, θ_δ, ρ, noise_L, noise_H)`.
pub fn calibrate_co_kriging<R: Rng + ?Sized>(
    model: &MultiFidelityGp, qoi: usize, nugget: &NuggetPolicy, ranges: &Array1<f64>,
    settings: &CalibrationSettings, time_cap: Option<Duration>, rng: &mut R,
) -> GpResult<(MultiFidelityGp, CalibrationReport)> {
    let stacked = model.standardized_targets();
    let variance = {
        let y_model = stacked.mapv(|v| v * model.normalizer().std + model.normalizer().mean);
        population_variance(y_model.view())
    };
    let forced_zero = !(variance > 0.0);
    let policy = if forced_zero { NuggetPolicy::Zero } else { nugget.standardized(variance) };
    let kind = model.params().low.kind;
    let layout = CoKrigingLayout::new(kind, model.x_dim(), policy.clone());
    let objective = CoKrigingObjective { layout: layout.clone() };
    let data = CoKrigingData {
        x_low: model.x_low().clone(),
        x_high: model.x_high().clone(),
        y_std: stacked,
    };

    let initial = initial_params(kind, &start_scales(ranges), policy.initial_noise());
    let mut warm = model.params().clone();
    warm.noise_low = clamp_noise(&policy, warm.noise_low);
    warm.noise_high = clamp_noise(&policy, warm.noise_high);
    let theta_initial = layout.encode(&initial);
    let theta_warm = layout.encode(&warm);

    let restarts = RestartOptions::new(settings.num_restarts, time_cap)?;
    let outcome =
        maximize_with_restarts(&objective, &data, &settings.mle, &restarts, |index, best| {
            match (index, best) {
                (0, _) => theta_initial.clone(),
                (1, _) => theta_warm.clone(),
                (_, best) => {
                    let mut params =
                        best.map_or_else(|| initial.clone(), |b| layout.decode(&b.theta_hat));
                    params.low.lengthscales.mapv_inplace(|l| l * rng.sample::<f64, _>(Exp1));
                    params.delta.lengthscales.mapv_inplace(|l| l * rng.sample::<f64, _>(Exp1));
                    layout.encode(&params)
                }
            }
        })?;
    let report = CalibrationReport::from_outcome(qoi, &outcome, forced_zero);
    debug!(qoi, attempts = report.attempts, failures = report.failures, log_lik = report.log_likelihood, "calibrated co-kriging");

    match &outcome.best {
        Some(best) => Ok((model.with_params(layout.decode(&best.theta_hat))?, report)),
        None if forced_zero => {
            warn!(qoi, "co-kriging calibration failed on constant targets; keeping initial hyperparameters");
            let mut params = initial;
            params.noise_low = 0.0;
            params.noise_high = 0.0;
            Ok((model.with_params(params)?, report))
        }
        None => Err(GpError::CalibrationFailed {
            qoi,
            attempts: outcome.attempts,
            reason: failure_reason(&outcome),
        }),
    }
}

/// Length scales for start 0: range magnitudes, 1 where a range is degenerate.
pub fn start_scales(ranges: &Array1<f64>) -> Array1<f64> {
    ranges.mapv(|r| if r.is_finite() && r > 0.0 { r } else { 1.0 })
}

pub(crate) fn population_variance(y: ArrayView1<f64>) -> f64 {
    let n = y.len();
    if n == 0 {
        return 0.0;
    }
    let mean = y.sum() / n as f64;
    y.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64
}

pub(crate) fn clamp_noise(policy: &NuggetPolicy, noise: f64) -> f64 {
    match *policy {
        NuggetPolicy::Optimize => noise.max(POSITIVE_FLOOR),
        NuggetPolicy::Fixed(v) => v,
        NuggetPolicy::Bounded { lo, hi } => noise.clamp(lo, hi),
        NuggetPolicy::Zero => 0.0,
    }
}

fn failure_reason(outcome: &RestartOutcome) -> String {
    outcome
        .last_error
        .as_ref()
        .map_or_else(|| "no start produced a finite log-likelihood".to_string(), |e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::kernel::KernelType;
    use crate::optimization::loglik_optimizer::finite_diff::fd_gradient;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The chained θ-gradient of the regression objective.
    // - Calibration improving the likelihood over the starting model.
    // - Constant targets forcing a zero nugget.
    // - Co-kriging calibration through finite differences.
    //
    // They intentionally DO NOT cover:
    // - The optimizer internals (see `optimization::loglik_optimizer`).
    // -------------------------------------------------------------------------

    fn smooth_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((12, 1), |(i, _)| i as f64 / 11.0 * 4.0);
        let y = x.column(0).mapv(|v: f64| v.sin() * 3.0 + 0.5 * v);
        (x, y)
    }

    #[test]
    // Purpose
    // -------
    // The θ-space gradient equals finite differences of the θ-space value.
    //
    // Given
    // -----
    // - A 1-D linear-term layout with a bounded nugget.
    //
    // Expect
    // ------
    // - Analytic and numeric gradients agree to 1e-5.
    fn regression_objective_gradient_matches_fd() {
        // Arrange
        let (x, y) = smooth_data();
        let model =
            GpRegression::fit(x.clone(), y, KernelParams::new(KernelType::Matern52, 1), 0.01)
                .expect("fit");
        let layout = ThetaLayout::new(
            KernelType::Matern52,
            1,
            true,
            NuggetPolicy::Bounded { lo: 1e-4, hi: 0.5 },
        );
        let objective = RegressionObjective { layout };
        let data = RegressionData { x, y_std: model.standardized_targets() };
        let theta = array![0.3, -0.2, 0.1, -1.0];

        // Act
        let analytic = objective.grad(&theta, &data).expect("grad");
        let numeric =
            fd_gradient(&theta, |t| objective.value(t, &data).map_err(Into::into)).expect("fd");

        // Assert
        for i in 0..theta.len() {
            assert_abs_diff_eq!(analytic[i], numeric[i], epsilon = 1e-5 * (1.0 + numeric[i].abs()));
        }
    }

    #[test]
    // Purpose
    // -------
    // Calibration never returns a worse likelihood than its warm start.
    //
    // Given
    // -----
    // - Twelve smooth points, a deliberately poor starting length scale.
    //
    // Expect
    // ------
    // - Calibrated log-likelihood >= starting log-likelihood, positive noise.
    fn calibration_improves_likelihood() {
        // Arrange
        let (x, y) = smooth_data();
        let mut kernel = KernelParams::new(KernelType::Matern52, 1);
        kernel.lengthscales = array![0.01];
        let model = GpRegression::fit(x, y, kernel, 0.5).expect("fit");
        let settings = CalibrationSettings { num_restarts: 4, ..CalibrationSettings::default() };
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        // Act
        let (calibrated, report) = calibrate_regression(
            &model,
            0,
            &NuggetPolicy::Optimize,
            false,
            &array![4.0],
            &settings,
            None,
            &mut rng,
        )
        .expect("calibration");

        // Assert
        assert!(calibrated.log_likelihood() >= model.log_likelihood() - 1e-6);
        assert!(calibrated.noise() > 0.0);
        assert_eq!(report.attempts, 4);
        assert!(!report.nugget_forced_zero);
    }

    #[test]
    // Purpose
    // -------
    // Constant targets force the nugget to zero.
    //
    // Given
    // -----
    // - Five points with y = 2 everywhere.
    //
    // Expect
    // ------
    // - Noise 0 and `nugget_forced_zero` in the report.
    fn constant_targets_force_zero_nugget() {
        // Arrange
        let x = array![[0.0], [0.25], [0.5], [0.75], [1.0]];
        let y = Array1::from_elem(5, 2.0);
        let model =
            GpRegression::fit(x, y, KernelParams::new(KernelType::Matern52, 1), 0.01).expect("fit");
        let settings = CalibrationSettings { num_restarts: 2, ..CalibrationSettings::default() };
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        // Act
        let (calibrated, report) = calibrate_regression(
            &model,
            2,
            &NuggetPolicy::Optimize,
            false,
            &array![1.0],
            &settings,
            None,
            &mut rng,
        )
        .expect("constant targets never fail");

        // Assert
        assert_eq!(calibrated.noise(), 0.0);
        assert!(report.nugget_forced_zero);
        assert_eq!(report.qoi, 2);
    }

    #[test]
    // Purpose
    // -------
    // Co-kriging calibration runs through the finite-difference fallback.
    //
    // Given
    // -----
    // - Eight LF and four HF points with an AR(1) relation, two starts.
    //
    // Expect
    // ------
    // - A finite likelihood no worse than the starting one.
    fn co_kriging_calibration_runs() {
        use crate::gp::multi_fidelity::{CoKrigingParams, Fidelity};
        // Arrange
        let x_low = Array2::from_shape_fn((8, 1), |(i, _)| i as f64 / 7.0);
        let y_low = x_low.column(0).mapv(|v: f64| (3.0 * v).sin());
        let x_high = array![[0.05], [0.35], [0.65], [0.95]];
        let y_high = x_high.column(0).mapv(|v: f64| 1.5 * (3.0 * v).sin() + 0.2 * v);
        let model = MultiFidelityGp::fit(
            x_low,
            y_low,
            x_high,
            y_high,
            CoKrigingParams::new(KernelType::Matern52, 1),
            Fidelity::High,
        )
        .expect("fit");
        let settings = CalibrationSettings { num_restarts: 2, ..CalibrationSettings::default() };
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        // Act
        let (calibrated, report) = calibrate_co_kriging(
            &model,
            0,
            &NuggetPolicy::Optimize,
            &array![1.0],
            &settings,
            None,
            &mut rng,
        )
        .expect("calibration");

        // Assert
        assert!(report.log_likelihood.is_finite());
        assert!(calibrated.log_likelihood() >= model.log_likelihood() - 1e-6);
    }
}
