//! gp::bank — the surrogate model bank: one model per QoI.
//!
//! Purpose
//! -------
//! Own every surrogate used by a run and expose the bank-level operations the
//! controller needs: bind data, calibrate, predict in output units and
//! leave-one-out cross-validate.
//!
//! Key behaviors
//! -------------
//! - [`FidelityCase`] is decided once at construction. Single-fidelity runs
//!   hold one [`GpRegression`] per QoI; multi-fidelity runs hold one
//!   [`MultiFidelityGp`] per QoI, built from the adaptive set plus the fixed
//!   companion set carried by the case.
//! - [`SurrogateBank::fit`] rebinds data and keeps the current
//!   hyperparameters; only [`SurrogateBank::calibrate`] changes them.
//! - With [`OutputTransform::Log`] models live in log space; predictions and
//!   cross-validation results are reported in output units through the
//!   log-normal moments.
//!
//! Invariants & assumptions
//! ------------------------
//! - `ranges.len() == x_dim`; the ranges seed calibration start 0.
//! - Cross-validation always leaves out high-fidelity rows.
//!
//! Downstream usage
//! ----------------
//! - `controller::adaptive` calls `fit`/`calibrate`/`cross_validate` each
//!   iteration; `doe` works on [`SurrogateModel`] through
//!   [`SurrogateBank::models`].
use crate::gp::{
    calibration::{
        calibrate_co_kriging, calibrate_regression, clamp_noise, population_variance,
        start_scales, CalibrationReport, CalibrationSettings,
    },
    errors::{GpError, GpResult},
    hyper::NuggetPolicy,
    kernel::{KernelParams, KernelType},
    multi_fidelity::{initial_params, CoKrigingParams, Fidelity, MultiFidelityGp},
    regression::{stack_targets, GpRegression, Prediction},
    transform::OutputTransform,
};
use crate::samples::SampleSet;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Where the data of each fidelity comes from.
///
/// The set stored in a variant is the fixed companion of the adaptive
/// [`SampleSet`] that the controller grows.
#[derive(Debug, Clone, PartialEq)]
pub enum FidelityCase {
    SingleFidelity,
    /// HF from data, LF from the simulator (LF is adaptive).
    DataModel { high: SampleSet },
    /// HF from the simulator, LF from data.
    ModelData { low: SampleSet },
    /// Both from simulators; the LF set was generated up front.
    ModelModel { low: SampleSet },
    /// Both from data; no simulator.
    DataData { low: SampleSet },
}

impl FidelityCase {
    pub fn label(&self) -> &'static str {
        match self {
            FidelityCase::SingleFidelity => "single-fidelity",
            FidelityCase::DataModel { .. } => "data-model",
            FidelityCase::ModelData { .. } => "model-data",
            FidelityCase::ModelModel { .. } => "model-model",
            FidelityCase::DataData { .. } => "data-data",
        }
    }

    pub fn is_multi_fidelity(&self) -> bool {
        !matches!(self, FidelityCase::SingleFidelity)
    }

    pub fn adaptive_fidelity(&self) -> Fidelity {
        match self {
            FidelityCase::DataModel { .. } => Fidelity::Low,
            _ => Fidelity::High,
        }
    }

    /// `(low, high)` sets for a multi-fidelity case, `None` otherwise.
    pub fn split<'a>(&'a self, adaptive: &'a SampleSet) -> Option<(&'a SampleSet, &'a SampleSet)> {
        match self {
            FidelityCase::SingleFidelity => None,
            FidelityCase::DataModel { high } => Some((adaptive, high)),
            FidelityCase::ModelData { low }
            | FidelityCase::ModelModel { low }
            | FidelityCase::DataData { low } => Some((low, adaptive)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SurrogateModel {
    Single(GpRegression),
    CoKriging(MultiFidelityGp),
}

impl SurrogateModel {
    /// Model-space prediction (noise included).
    pub fn predict(&self, xq: ArrayView2<f64>) -> GpResult<Prediction> {
        match self {
            SurrogateModel::Single(m) => m.predict(xq),
            SurrogateModel::CoKriging(m) => m.predict(xq),
        }
    }

    pub fn posterior_covariance(
        &self, xa: ArrayView2<f64>, xb: ArrayView2<f64>,
    ) -> GpResult<Array2<f64>> {
        match self {
            SurrogateModel::Single(m) => m.posterior_covariance(xa, xb),
            SurrogateModel::CoKriging(m) => m.posterior_covariance(xa, xb),
        }
    }

    pub fn prior_covariance(&self, xa: ArrayView2<f64>, xb: ArrayView2<f64>) -> Array2<f64> {
        match self {
            SurrogateModel::Single(m) => m.prior_covariance(xa, xb),
            SurrogateModel::CoKriging(m) => m.prior_covariance(xa, xb),
        }
    }

    pub fn with_pseudo_points(&self, x_new: ArrayView2<f64>) -> GpResult<SurrogateModel> {
        Ok(match self {
            SurrogateModel::Single(m) => SurrogateModel::Single(m.with_pseudo_points(x_new)?),
            SurrogateModel::CoKriging(m) => SurrogateModel::CoKriging(m.with_pseudo_points(x_new)?),
        })
    }

    pub fn log_likelihood(&self) -> f64 {
        match self {
            SurrogateModel::Single(m) => m.log_likelihood(),
            SurrogateModel::CoKriging(m) => m.log_likelihood(),
        }
    }

    /// Noise variance of the predicted channel, model units.
    pub fn noise_variance(&self) -> f64 {
        match self {
            SurrogateModel::Single(m) => m.noise_variance(),
            SurrogateModel::CoKriging(m) => m.noise_variance(),
        }
    }

    /// Inputs of the dataset that DoE grows.
    pub fn adaptive_inputs(&self) -> &Array2<f64> {
        match self {
            SurrogateModel::Single(m) => m.x(),
            SurrogateModel::CoKriging(m) => m.adaptive_inputs(),
        }
    }

    /// Rows used for cross-validation (the HF rows).
    pub fn cv_inputs(&self) -> &Array2<f64> {
        match self {
            SurrogateModel::Single(m) => m.x(),
            SurrogateModel::CoKriging(m) => m.x_high(),
        }
    }

    pub fn cv_targets(&self) -> &Array1<f64> {
        match self {
            SurrogateModel::Single(m) => m.y(),
            SurrogateModel::CoKriging(m) => m.y_high(),
        }
    }

    /// Prediction at CV row `row` from a refit without that row.
    pub fn leave_one_out_prediction(&self, row: usize) -> GpResult<Prediction> {
        let x_row = self.cv_inputs().select(Axis(0), &[row]);
        match self {
            SurrogateModel::Single(m) => m.leave_one_out(row)?.predict(x_row.view()),
            SurrogateModel::CoKriging(m) => m.leave_one_out(row)?.predict(x_row.view()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub kernel: KernelType,
    pub linear: bool,
    /// One policy per QoI, or a single policy shared by all.
    pub nuggets: Vec<NuggetPolicy>,
    pub transform: OutputTransform,
    pub calibration: CalibrationSettings,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            kernel: KernelType::default(),
            linear: false,
            nuggets: vec![NuggetPolicy::Optimize],
            transform: OutputTransform::Identity,
            calibration: CalibrationSettings::default(),
        }
    }
}

impl ModelSettings {
    pub fn nugget(&self, qoi: usize) -> NuggetPolicy {
        self.nuggets.get(qoi).or_else(|| self.nuggets.first()).cloned().unwrap_or_default()
    }
}

/// Leave-one-out results; every matrix is `n_cv × y_dim`.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidation {
    pub x: Array2<f64>,
    /// Observed outputs, output units.
    pub y_true: Array2<f64>,
    /// LOO predictive mean, output units.
    pub y_pred: Array2<f64>,
    /// LOO predictive variance, output units.
    pub y_pred_var: Array2<f64>,
    /// Squared LOO error, output units.
    pub e2: Array2<f64>,
    /// LOO mean and variance in model space (log space under the log
    /// transform), used for percentile bounds.
    pub latent_mean: Array2<f64>,
    pub latent_var: Array2<f64>,
}

impl CrossValidation {
    /// No LOO rows, for a run that stopped before any model was fitted.
    pub fn empty(x_dim: usize, y_dim: usize) -> Self {
        let none = || Array2::zeros((0, y_dim));
        Self {
            x: Array2::zeros((0, x_dim)),
            y_true: none(),
            y_pred: none(),
            y_pred_var: none(),
            e2: none(),
            latent_mean: none(),
            latent_var: none(),
        }
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct SurrogateBank {
    case: FidelityCase,
    settings: ModelSettings,
    ranges: Array1<f64>,
    models: Vec<SurrogateModel>,
}

impl SurrogateBank {
    pub fn new(case: FidelityCase, settings: ModelSettings, ranges: Array1<f64>) -> Self {
        Self { case, settings, ranges, models: Vec::new() }
    }

    /// Rebuild from already-fitted models (snapshot loading).
    pub fn from_models(
        case: FidelityCase, settings: ModelSettings, ranges: Array1<f64>,
        models: Vec<SurrogateModel>,
    ) -> Self {
        Self { case, settings, ranges, models }
    }

    /// Bind `samples` (the adaptive set) to every model without optimizing.
    ///
    /// Errors
    /// ------
    /// - `NonPositiveTarget` under the log transform.
    /// - Training-data and factorization errors from the models.
    pub fn fit(&mut self, samples: &SampleSet) -> GpResult<()> {
        if samples.x_dim() != self.ranges.len() {
            return Err(GpError::ShapeMismatch {
                what: "sample input columns",
                expected: self.ranges.len(),
                found: samples.x_dim(),
            });
        }
        let mut models = Vec::with_capacity(samples.y_dim());
        for qoi in 0..samples.y_dim() {
            let model = match self.case.split(samples) {
                None => SurrogateModel::Single(self.fit_single(qoi, samples)?),
                Some((low, high)) => {
                    SurrogateModel::CoKriging(self.fit_co_kriging(qoi, low, high)?)
                }
            };
            models.push(model);
        }
        self.models = models;
        Ok(())
    }

    fn fit_single(&self, qoi: usize, samples: &SampleSet) -> GpResult<GpRegression> {
        let transform = self.settings.transform;
        let y = transform.forward(samples.output(qoi), qoi)?;
        let variance = population_variance(y.view());
        let policy = self.standardized_policy(qoi, variance);
        let (kernel, noise) = match self.models.get(qoi) {
            Some(SurrogateModel::Single(prev)) => {
                (prev.kernel().clone(), clamp_noise(&policy, prev.noise()))
            }
            _ => (self.initial_kernel(), policy.initial_noise()),
        };
        GpRegression::fit(samples.x().clone(), y, kernel, noise)
    }

    fn fit_co_kriging(
        &self, qoi: usize, low: &SampleSet, high: &SampleSet,
    ) -> GpResult<MultiFidelityGp> {
        let transform = self.settings.transform;
        let y_low = transform.forward(low.output(qoi), qoi)?;
        let y_high = transform.forward(high.output(qoi), qoi)?;
        let stacked = stack_targets(y_low.view(), y_high.view());
        let policy = self.standardized_policy(qoi, population_variance(stacked.view()));
        let params = match self.models.get(qoi) {
            Some(SurrogateModel::CoKriging(prev)) => {
                let mut p: CoKrigingParams = prev.params().clone();
                p.noise_low = clamp_noise(&policy, p.noise_low);
                p.noise_high = clamp_noise(&policy, p.noise_high);
                p
            }
            _ => initial_params(
                self.settings.kernel,
                &start_scales(&self.ranges),
                policy.initial_noise(),
            ),
        };
        MultiFidelityGp::fit(
            low.x().clone(),
            y_low,
            high.x().clone(),
            y_high,
            params,
            self.case.adaptive_fidelity(),
        )
    }

    fn standardized_policy(&self, qoi: usize, variance: f64) -> NuggetPolicy {
        if variance > 0.0 {
            self.settings.nugget(qoi).standardized(variance)
        } else {
            NuggetPolicy::Zero
        }
    }

    fn initial_kernel(&self) -> KernelParams {
        let d = self.ranges.len();
        let mut kernel = KernelParams::new(self.settings.kernel, d);
        kernel.lengthscales = start_scales(&self.ranges);
        if self.settings.linear {
            kernel = kernel.with_linear(Array1::ones(d));
        }
        kernel
    }

    /// Calibrate every model; `time_cap` bounds each restart.
    pub fn calibrate<R: Rng + ?Sized>(
        &mut self, time_cap: Option<Duration>, rng: &mut R,
    ) -> GpResult<Vec<CalibrationReport>> {
        let mut reports = Vec::with_capacity(self.models.len());
        let mut calibrated = Vec::with_capacity(self.models.len());
        for (qoi, model) in self.models.iter().enumerate() {
            let nugget = self.settings.nugget(qoi);
            let settings = &self.settings.calibration;
            let next = match model {
                SurrogateModel::Single(m) => {
                    let (m, report) = calibrate_regression(
                        m,
                        qoi,
                        &nugget,
                        self.settings.linear,
                        &self.ranges,
                        settings,
                        time_cap,
                        rng,
                    )?;
                    reports.push(report);
                    SurrogateModel::Single(m)
                }
                SurrogateModel::CoKriging(m) => {
                    let (m, report) =
                        calibrate_co_kriging(
                            m,
                            qoi,
                            &nugget,
                            &self.ranges,
                            settings,
                            time_cap,
                            rng,
                        )?;
                    reports.push(report);
                    SurrogateModel::CoKriging(m)
                }
            };
            calibrated.push(next);
        }
        self.models = calibrated;
        debug!(models = reports.len(), "bank calibrated");
        Ok(reports)
    }

    /// Predictive mean and variance in output units, `m × y_dim` each.
    pub fn predict(&self, xq: ArrayView2<f64>) -> GpResult<(Array2<f64>, Array2<f64>)> {
        let (latent_mean, latent_var) = self.predict_latent(xq)?;
        let transform = self.settings.transform;
        let mut mean = Array2::<f64>::zeros(latent_mean.raw_dim());
        let mut var = Array2::<f64>::zeros(latent_mean.raw_dim());
        for ((i, j), &mu) in latent_mean.indexed_iter() {
            let (m, v) = transform.moments(mu, latent_var[[i, j]]);
            mean[[i, j]] = m;
            var[[i, j]] = v;
        }
        Ok((mean, var))
    }

    /// Model-space mean and variance, `m × y_dim` each.
    pub fn predict_latent(&self, xq: ArrayView2<f64>) -> GpResult<(Array2<f64>, Array2<f64>)> {
        let m = xq.nrows();
        let mut mean = Array2::<f64>::zeros((m, self.models.len()));
        let mut var = Array2::<f64>::zeros((m, self.models.len()));
        for (j, model) in self.models.iter().enumerate() {
            let p = model.predict(xq)?;
            mean.column_mut(j).assign(&p.mean);
            var.column_mut(j).assign(&p.variance);
        }
        Ok((mean, var))
    }

    /// Leave-one-out cross-validation with fixed hyperparameters.
    pub fn cross_validate(&self) -> GpResult<CrossValidation> {
        let first = self.models.first().ok_or(GpError::EmptyTrainingSet)?;
        let x = first.cv_inputs().clone();
        let (n, q) = (x.nrows(), self.models.len());
        let transform = self.settings.transform;
        let mut cv = CrossValidation {
            x,
            y_true: Array2::zeros((n, q)),
            y_pred: Array2::zeros((n, q)),
            y_pred_var: Array2::zeros((n, q)),
            e2: Array2::zeros((n, q)),
            latent_mean: Array2::zeros((n, q)),
            latent_var: Array2::zeros((n, q)),
        };
        for (j, model) in self.models.iter().enumerate() {
            let targets = model.cv_targets();
            for i in 0..n {
                let p = model.leave_one_out_prediction(i)?;
                let (mu, s2) = (p.mean[0], p.variance[0]);
                let (m, v) = transform.moments(mu, s2);
                let y = transform.inverse(targets[i]);
                cv.y_true[[i, j]] = y;
                cv.y_pred[[i, j]] = m;
                cv.y_pred_var[[i, j]] = v;
                cv.e2[[i, j]] = (y - m) * (y - m);
                cv.latent_mean[[i, j]] = mu;
                cv.latent_var[[i, j]] = s2;
            }
        }
        Ok(cv)
    }

    pub fn models(&self) -> &[SurrogateModel] {
        &self.models
    }

    pub fn model(&self, qoi: usize) -> Option<&SurrogateModel> {
        self.models.get(qoi)
    }

    pub fn case(&self) -> &FidelityCase {
        &self.case
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn ranges(&self) -> &Array1<f64> {
        &self.ranges
    }

    pub fn y_dim(&self) -> usize {
        self.models.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.models.is_empty()
    }
}
