//! report::diagnostics — accuracy measures of a fitted surrogate.
//!
//! Purpose
//! -------
//! Turn leave-one-out results into the per-QoI numbers the controller stops
//! on and the exporter reports, and estimate how the predictive variance is
//! distributed over the input box.
//!
//! Key behaviors
//! -------------
//! - [`nrmse`]: `RMSE / (max − min)` of the observed values, 0 when the
//!   range is 0.
//! - [`r_squared`]: `1 − SSE/SST` with SST taken over the observed values,
//!   0 when SST is 0.
//! - [`correlation`]: Pearson coefficient, 1 when either side is constant.
//! - [`percentile_errors`]: ratio of predictive variance to data variance on
//!   a 1000-point Latin hypercube, maximum over QoIs, sorted and read at
//!   fixed ranks.
//!
//! Conventions
//! -----------
//! - All inputs are in output units (after the inverse log transform).
use crate::errors::UqResult;
use crate::gp::{bank::CrossValidation, transform::OutputTransform, SurrogateBank};
use crate::samples::design::latin_hypercube;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use serde::Serialize;

/// Number of points used by [`percentile_errors`].
pub const N_ERROR_POINTS: usize = 1000;

/// Normalized root-mean-squared error of `y_pred` against `y_true`.
pub fn nrmse(y_pred: ArrayView1<f64>, y_true: ArrayView1<f64>) -> f64 {
    let n = y_true.len();
    if n == 0 {
        return 0.0;
    }
    let (lo, hi) = y_true.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    });
    let range = hi - lo;
    if !(range > 0.0) {
        return 0.0;
    }
    let sse: f64 = y_pred.iter().zip(y_true.iter()).map(|(p, t)| (p - t) * (p - t)).sum();
    (sse / n as f64).sqrt() / range
}

pub fn r_squared(y_pred: ArrayView1<f64>, y_true: ArrayView1<f64>) -> f64 {
    let Some(mean) = y_true.mean() else {
        return 0.0;
    };
    let sst: f64 = y_true.iter().map(|t| (t - mean) * (t - mean)).sum();
    if !(sst > 0.0) {
        return 0.0;
    }
    let sse: f64 = y_pred.iter().zip(y_true.iter()).map(|(p, t)| (p - t) * (p - t)).sum();
    1.0 - sse / sst
}

pub fn correlation(y_pred: ArrayView1<f64>, y_true: ArrayView1<f64>) -> f64 {
    let (Some(mp), Some(mt)) = (y_pred.mean(), y_true.mean()) else {
        return 1.0;
    };
    let mut cov = 0.0;
    let mut vp = 0.0;
    let mut vt = 0.0;
    for (p, t) in y_pred.iter().zip(y_true.iter()) {
        cov += (p - mp) * (t - mt);
        vp += (p - mp) * (p - mp);
        vt += (t - mt) * (t - mt);
    }
    if !(vp > 0.0 && vt > 0.0) {
        return 1.0;
    }
    cov / (vp * vt).sqrt()
}

/// Per-QoI accuracy of a cross-validation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub nrmse: Array1<f64>,
    pub r2: Array1<f64>,
    pub corr: Array1<f64>,
}

impl Diagnostics {
    pub fn from_cross_validation(cv: &CrossValidation) -> Self {
        let q = cv.y_true.ncols();
        let mut out =
            Self { nrmse: Array1::zeros(q), r2: Array1::zeros(q), corr: Array1::zeros(q) };
        for j in 0..q {
            let (pred, truth) = (cv.y_pred.column(j), cv.y_true.column(j));
            out.nrmse[j] = nrmse(pred, truth);
            out.r2[j] = r_squared(pred, truth);
            out.corr[j] = correlation(pred, truth);
        }
        out
    }

    /// Largest NRMSE over the QoIs.
    pub fn max_nrmse(&self) -> f64 {
        self.nrmse.iter().copied().fold(0.0, f64::max)
    }
}

/// Sorted predictive-to-data variance ratios read at fixed ranks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionErrorPercentiles {
    /// `1 − rank/1000` per reported rank.
    pub percent: Vec<f64>,
    pub value: Vec<f64>,
}

/// Ranks `[1, 10, 60, …, 960, 999]` of the sorted ratios.
pub fn percentile_ranks() -> Vec<usize> {
    let mut ranks = vec![1];
    ranks.extend((10..N_ERROR_POINTS).step_by(50));
    ranks.push(N_ERROR_POINTS - 1);
    ranks
}

/// Variance of the observed outputs of one QoI, output units.
///
/// Under the log transform this is the log-normal variance implied by the
/// mean and variance of `ln y`.
pub fn data_variance(y: ArrayView1<f64>, transform: OutputTransform) -> f64 {
    let n = y.len().max(1) as f64;
    let moments = |v: &Array1<f64>| {
        let mean = v.sum() / n;
        let var = v.iter().map(|a| (a - mean) * (a - mean)).sum::<f64>() / n;
        (mean, var)
    };
    match transform {
        OutputTransform::Identity => moments(&y.to_owned()).1,
        OutputTransform::Log => {
            let (log_mean, log_var) = moments(&y.mapv(f64::ln));
            (2.0 * log_mean + log_var).exp() * log_var.exp_m1()
        }
    }
}

/// Predictive-error percentiles of `bank` over the box `[lower, upper]`.
///
/// Parameters
/// ----------
/// - `y_data`: observed outputs (`n × y_dim`) that define the data variance.
///
/// Errors
/// ------
/// - Invalid bounds from the design and prediction errors from the bank.
pub fn percentile_errors<R: Rng + ?Sized>(
    bank: &SurrogateBank, y_data: ArrayView2<f64>, lower: &Array1<f64>, upper: &Array1<f64>,
    rng: &mut R,
) -> UqResult<PredictionErrorPercentiles> {
    let transform = bank.settings().transform;
    let points = latin_hypercube(N_ERROR_POINTS, lower, upper, rng)?;
    let (_, pred_var) = bank.predict(points.view())?;
    let data_var: Vec<f64> =
        y_data.axis_iter(Axis(1)).map(|col| data_variance(col, transform)).collect();

    let mut ratios: Vec<f64> = pred_var
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter().zip(&data_var).map(|(v, d)| v / d).fold(f64::NEG_INFINITY, f64::max)
        })
        .collect();
    ratios.sort_by(f64::total_cmp);

    let ranks = percentile_ranks();
    Ok(PredictionErrorPercentiles {
        percent: ranks.iter().map(|&r| 1.0 - r as f64 * 0.001).collect(),
        value: ranks.iter().map(|&r| ratios.get(r).copied().unwrap_or(f64::NAN)).collect(),
    })
}
