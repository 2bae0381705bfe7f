//! gp::transform — optional log transform of the surrogate targets.
//!
//! With [`OutputTransform::Log`] every target is fitted as `ln y`; a model
//! prediction `(μ, s²)` in log space maps back to linear space through the
//! log-normal moments `m = exp(μ + s²/2)` and `v = exp(2μ + s²)(exp(s²) − 1)`.
//! Percentiles map exactly: `q_p = exp(μ + s·z_p)`.
use crate::gp::errors::{GpError, GpResult};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputTransform {
    #[default]
    Identity,
    Log,
}

impl OutputTransform {
    pub fn is_log(self) -> bool {
        self == OutputTransform::Log
    }

    /// Map targets of QoI `qoi` into model space.
    ///
    /// Errors
    /// ------
    /// - `GpError::NonPositiveTarget` for any `y <= 0` under the log transform.
    pub fn forward(self, y: ArrayView1<f64>, qoi: usize) -> GpResult<Array1<f64>> {
        match self {
            OutputTransform::Identity => Ok(y.to_owned()),
            OutputTransform::Log => {
                if let Some((row, &value)) = y.iter().enumerate().find(|(_, v)| !(**v > 0.0)) {
                    return Err(GpError::NonPositiveTarget { qoi, row, value });
                }
                Ok(y.mapv(f64::ln))
            }
        }
    }

    /// Map one model-space value back to output units.
    pub fn inverse(self, v: f64) -> f64 {
        match self {
            OutputTransform::Identity => v,
            OutputTransform::Log => v.exp(),
        }
    }

    /// Linear-space mean and variance from a model-space prediction.
    pub fn moments(self, mu: f64, var: f64) -> (f64, f64) {
        match self {
            OutputTransform::Identity => (mu, var),
            OutputTransform::Log => {
                let mean = (mu + 0.5 * var).exp();
                let variance = (2.0 * mu + var).exp() * var.exp_m1();
                (mean, variance)
            }
        }
    }

    /// Linear-space median of the predictive distribution.
    pub fn median(self, mu: f64) -> f64 {
        match self {
            OutputTransform::Identity => mu,
            OutputTransform::Log => mu.exp(),
        }
    }

    /// Linear-space `p`-quantile of the predictive distribution.
    pub fn quantile(self, mu: f64, var: f64, p: f64) -> f64 {
        let z = standard_normal_quantile(p);
        let q = mu + var.max(0.0).sqrt() * z;
        match self {
            OutputTransform::Identity => q,
            OutputTransform::Log => q.exp(),
        }
    }
}

pub fn standard_normal_quantile(p: f64) -> f64 {
    match Normal::new(0.0, 1.0) {
        Ok(n) => n.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Domain checks of the log transform.
    // - Log-normal moments and quantiles against hand-computed values.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Zero or negative targets are rejected under the log transform.
    //
    // Given
    // -----
    // - y = (1, 0, 2) for QoI 4.
    //
    // Expect
    // ------
    // - `NonPositiveTarget { qoi: 4, row: 1, value: 0 }`.
    fn log_forward_rejects_non_positive() {
        let y = array![1.0, 0.0, 2.0];
        assert_eq!(
            OutputTransform::Log.forward(y.view(), 4),
            Err(GpError::NonPositiveTarget { qoi: 4, row: 1, value: 0.0 })
        );
    }

    #[test]
    // Purpose
    // -------
    // Log-normal moments match the closed form.
    //
    // Given
    // -----
    // - μ = 0.5, s² = 0.2.
    //
    // Expect
    // ------
    // - m = e^{0.6}, v = e^{1.2}(e^{0.2} − 1).
    fn log_moments_match_closed_form() {
        let (m, v) = OutputTransform::Log.moments(0.5, 0.2);
        assert_relative_eq!(m, 0.6_f64.exp(), max_relative = 1e-12);
        assert_relative_eq!(v, 1.2_f64.exp() * (0.2_f64.exp() - 1.0), max_relative = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Quantiles are symmetric in linear space and multiplicative in log space.
    //
    // Given
    // -----
    // - μ = 1, s² = 4, p = 0.95 and p = 0.5.
    //
    // Expect
    // ------
    // - Identity: 1 + 2·1.6449; Log: exp of that; medians 1 and e.
    fn quantiles_follow_transform() {
        let z95 = 1.644_853_626_951_472_2;
        assert_relative_eq!(
            OutputTransform::Identity.quantile(1.0, 4.0, 0.95),
            1.0 + 2.0 * z95,
            max_relative = 1e-8
        );
        assert_relative_eq!(
            OutputTransform::Log.quantile(1.0, 4.0, 0.95),
            (1.0 + 2.0 * z95).exp(),
            max_relative = 1e-8
        );
        assert_relative_eq!(OutputTransform::Log.quantile(1.0, 4.0, 0.5), 1.0_f64.exp(), max_relative = 1e-8);
    }
}
