//! gp::hyper — nugget policies and the optimizer parameterization.
//!
//! Purpose
//! -------
//! Translate between the named hyperparameters of a GP ([`KernelParams`]
//! plus a noise variance) and the flat unconstrained vector `θ` that the
//! L-BFGS optimizer works on.
//!
//! Key behaviors
//! -------------
//! - [`NuggetPolicy`] captures how the noise variance is treated for one QoI:
//!   optimized freely, fixed to a value, optimized inside `[lo, hi]`, or zero.
//! - [`ThetaLayout`] decides which slots exist in `θ`, encodes a starting
//!   point, decodes an iterate, and returns `dp/dθ` for each slot so the
//!   likelihood gradient can be chained.
//!
//! Invariants & assumptions
//! ------------------------
//! - Length scales and the signal variance use `POSITIVE_FLOOR + softplus(θ)`.
//! - Linear-term variances use `softplus(θ)` (they may approach zero).
//! - An optimized nugget uses `POSITIVE_FLOOR + softplus(θ)`; a bounded
//!   nugget uses `lo + (hi − lo)·logistic(θ)`; fixed and zero nuggets take no
//!   slot in `θ`.
//! - Nugget values supplied by the user are in output units. They are divided
//!   by the output variance before use, since the GP works on standardized
//!   targets.
//!
//! Conventions
//! -----------
//! - θ order: `ℓ_0 … ℓ_{d−1}, σ², [v_0 … v_{d−1}], [noise]`.
use crate::gp::{
    errors::{GpError, GpResult},
    kernel::{KernelParams, KernelType},
};
use crate::optimization::{
    loglik_optimizer::Theta,
    numerical_stability::{
        bounded_from_unit, bounded_to_unit, safe_logistic, safe_softplus, safe_softplus_inv,
        POSITIVE_FLOOR,
    },
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Starting noise variance on the standardized scale.
pub const DEFAULT_NOISE: f64 = 1e-2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NuggetPolicy {
    Optimize,
    Fixed(f64),
    Bounded { lo: f64, hi: f64 },
    Zero,
}

impl Default for NuggetPolicy {
    fn default() -> Self {
        NuggetPolicy::Optimize
    }
}

impl NuggetPolicy {
    pub fn validate(&self, qoi: usize) -> GpResult<()> {
        match *self {
            NuggetPolicy::Fixed(v) if !(v.is_finite() && v >= 0.0) => {
                Err(GpError::InvalidNugget { qoi, reason: "fixed nugget must be finite and >= 0" })
            }
            NuggetPolicy::Bounded { lo, hi } => {
                if !(lo.is_finite() && hi.is_finite()) || lo < 0.0 {
                    return Err(GpError::InvalidNugget {
                        qoi,
                        reason: "nugget bounds must be finite and non-negative",
                    });
                }
                if lo > hi {
                    return Err(GpError::InvalidNugget {
                        qoi,
                        reason: "the lower bound of a nugget must not exceed its upper bound",
                    });
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Re-express the policy on the standardized output scale.
    pub fn standardized(&self, output_variance: f64) -> NuggetPolicy {
        let s2 = if output_variance > 0.0 { output_variance } else { 1.0 };
        match *self {
            NuggetPolicy::Fixed(v) => NuggetPolicy::Fixed(v / s2),
            NuggetPolicy::Bounded { lo, hi } if lo == hi => NuggetPolicy::Fixed(lo / s2),
            NuggetPolicy::Bounded { lo, hi } => NuggetPolicy::Bounded { lo: lo / s2, hi: hi / s2 },
            ref other => other.clone(),
        }
    }

    /// Noise value used for the first calibration start.
    pub fn initial_noise(&self) -> f64 {
        match *self {
            NuggetPolicy::Optimize => DEFAULT_NOISE,
            NuggetPolicy::Fixed(v) => v,
            NuggetPolicy::Bounded { lo, hi } => 0.5 * (lo + hi),
            NuggetPolicy::Zero => 0.0,
        }
    }

    pub(crate) fn has_slot(&self) -> bool {
        matches!(self, NuggetPolicy::Optimize | NuggetPolicy::Bounded { .. })
    }

    /// θ value of the noise slot, `None` when the policy takes no slot.
    pub(crate) fn encode_noise(&self, noise: f64) -> Option<f64> {
        match *self {
            NuggetPolicy::Optimize => Some(encode_positive(noise, POSITIVE_FLOOR)),
            NuggetPolicy::Bounded { lo, hi } => Some(bounded_to_unit(lo, hi, noise)),
            _ => None,
        }
    }

    /// Noise variance for slot value `slot` (ignored without a slot).
    pub(crate) fn decode_noise(&self, slot: f64) -> f64 {
        match *self {
            NuggetPolicy::Optimize => POSITIVE_FLOOR + safe_softplus(slot),
            NuggetPolicy::Bounded { lo, hi } => bounded_from_unit(lo, hi, slot),
            NuggetPolicy::Fixed(v) => v,
            NuggetPolicy::Zero => 0.0,
        }
    }

    pub(crate) fn noise_chain(&self, slot: f64) -> f64 {
        match *self {
            NuggetPolicy::Bounded { lo, hi } => {
                let s = safe_logistic(slot);
                (hi - lo) * s * (1.0 - s)
            }
            _ => safe_logistic(slot),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThetaLayout {
    pub kind: KernelType,
    pub x_dim: usize,
    pub linear: bool,
    pub nugget: NuggetPolicy,
}

impl ThetaLayout {
    /// `nugget` must already be on the standardized scale.
    pub fn new(kind: KernelType, x_dim: usize, linear: bool, nugget: NuggetPolicy) -> Self {
        Self { kind, x_dim, linear, nugget }
    }

    pub fn kernel_len(&self) -> usize {
        self.x_dim + 1 + if self.linear { self.x_dim } else { 0 }
    }

    pub fn len(&self) -> usize {
        self.kernel_len() + usize::from(self.nugget.has_slot())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encode(&self, kernel: &KernelParams, noise: f64) -> Theta {
        let mut theta = Vec::with_capacity(self.len());
        theta.extend(kernel.lengthscales.iter().map(|&l| encode_positive(l, POSITIVE_FLOOR)));
        theta.push(encode_positive(kernel.variance, POSITIVE_FLOOR));
        if self.linear {
            let ones = Array1::ones(self.x_dim);
            let v = kernel.linear_variances.as_ref().unwrap_or(&ones);
            theta.extend(v.iter().map(|&vi| encode_positive(vi, 0.0)));
        }
        theta.extend(self.nugget.encode_noise(noise));
        Array1::from(theta)
    }

    pub fn decode(&self, theta: &Theta) -> (KernelParams, f64) {
        let d = self.x_dim;
        let lengthscales = Array1::from_shape_fn(d, |i| POSITIVE_FLOOR + safe_softplus(theta[i]));
        let variance = POSITIVE_FLOOR + safe_softplus(theta[d]);
        let linear_variances = if self.linear {
            Some(Array1::from_shape_fn(d, |i| safe_softplus(theta[d + 1 + i])))
        } else {
            None
        };
        let k = self.kernel_len();
        let noise = self.nugget.decode_noise(theta.get(k).copied().unwrap_or(0.0));
        (KernelParams { kind: self.kind, lengthscales, variance, linear_variances }, noise)
    }

    /// `dp/dθ` for each slot of `θ`.
    pub fn chain_factors(&self, theta: &Theta) -> Array1<f64> {
        let k = self.kernel_len();
        Array1::from_shape_fn(self.len(), |i| {
            if i < k {
                safe_logistic(theta[i])
            } else {
                self.nugget.noise_chain(theta[i])
            }
        })
    }
}

pub(crate) fn encode_positive(value: f64, floor: f64) -> f64 {
    safe_softplus_inv((value - floor).max(1e-12))
}
