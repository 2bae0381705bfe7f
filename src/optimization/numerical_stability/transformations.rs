//! Numerically guarded scalar transforms.
//!
//! - [`safe_softplus`] / [`safe_softplus_inv`]: ℝ ↔ (0, ∞) without overflow,
//!   using the linear tail for `x > 20`.
//! - [`safe_logistic`] / [`safe_logit`]: ℝ ↔ (0, 1), evaluated on the side
//!   that avoids `exp` overflow.
//! - [`bounded_from_unit`] / [`bounded_to_unit`]: ℝ ↔ `[lo, hi]` through the
//!   logistic map; used for nuggets constrained to an interval.
//! - [`POSITIVE_FLOOR`] is added to softplus outputs for length scales and
//!   variances so that they never reach exactly zero.

pub const POSITIVE_FLOOR: f64 = 1e-10;

pub const LOGIT_EPS: f64 = 1e-12;

pub fn safe_softplus(x: f64) -> f64 {
    if x > 20.0 {
        x
    } else {
        x.exp().ln_1p()
    }
}

pub fn safe_softplus_inv(x: f64) -> f64 {
    if x > 20.0 {
        x
    } else {
        x.exp_m1().ln()
    }
}

/// Derivative of `safe_softplus`, i.e. the logistic function.
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

pub fn safe_logit(p: f64) -> f64 {
    let p = p.clamp(LOGIT_EPS, 1.0 - LOGIT_EPS);
    (p / (1.0 - p)).ln()
}

pub fn bounded_from_unit(lo: f64, hi: f64, x: f64) -> f64 {
    lo + (hi - lo) * safe_logistic(x)
}

pub fn bounded_to_unit(lo: f64, hi: f64, value: f64) -> f64 {
    if hi <= lo {
        return 0.0;
    }
    safe_logit((value - lo) / (hi - lo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Inverse pairs for softplus and the bounded logistic map.
    // - Overflow safety for large magnitudes.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `safe_softplus_inv` inverts `safe_softplus` across both regimes.
    //
    // Given
    // -----
    // - x in {-5, 0.3, 7, 25}.
    //
    // Expect
    // ------
    // - softplus_inv(softplus(x)) ≈ x.
    fn softplus_pair_round_trips() {
        for x in [-5.0_f64, 0.3, 7.0, 25.0] {
            assert_relative_eq!(safe_softplus_inv(safe_softplus(x)), x, max_relative = 1e-9);
        }
    }

    #[test]
    // Purpose
    // -------
    // The logistic stays finite and in [0, 1] for extreme inputs.
    //
    // Given
    // -----
    // - x = ±800.
    //
    // Expect
    // ------
    // - 1.0 and 0.0 respectively, never NaN.
    fn logistic_is_overflow_safe() {
        assert_eq!(safe_logistic(800.0), 1.0);
        assert_eq!(safe_logistic(-800.0), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Bounded maps round-trip interior values.
    //
    // Given
    // -----
    // - Interval [0.01, 2.0] and value 0.5.
    //
    // Expect
    // ------
    // - bounded_from_unit(bounded_to_unit(0.5)) ≈ 0.5.
    fn bounded_pair_round_trips() {
        let x = bounded_to_unit(0.01, 2.0, 0.5);
        assert_relative_eq!(bounded_from_unit(0.01, 2.0, x), 0.5, max_relative = 1e-12);
    }
}
