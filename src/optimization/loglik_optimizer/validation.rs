//! Validation helpers for likelihood optimization.
//!
//! - [`verify_tol_grad`], [`verify_tol_cost`]: tolerances must be finite and
//!   strictly positive when provided.
//! - [`validate_grad`]: gradient length and finiteness.
//! - [`validate_theta_hat`], [`validate_value`]: optimizer outputs.
//! - [`validate_theta_input`]: length and finiteness of a starting point,
//!   shared by every `LogLikelihood::check` in the GP layer.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{Grad, Theta},
};

pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    match theta_hat {
        Some(t) => {
            for (index, &value) in t.iter().enumerate() {
                if !value.is_finite() {
                    return Err(OptError::InvalidThetaHat {
                        index,
                        value,
                        reason: "Parameter estimates must be finite.",
                    });
                }
            }
            Ok(t)
        }
        None => Err(OptError::MissingThetaHat),
    }
}

pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

pub fn validate_theta_input(theta: &Theta, expected: usize) -> OptResult<()> {
    if theta.len() != expected {
        return Err(OptError::ThetaLengthMismatch { expected, actual: theta.len() });
    }
    if let Some((index, &value)) = theta.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(OptError::InvalidThetaInput { index, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Tolerance checks for finiteness and positivity.
    // - Gradient, theta-hat and starting-point validation.
    //
    // They intentionally DO NOT cover:
    // - How these helpers are wired into the adapter or runner.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Tolerances reject zero, negative and non-finite values but allow `None`.
    //
    // Given
    // -----
    // - `None`, `Some(1e-6)`, `Some(0.0)`, `Some(-1.0)`, `Some(NaN)`.
    //
    // Expect
    // ------
    // - `Ok` for `None` and `1e-6`, typed errors otherwise.
    fn verify_tolerances_accept_positive_and_reject_invalid() {
        // Arrange
        let bad = [0.0_f64, -1.0, f64::NAN, f64::INFINITY];

        // Act & Assert
        assert!(verify_tol_grad(None).is_ok());
        assert!(verify_tol_cost(Some(1e-6)).is_ok());
        for tol in bad {
            assert!(matches!(verify_tol_grad(Some(tol)), Err(OptError::InvalidTolGrad { .. })));
            assert!(matches!(verify_tol_cost(Some(tol)), Err(OptError::InvalidTolCost { .. })));
        }
    }

    #[test]
    // Purpose
    // -------
    // `validate_grad` checks both length and finiteness.
    //
    // Given
    // -----
    // - A length-2 gradient validated against dim 3.
    // - A gradient containing NaN at index 1.
    //
    // Expect
    // ------
    // - `GradientDimMismatch` and `InvalidGradient { index: 1, .. }`.
    fn validate_grad_reports_length_and_nan() {
        // Arrange
        let short = array![1.0, 2.0];
        let with_nan = array![1.0, f64::NAN, 3.0];

        // Act
        let dim_err = validate_grad(&short, 3);
        let nan_err = validate_grad(&with_nan, 3);

        // Assert
        assert_eq!(dim_err, Err(OptError::GradientDimMismatch { expected: 3, found: 2 }));
        assert!(matches!(nan_err, Err(OptError::InvalidGradient { index: 1, .. })));
    }

    #[test]
    // Purpose
    // -------
    // `validate_theta_hat` requires a present, finite estimate.
    //
    // Given
    // -----
    // - `None` and a vector containing +∞.
    //
    // Expect
    // ------
    // - `MissingThetaHat` and `InvalidThetaHat` respectively.
    fn validate_theta_hat_rejects_missing_and_infinite() {
        // Act
        let missing = validate_theta_hat(None);
        let infinite = validate_theta_hat(Some(array![0.0, f64::INFINITY]));

        // Assert
        assert_eq!(missing, Err(OptError::MissingThetaHat));
        assert!(matches!(infinite, Err(OptError::InvalidThetaHat { index: 1, .. })));
    }

    #[test]
    // Purpose
    // -------
    // `validate_theta_input` catches wrong lengths before finiteness.
    //
    // Given
    // -----
    // - A length-2 theta against an expected length of 4.
    // - A length-2 theta with -∞ at index 0.
    //
    // Expect
    // ------
    // - `ThetaLengthMismatch` and `InvalidThetaInput { index: 0 }`.
    fn validate_theta_input_checks_length_then_values() {
        // Arrange
        let theta = array![0.1, 0.2];
        let bad = array![f64::NEG_INFINITY, 0.2];

        // Act & Assert
        assert_eq!(
            validate_theta_input(&theta, 4),
            Err(OptError::ThetaLengthMismatch { expected: 4, actual: 2 })
        );
        assert!(matches!(
            validate_theta_input(&bad, 2),
            Err(OptError::InvalidThetaInput { index: 0, .. })
        ));
        assert!(validate_theta_input(&theta, 2).is_ok());
    }
}
