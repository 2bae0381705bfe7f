//! loglik_optimizer::finite_diff — finite-difference gradients with error capture.
//!
//! Purpose
//! -------
//! Supply numerical gradients for likelihoods that do not implement
//! [`LogLikelihood::grad`](super::LogLikelihood::grad), such as the
//! multi-fidelity co-kriging likelihood.
//!
//! Key behaviors
//! -------------
//! - [`fd_gradient`] tries a central difference first and falls back to a
//!   forward difference when the central result is not finite.
//! - Errors raised inside the objective are captured in a `RefCell` slot and
//!   returned after differencing; `finitediff` closures cannot return
//!   `Result` themselves.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every gradient returned here passes [`validate_grad`] for `theta.len()`.
//! - The objective is evaluated on the cost scale (`-ℓ`); no sign flip occurs.
//!
//! Testing notes
//! -------------
//! - Unit tests check agreement with an analytic quadratic gradient, the
//!   forward fallback, and propagation of captured errors.
use crate::optimization::loglik_optimizer::{validation::validate_grad, Grad, Theta};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// Central-then-forward finite-difference gradient of a fallible objective.
///
/// Parameters
/// ----------
/// - `theta`: point at which to differentiate.
/// - `objective`: fallible scalar function of `theta`.
///
/// Returns
/// -------
/// `Result<Grad, Error>` holding a validated gradient.
///
/// Errors
/// ------
/// - The first error raised by `objective` during either difference scheme.
/// - `OptError::InvalidGradient` / `GradientDimMismatch` when the forward
///   fallback still produces an unusable gradient.
pub fn fd_gradient<G>(theta: &Theta, objective: G) -> Result<Grad, Error>
where
    G: Fn(&Theta) -> Result<f64, Error>,
{
    let closure_err: RefCell<Option<Error>> = RefCell::new(None);
    let wrapped = |t: &Theta| -> f64 {
        match objective(t) {
            Ok(val) => val,
            Err(e) => {
                let mut slot = closure_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                f64::NAN
            }
        }
    };

    let central = theta.central_diff(&wrapped);
    if closure_err.borrow().is_none() && validate_grad(&central, theta.len()).is_ok() {
        return Ok(central);
    }
    run_fd_diff(theta, &wrapped, &closure_err)
}

fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> Result<Grad, Error> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}
