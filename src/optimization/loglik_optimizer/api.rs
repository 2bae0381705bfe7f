//! High-level entry point for maximizing a `LogLikelihood`.
//!
//! Selects an L-BFGS solver with either Hager–Zhang or More–Thuente line
//! search, wraps the model in an `ArgMinAdapter` (which *minimizes* `-ℓ(θ)`),
//! and delegates the run to `run_lbfgs`.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, LogLikelihood, MLEOptions},
        OptimOutcome, Theta,
    },
};

/// Maximize `f` from `theta0` on `data`.
///
/// Errors
/// ------
/// - Any error from [`LogLikelihood::check`] on the starting point.
/// - Solver construction or execution errors translated to `OptError`.
/// - `OptError::NonFiniteCost` / `InvalidThetaHat` when the final state is
///   unusable.
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::{OptError, OptResult};
    use crate::optimization::loglik_optimizer::{Cost, Grad};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - End-to-end maximization of a concave toy likelihood with both line
    //   searches and with the finite-difference fallback.
    // - Rejection of invalid starting points through `check`.
    // -------------------------------------------------------------------------

    struct Concave {
        analytic: bool,
    }

    impl LogLikelihood for Concave {
        type Data = (f64, f64);

        fn value(&self, theta: &Theta, data: &(f64, f64)) -> OptResult<Cost> {
            Ok(-(theta[0] - data.0).powi(2) - 2.0 * (theta[1] - data.1).powi(2))
        }

        fn check(&self, theta: &Theta, _data: &(f64, f64)) -> OptResult<()> {
            if theta.len() != 2 {
                return Err(OptError::ThetaLengthMismatch { expected: 2, actual: theta.len() });
            }
            Ok(())
        }

        fn grad(&self, theta: &Theta, data: &(f64, f64)) -> OptResult<Grad> {
            if !self.analytic {
                return Err(OptError::GradientNotImplemented);
            }
            Ok(array![-2.0 * (theta[0] - data.0), -4.0 * (theta[1] - data.1)])
        }
    }

    #[test]
    // Purpose
    // -------
    // `maximize` finds the optimum with either line search and either
    // gradient source.
    //
    // Given
    // -----
    // - ℓ(θ) = -(θ₀-1)² - 2(θ₁+2)² from θ = (0, 0).
    //
    // Expect
    // ------
    // - θ̂ ≈ (1, -2) and ℓ(θ̂) ≈ 0 for all four combinations.
    fn maximize_recovers_optimum_for_all_configurations() {
        for line_searcher in [LineSearcher::MoreThuente, LineSearcher::HagerZhang] {
            for analytic in [true, false] {
                // Arrange
                let model = Concave { analytic };
                let opts = MLEOptions { line_searcher, ..MLEOptions::default() };

                // Act
                let outcome = maximize(&model, array![0.0, 0.0], &(1.0, -2.0), &opts)
                    .expect("optimizer should succeed");

                // Assert
                assert_abs_diff_eq!(outcome.theta_hat[0], 1.0, epsilon = 1e-4);
                assert_abs_diff_eq!(outcome.theta_hat[1], -2.0, epsilon = 1e-4);
                assert_abs_diff_eq!(outcome.value, 0.0, epsilon = 1e-6);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Invalid starting points fail before the solver runs.
    //
    // Given
    // -----
    // - A length-3 θ for a two-parameter model.
    //
    // Expect
    // ------
    // - `ThetaLengthMismatch { expected: 2, actual: 3 }`.
    fn maximize_rejects_invalid_start() {
        // Arrange
        let model = Concave { analytic: true };

        // Act
        let err = maximize(&model, array![0.0, 0.0, 0.0], &(1.0, -2.0), &MLEOptions::default());

        // Assert
        assert_eq!(err, Err(OptError::ThetaLengthMismatch { expected: 2, actual: 3 }));
    }
}
