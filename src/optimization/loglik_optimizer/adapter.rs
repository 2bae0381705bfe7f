//! Adapter that exposes a `LogLikelihood` as an `argmin` problem.
//!
//! The GP layer *maximizes* a marginal log-likelihood `ℓ(θ)`; argmin minimizes.
//! The adapter defines the cost `c(θ) = -ℓ(θ)` and negates analytic gradients.
//! Likelihoods without an analytic gradient are differenced on the cost
//! closure through [`fd_gradient`], so no sign flip is needed in that branch.
use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        finite_diff::fd_gradient,
        traits::LogLikelihood,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};

#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta, self.data)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        Ok(-output)
    }
}

impl<'a, F: LogLikelihood> Gradient for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, theta.len())?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => fd_gradient(theta, |t| self.cost(t)),
            Err(e) => Err(e.into()),
        }
    }
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Sign conventions between log-likelihood and cost.
    // - Analytic gradient pass-through and the finite-difference fallback.
    // -------------------------------------------------------------------------

    // ℓ(θ) = -(θ - m)ᵀ(θ - m) with optional analytic gradient.
    struct Bowl {
        analytic: bool,
    }

    impl LogLikelihood for Bowl {
        type Data = Theta;

        fn value(&self, theta: &Theta, data: &Theta) -> OptResult<Cost> {
            Ok(-(theta - data).mapv(|d| d * d).sum())
        }

        fn check(&self, _theta: &Theta, _data: &Theta) -> OptResult<()> {
            Ok(())
        }

        fn grad(&self, theta: &Theta, data: &Theta) -> OptResult<Grad> {
            if self.analytic {
                Ok(-2.0 * (theta - data))
            } else {
                Err(OptError::GradientNotImplemented)
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Cost and analytic gradient are the negated likelihood quantities.
    //
    // Given
    // -----
    // - Bowl centred at m = (1, -1) with an analytic gradient, θ = (0, 0).
    //
    // Expect
    // ------
    // - cost = 2 and ∇c = (-2, 2).
    fn adapter_negates_value_and_analytic_gradient() {
        // Arrange
        let model = Bowl { analytic: true };
        let centre = array![1.0, -1.0];
        let adapter = ArgMinAdapter::new(&model, &centre);
        let theta = array![0.0, 0.0];

        // Act
        let cost = adapter.cost(&theta).expect("cost");
        let grad = adapter.gradient(&theta).expect("grad");

        // Assert
        assert_abs_diff_eq!(cost, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(grad[0], -2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(grad[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Without an analytic gradient the adapter differences the cost.
    //
    // Given
    // -----
    // - Bowl without gradient, same centre and θ as above.
    //
    // Expect
    // ------
    // - Finite-difference ∇c ≈ (-2, 2).
    fn adapter_falls_back_to_finite_differences() {
        // Arrange
        let model = Bowl { analytic: false };
        let centre = array![1.0, -1.0];
        let adapter = ArgMinAdapter::new(&model, &centre);

        // Act
        let grad = adapter.gradient(&array![0.0, 0.0]).expect("fd grad");

        // Assert
        assert_abs_diff_eq!(grad[0], -2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(grad[1], 2.0, epsilon = 1e-5);
    }
}
