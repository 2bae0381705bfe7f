//! simulation::simulator — the black-box simulator abstraction.
//!
//! A [`Simulator`] maps one input row and a 0-based sample id to a response
//! vector. Implementations may return anything; length and finiteness are
//! checked by the batch evaluator through [`check_response`].
use crate::simulation::errors::{SimResult, SimulationError};
use ndarray::{Array1, ArrayView1};

pub trait Simulator: Sync {
    /// Length of every response vector.
    fn y_dim(&self) -> usize;

    fn evaluate(&self, x: ArrayView1<f64>, sample: usize) -> SimResult<Array1<f64>>;
}

/// A simulator backed by a closure.
pub struct FnSimulator<F> {
    y_dim: usize,
    f: F,
}

impl<F> FnSimulator<F>
where
    F: Fn(ArrayView1<f64>) -> Array1<f64> + Sync,
{
    pub fn new(y_dim: usize, f: F) -> Self {
        Self { y_dim, f }
    }
}

impl<F> Simulator for FnSimulator<F>
where
    F: Fn(ArrayView1<f64>) -> Array1<f64> + Sync,
{
    fn y_dim(&self) -> usize {
        self.y_dim
    }

    fn evaluate(&self, x: ArrayView1<f64>, _sample: usize) -> SimResult<Array1<f64>> {
        Ok((self.f)(x))
    }
}

impl<S: Simulator + ?Sized> Simulator for &S {
    fn y_dim(&self) -> usize {
        (**self).y_dim()
    }

    fn evaluate(&self, x: ArrayView1<f64>, sample: usize) -> SimResult<Array1<f64>> {
        (**self).evaluate(x, sample)
    }
}

/// Reject responses of the wrong length or with non-finite entries.
pub fn check_response(y: &Array1<f64>, y_dim: usize, sample: usize) -> SimResult<()> {
    if y.is_empty() {
        return Err(SimulationError::EmptyResults { sample });
    }
    if y.len() != y_dim {
        return Err(SimulationError::ResultLength { sample, expected: y_dim, found: y.len() });
    }
    match y.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(SimulationError::NonFinite { sample, index, value: y[index] }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Responses are checked for length and finiteness.
    //
    // Given
    // -----
    // - A valid response, a short one, an empty one and one with NaN.
    //
    // Expect
    // ------
    // - Ok, `ResultLength`, `EmptyResults`, `NonFinite { index: 1 }`.
    fn check_response_flags_bad_vectors() {
        assert_eq!(check_response(&array![1.0, 2.0], 2, 0), Ok(()));
        assert!(matches!(
            check_response(&array![1.0], 2, 0),
            Err(SimulationError::ResultLength { expected: 2, found: 1, .. })
        ));
        assert_eq!(check_response(&Array1::zeros(0), 2, 3), Err(SimulationError::EmptyResults { sample: 3 }));
        assert!(matches!(
            check_response(&array![1.0, f64::NAN], 2, 0),
            Err(SimulationError::NonFinite { index: 1, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // A closure simulator forwards its input.
    //
    // Given
    // -----
    // - f(x) = [x0 + x1].
    //
    // Expect
    // ------
    // - [3] for (1, 2).
    fn fn_simulator_calls_closure() {
        let sim = FnSimulator::new(1, |x: ArrayView1<f64>| array![x[0] + x[1]]);
        assert_eq!(sim.y_dim(), 1);
        assert_eq!(sim.evaluate(array![1.0, 2.0].view(), 0), Ok(array![3.0]));
    }
}
