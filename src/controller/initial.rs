//! controller::initial — sizing and checking the initial design.
//!
//! Key behaviors
//! -------------
//! - [`initial_design_size`]: with no user value the reference size is
//!   `min(4·x_dim, thr_count + n_existing − 1, 500)`, rounded up to a
//!   multiple of the worker count when running in parallel, less the rows
//!   already available.
//! - [`calibration_interval`]: the worker count in parallel, otherwise 5.
//!   The interval is also the DoE batch size.
//! - [`consistency_check`]: re-simulate the first existing row and reject
//!   data that differs from the simulator by more than 1 % in any QoI.
use crate::config::errors::ConfigError;
use crate::errors::UqResult;
use crate::samples::SampleSet;
use crate::simulation::{BatchRunner, Simulator};
use ndarray::s;
use tracing::info;

/// Calibration interval of sequential runs.
pub const SEQUENTIAL_INTERVAL: usize = 5;

/// Largest automatically sized initial design.
pub const MAX_AUTO_INITIAL: usize = 500;

/// Relative tolerance of [`consistency_check`].
pub const CONSISTENCY_TOLERANCE: f64 = 0.01;

/// Number of initial LHS samples to simulate.
///
/// Parameters
/// ----------
/// - `user_init`: the configured size; `None`, or `Some(0)` without
///   existing data, sizes automatically.
/// - `workers`: `Some(n)` when running in parallel on `n` workers.
pub fn initial_design_size(
    x_dim: usize, thr_count: usize, n_existing: usize, user_init: Option<usize>,
    workers: Option<usize>,
) -> usize {
    match user_init {
        Some(n) if n > 0 || n_existing > 0 => n,
        _ => {
            let mut reference = (4 * x_dim)
                .min((thr_count + n_existing).saturating_sub(1))
                .min(MAX_AUTO_INITIAL);
            if let Some(w) = workers.filter(|&w| w > 1) {
                reference = reference.div_ceil(w) * w;
            }
            reference.saturating_sub(n_existing)
        }
    }
}

pub fn calibration_interval(workers: Option<usize>) -> usize {
    match workers {
        Some(w) if w > 1 => w,
        _ => SEQUENTIAL_INTERVAL,
    }
}

/// Simulate the first existing row as sample `sample` and compare.
///
/// Errors
/// ------
/// - `ConfigError::InconsistentData` when any QoI differs by more than 1 %
///   relative to the simulated value.
/// - Simulation errors, including a failed check run.
pub fn consistency_check<S: Simulator + ?Sized>(
    sim: &S, runner: &BatchRunner, existing: &SampleSet, sample: usize,
) -> UqResult<usize> {
    if existing.is_empty() {
        return Ok(sample);
    }
    let x0 = existing.x().slice(s![..1, ..]);
    let outcome = runner.evaluate_batch(sim, x0, sample, None)?;
    let y_sim = outcome.y.row(0);
    let y_ex = existing.y().row(0);
    for (qoi, (&simulated, &value)) in y_sim.iter().zip(y_ex.iter()).enumerate() {
        if ((simulated - value) / simulated).abs() > CONSISTENCY_TOLERANCE {
            let err = ConfigError::InconsistentData { row: 0, qoi, existing: value, simulated };
            return Err(err.into());
        }
    }
    info!(sample, "existing data agrees with the simulator");
    Ok(outcome.next_sample_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::UqError;
    use crate::simulation::FnSimulator;
    use ndarray::{array, Array1, ArrayView1};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Automatic and user-given initial design sizes.
    // - The 1 % consistency check in both directions.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Automatic sizing follows the reference formula.
    //
    // Given
    // -----
    // - x_dim 2, budget 20: reference 8.
    // - Three existing rows; four parallel workers; a user value.
    //
    // Expect
    // ------
    // - 8; 5 with three existing rows; 8 on four workers; 9 on three
    //   workers less three existing rows = 6; a zero user value sizes
    //   automatically only without existing rows; 7 stays 7.
    fn initial_design_size_cases() {
        assert_eq!(initial_design_size(2, 20, 0, None, None), 8);
        assert_eq!(initial_design_size(2, 20, 3, None, None), 5);
        assert_eq!(initial_design_size(2, 20, 0, None, Some(4)), 8);
        assert_eq!(initial_design_size(2, 20, 3, None, Some(3)), 6);
        assert_eq!(initial_design_size(2, 20, 0, Some(0), None), 8);
        assert_eq!(initial_design_size(2, 20, 3, Some(0), None), 0);
        assert_eq!(initial_design_size(2, 20, 0, Some(7), None), 7);
        assert_eq!(initial_design_size(1, 3, 0, None, None), 2);
        assert_eq!(calibration_interval(None), 5);
        assert_eq!(calibration_interval(Some(8)), 8);
    }

    #[test]
    // Purpose
    // -------
    // Existing data within 1 % passes and consumes one sample id; a larger
    // deviation is a configuration error.
    //
    // Given
    // -----
    // - Simulator y = 2x; existing rows (1, 2.01) and (1, 2.5).
    //
    // Expect
    // ------
    // - Ok(1) for the first; `InconsistentData { qoi: 0 }` for the second.
    fn consistency_check_tolerance() {
        let sim = FnSimulator::new(1, |x: ArrayView1<f64>| Array1::from_elem(1, 2.0 * x[0]));
        let runner = BatchRunner::sequential();

        let good = SampleSet::new(array![[1.0]], array![[2.01]]).expect("set");
        assert_eq!(consistency_check(&sim, &runner, &good, 0).expect("check"), 1);

        let bad = SampleSet::new(array![[1.0]], array![[2.5]]).expect("set");
        let err = consistency_check(&sim, &runner, &bad, 0).expect_err("mismatch");
        assert!(matches!(err, UqError::Config(ConfigError::InconsistentData { qoi: 0, .. })));
    }
}
