//! loglik_optimizer::restarts — multi-start maximization with a wall-clock cap.
//!
//! Purpose
//! -------
//! Run [`maximize`] from a sequence of starting points and keep the start
//! with the highest log-likelihood. GP marginal likelihoods are multimodal in
//! the length scales, so a single L-BFGS run is rarely enough.
//!
//! Key behaviors
//! -------------
//! - Starting points are produced lazily by a caller closure, which sees the
//!   restart index and the best outcome so far. This lets the GP layer seed
//!   later starts around the incumbent.
//! - A failed start (non-finite likelihood, singular covariance, argmin
//!   error) is counted and skipped; it never aborts the sequence.
//! - When a single start takes longer than `time_cap`, no further starts are
//!   attempted. The cap keeps calibration cheaper than one more simulator
//!   run.
//!
//! Invariants & assumptions
//! ------------------------
//! - `num_restarts >= 1`; zero is rejected with
//!   `OptError::NoRestartsRequested`.
//! - `attempts == successes + failures` in the returned [`RestartOutcome`].
//!
//! Downstream usage
//! ----------------
//! - `gp::calibration` calls [`maximize_with_restarts`] once per QoI and
//!   decides whether an empty `best` is fatal (nonzero target variance) or
//!   tolerable (constant targets).
//!
//! Testing notes
//! -------------
//! - Unit tests cover best-of selection, skipping failed starts, and the
//!   early stop triggered by `time_cap`.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{api::maximize, LogLikelihood, MLEOptions, OptimOutcome, Theta},
};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestartOptions {
    pub num_restarts: usize,
    pub time_cap: Option<Duration>,
}

impl RestartOptions {
    pub fn new(num_restarts: usize, time_cap: Option<Duration>) -> OptResult<Self> {
        if num_restarts == 0 {
            return Err(OptError::NoRestartsRequested);
        }
        Ok(Self { num_restarts, time_cap })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestartOutcome {
    pub best: Option<OptimOutcome>,
    pub best_index: Option<usize>,
    pub attempts: usize,
    pub failures: usize,
    pub last_error: Option<OptError>,
    pub elapsed: Duration,
}

/// Maximize `f` from up to `restarts.num_restarts` starting points.
///
/// Parameters
/// ----------
/// - `f`, `data`, `opts`: forwarded to [`maximize`] for every start.
/// - `restarts`: number of starts and the per-start time cap.
/// - `next_start`: `FnMut(index, best_so_far) -> Theta`.
///
/// Returns
/// -------
/// `OptResult<RestartOutcome>`; `best` is `None` when every start failed.
pub fn maximize_with_restarts<F, G>(
    f: &F, data: &F::Data, opts: &MLEOptions, restarts: &RestartOptions, mut next_start: G,
) -> OptResult<RestartOutcome>
where
    F: LogLikelihood,
    G: FnMut(usize, Option<&OptimOutcome>) -> Theta,
{
    if restarts.num_restarts == 0 {
        return Err(OptError::NoRestartsRequested);
    }
    let started = Instant::now();
    let mut outcome = RestartOutcome {
        best: None,
        best_index: None,
        attempts: 0,
        failures: 0,
        last_error: None,
        elapsed: Duration::ZERO,
    };

    for index in 0..restarts.num_restarts {
        let theta0 = next_start(index, outcome.best.as_ref());
        let t_start = Instant::now();
        outcome.attempts += 1;
        match maximize(f, theta0, data, opts) {
            Ok(candidate) => {
                let better = outcome.best.as_ref().map_or(true, |b| candidate.value > b.value);
                debug!(restart = index, log_lik = candidate.value, better, "calibration start");
                if better {
                    outcome.best = Some(candidate);
                    outcome.best_index = Some(index);
                }
            }
            Err(err) => {
                debug!(restart = index, error = %err, "calibration start failed");
                outcome.failures += 1;
                outcome.last_error = Some(err);
            }
        }
        if let Some(cap) = restarts.time_cap {
            if t_start.elapsed() > cap {
                debug!(restart = index, "restart time cap exceeded, stopping early");
                break;
            }
        }
    }

    outcome.elapsed = started.elapsed();
    Ok(outcome)
}
