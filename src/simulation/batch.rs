//! simulation::batch — evaluate a batch of inputs under a wall-clock budget.
//!
//! Purpose
//! -------
//! Run a [`Simulator`] on every row of a candidate matrix, sequentially or on
//! a fixed-size rayon pool, and keep only the samples that produced a valid
//! response.
//!
//! Key behaviors
//! -------------
//! - Row `i` runs as sample `offset + i`.
//! - The deadline is checked between samples (sequential) or before each job
//!   starts (parallel). Started jobs always run to completion.
//! - A failing sample (process error, wrong length, non-finite value) is
//!   logged, recorded in [`BatchOutcome::failures`] and dropped.
//! - `next_sample_id` is one past the largest attempted id, so working
//!   directory names stay unique across batches.
//!
//! Invariants & assumptions
//! ------------------------
//! - Accepted rows keep their input order.
//! - A batch where every attempted sample failed, and that was not cut by the
//!   deadline, is an error.
use crate::simulation::{
    errors::{SimResult, SimulationError},
    simulator::{check_response, Simulator},
};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Accepted inputs.
    pub x: Array2<f64>,
    /// Responses of the accepted inputs.
    pub y: Array2<f64>,
    pub next_sample_id: usize,
    pub failures: Vec<SimulationError>,
    /// True when the deadline stopped the batch early.
    pub truncated: bool,
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub fn accepted(&self) -> usize {
        self.x.nrows()
    }
}

/// Sequential or pooled batch execution.
pub struct BatchRunner {
    pool: Option<rayon::ThreadPool>,
    n_workers: usize,
}

impl std::fmt::Debug for BatchRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRunner").field("n_workers", &self.n_workers).finish()
    }
}

impl BatchRunner {
    pub fn sequential() -> Self {
        Self { pool: None, n_workers: 1 }
    }

    /// A runner with its own pool of `n_workers` threads.
    ///
    /// Errors
    /// ------
    /// - `Pool` when the thread pool cannot be built.
    pub fn parallel(n_workers: usize) -> SimResult<Self> {
        let n_workers = n_workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_workers)
            .build()
            .map_err(|e| SimulationError::Pool { reason: e.to_string() })?;
        Ok(Self { pool: Some(pool), n_workers })
    }

    pub fn n_workers(&self) -> usize {
        self.n_workers
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Evaluate every row of `x`, starting at sample id `offset`.
    pub fn evaluate_batch<S: Simulator + ?Sized>(
        &self, sim: &S, x: ArrayView2<f64>, offset: usize, deadline: Option<Instant>,
    ) -> SimResult<BatchOutcome> {
        let start = Instant::now();
        let expired = || deadline.is_some_and(|d| Instant::now() > d);
        let run = |i: usize| -> SimResult<Array1<f64>> {
            let sample = offset + i;
            let y = sim.evaluate(x.row(i), sample)?;
            check_response(&y, sim.y_dim(), sample)?;
            Ok(y)
        };

        let results: Vec<Option<SimResult<Array1<f64>>>> = match &self.pool {
            None => {
                let mut out = Vec::with_capacity(x.nrows());
                for i in 0..x.nrows() {
                    if expired() {
                        break;
                    }
                    out.push(Some(run(i)));
                }
                out.resize_with(x.nrows(), || None);
                out
            }
            Some(pool) => pool.install(|| {
                (0..x.nrows())
                    .into_par_iter()
                    .map(|i| if expired() { None } else { Some(run(i)) })
                    .collect()
            }),
        };

        let mut accepted = Vec::new();
        let mut rows = Vec::new();
        let mut failures = Vec::new();
        let mut last_attempted = None;
        for (i, result) in results.into_iter().enumerate() {
            match result {
                None => {}
                Some(Ok(y)) => {
                    last_attempted = Some(i);
                    accepted.push(i);
                    rows.push(y);
                }
                Some(Err(e)) => {
                    last_attempted = Some(i);
                    warn!(sample = offset + i, error = %e, "simulation failed; sample dropped");
                    failures.push(e);
                }
            }
        }
        let attempted = accepted.len() + failures.len();
        let truncated = attempted < x.nrows();
        if truncated {
            info!(attempted, requested = x.nrows(), "batch truncated by the time limit");
        }
        if accepted.is_empty() && attempted > 0 && !truncated {
            return Err(SimulationError::AllFailed {
                attempted,
                first: Box::new(failures.swap_remove(0)),
            });
        }

        let y_dim = sim.y_dim();
        let mut y = Array2::<f64>::zeros((rows.len(), y_dim));
        for (r, row) in rows.iter().enumerate() {
            y.row_mut(r).assign(row);
        }
        Ok(BatchOutcome {
            x: x.select(Axis(0), &accepted),
            y,
            next_sample_id: offset + last_attempted.map_or(0, |i| i + 1),
            failures,
            truncated,
            elapsed: start.elapsed(),
        })
    }
}
