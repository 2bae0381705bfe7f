//! controller::adaptive — the adaptive sampling loop.
//!
//! Purpose
//! -------
//! Drive one surrogate run from the starting sample set to convergence:
//! check existing data, simulate the initial design, then alternate between
//! fitting the bank and evaluating DoE proposals until a stop condition
//! holds.
//!
//! Key behaviors
//! -------------
//! - Every iteration refits the bank with the current hyperparameters;
//!   calibration runs every `calibration_interval` iterations, and on every
//!   iteration for the pareto and random strategies.
//! - Stop conditions are checked in order: `count` (simulations spent reach
//!   the budget), `accuracy` (largest LOO NRMSE below the threshold),
//!   `time` (elapsed time above the budget less the last calibration time
//!   scaled to the full restart count).
//! - A DoE batch is at most `calibration_interval` points and never exceeds
//!   the remaining budget.
//! - With fewer than two rows the loop samples uniformly until a model can
//!   be trained. It stops with `time` when the deadline has passed and fails
//!   with `TooFewSamples` when the budget is spent.
//! - With the DoE shutoff enabled, a DoE round slower than one simulation
//!   fills the remaining budget with uniform random samples, refits without
//!   recalibrating and stops with `count`.
//!
//! Invariants & assumptions
//! ------------------------
//! - The simulation count is the next free sample id, so failed samples
//!   count against the budget and every iteration either spends budget or
//!   hits the deadline. The loop therefore terminates.
//! - The exit state is set exactly once.
//!
//! Downstream usage
//! ----------------
//! - `workflow` builds [`ControllerSettings`] from the options, runs the
//!   controller and hands [`RunOutcome`] to the exporter.
use crate::config::{errors::ConfigError, options::SurrogateOptions};
use crate::controller::{
    history::ErrorHistory,
    initial::{calibration_interval, consistency_check},
    state::{ControllerState, ExitCode},
};
use crate::doe::{DoeError, DoeSelector, DoeStrategy};
use crate::errors::UqResult;
use crate::gp::{CrossValidation, SurrogateBank};
use crate::report::diagnostics::Diagnostics;
use crate::samples::{
    design::{latin_hypercube, uniform},
    SampleSet,
};
use crate::simulation::{BatchOutcome, BatchRunner, SimulationError, Simulator};
use ndarray::{s, Array1, Array2, ArrayView2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Restart count the calibration-time estimate is scaled to.
const REFERENCE_RESTARTS: f64 = 10.0;

/// Rows needed before a model can be fitted and cross-validated.
const MIN_TRAINING_ROWS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    /// Simulation budget, sample ids included for failed runs.
    pub thr_count: usize,
    pub thr_nrmse: f64,
    /// Seconds; infinite when unlimited.
    pub thr_time: f64,
    /// Calibration interval and DoE batch size.
    pub calibration_interval: usize,
    /// `None` fills the budget with random designs.
    pub doe: Option<DoeStrategy>,
    pub bounds: Option<(Array1<f64>, Array1<f64>)>,
    pub break_doe: bool,
    pub seed: u64,
    /// Re-simulate the first existing row before sampling.
    pub check_existing: bool,
    /// Candidate and integration pool sizes; `None` uses the defaults.
    pub pool_sizes: Option<(usize, usize)>,
}

impl ControllerSettings {
    /// Settings for `options`; `workers` is `Some(n)` for a parallel run.
    pub fn from_options(options: &SurrogateOptions, workers: Option<usize>) -> Self {
        Self {
            thr_count: options.thr_count,
            thr_nrmse: options.thr_nrmse,
            thr_time: options.thr_time,
            calibration_interval: calibration_interval(workers),
            doe: options.doe,
            bounds: options.bounds.clone(),
            break_doe: options.break_doe,
            seed: options.seed,
            check_existing: true,
            pool_sizes: None,
        }
    }
}

/// Inputs simulated before the adaptive loop.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialDesign {
    /// A Latin hypercube of this many points inside the bounds.
    Lhs(usize),
    /// Explicit inputs, e.g. an imported design without outputs.
    Inputs(Array2<f64>),
}

/// Final state of a run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub bank: SurrogateBank,
    /// The adaptive set the final bank was trained on.
    pub samples: SampleSet,
    pub cv: CrossValidation,
    pub diagnostics: Diagnostics,
    pub history: ErrorHistory,
    pub exit: ExitCode,
    /// Simulator evaluations spent, failures and the consistency check
    /// included.
    pub n_simulated: usize,
    pub n_initial: usize,
    pub failures: usize,
    pub iterations: usize,
    pub elapsed: Duration,
    pub doe_shut_off: bool,
    pub calibration_interval: usize,
}

/// The adaptive loop over one bank.
pub struct Controller<'a> {
    settings: ControllerSettings,
    runner: &'a BatchRunner,
    simulator: Option<&'a dyn Simulator>,
    state: ControllerState,
    rng: ChaCha8Rng,
}

/// Loop bookkeeping shared by the exit paths.
struct Progress {
    start: Instant,
    n_simulated: usize,
    n_initial: usize,
    failures: usize,
    history: ErrorHistory,
}

/// The bank and its training data at an exit point.
struct Fitted {
    bank: SurrogateBank,
    samples: SampleSet,
    cv: CrossValidation,
    diagnostics: Diagnostics,
}

impl Progress {
    fn absorb(&mut self, samples: &mut SampleSet, outcome: &BatchOutcome) -> UqResult<()> {
        samples.append(outcome.x.view(), outcome.y.view())?;
        self.n_simulated = outcome.next_sample_id;
        self.failures += outcome.failures.len();
        Ok(())
    }
}

impl<'a> Controller<'a> {
    pub fn new(
        settings: ControllerSettings, runner: &'a BatchRunner, simulator: Option<&'a dyn Simulator>,
    ) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(settings.seed);
        Self { settings, runner, simulator, state: ControllerState::Initializing, rng }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    fn enter(&mut self, next: ControllerState) {
        debug!(from = ?self.state, to = ?next, "controller state");
        self.state = next;
    }

    fn simulator(&self) -> UqResult<&'a dyn Simulator> {
        Ok(self.simulator.ok_or(ConfigError::MissingDriver)?)
    }

    fn bounds(&self) -> UqResult<(Array1<f64>, Array1<f64>)> {
        let missing = || ConfigError::MissingBounds { name: "sampling box".to_string() };
        Ok(self.settings.bounds.clone().ok_or_else(missing)?)
    }

    fn evaluate(
        &self, x: ArrayView2<f64>, offset: usize, deadline: Option<Instant>,
    ) -> UqResult<BatchOutcome> {
        let sim = self.simulator()?;
        Ok(self.runner.evaluate_batch(sim, x, offset, deadline)?)
    }

    /// Run to convergence.
    ///
    /// Parameters
    /// ----------
    /// - `bank`: an unfitted bank whose fidelity case is already decided.
    /// - `existing`: rows available before any simulation (may be empty).
    /// - `initial`: the design simulated before the loop.
    ///
    /// Errors
    /// ------
    /// - `Configuration` for dimension mismatches, inconsistent existing data
    ///   or a missing simulator/bounds when sampling is needed.
    /// - `Simulation` (`TooFewSamples`) when failures leave fewer than two
    ///   rows and no budget remains.
    /// - Simulation, calibration and model errors from the components.
    pub fn run(
        &mut self, mut bank: SurrogateBank, existing: SampleSet, initial: InitialDesign,
    ) -> UqResult<RunOutcome> {
        let settings = self.settings.clone();
        let start = Instant::now();
        let deadline = Duration::try_from_secs_f64(settings.thr_time)
            .ok()
            .and_then(|d| start.checked_add(d));
        let mut samples = existing;
        let mut progress = Progress {
            start,
            n_simulated: 0,
            n_initial: 0,
            failures: 0,
            history: ErrorHistory::new(),
        };

        // ---- Initializing ----
        self.enter(ControllerState::Initializing);
        let x_dim = bank.ranges().len();
        if samples.x_dim() != x_dim {
            return Err(ConfigError::DimensionMismatch {
                what: "existing input columns".into(),
                expected: x_dim,
                found: samples.x_dim(),
            }
            .into());
        }
        let mut initial = initial;
        if let InitialDesign::Inputs(x) = &initial {
            if x.ncols() != x_dim {
                return Err(ConfigError::DimensionMismatch {
                    what: "initial design columns".into(),
                    expected: x_dim,
                    found: x.ncols(),
                }
                .into());
            }
        }
        if let Some(sim) = self.simulator {
            if settings.check_existing && !samples.is_empty() {
                progress.n_simulated = consistency_check(sim, self.runner, &samples, 0)?;
                if let InitialDesign::Lhs(n) = initial {
                    initial = InitialDesign::Lhs(n.saturating_sub(1));
                }
            }
        }

        // ---- SamplingInitial ----
        self.enter(ControllerState::SamplingInitial);
        let x_init = match initial {
            InitialDesign::Lhs(0) => Array2::zeros((0, x_dim)),
            InitialDesign::Lhs(n) => {
                let (lower, upper) = self.bounds()?;
                latin_hypercube(n, &lower, &upper, &mut self.rng)?
            }
            InitialDesign::Inputs(x) => x,
        };
        let mut t_sim_each = f64::INFINITY;
        if x_init.nrows() > 0 {
            let outcome = self.evaluate(x_init.view(), progress.n_simulated, deadline)?;
            progress.n_initial = x_init.nrows();
            t_sim_each = outcome.elapsed.as_secs_f64() / x_init.nrows() as f64;
            progress.absorb(&mut samples, &outcome)?;
            info!(
                requested = x_init.nrows(),
                accepted = outcome.accepted(),
                seconds = outcome.elapsed.as_secs_f64(),
                "initial design simulated"
            );
        }

        let time_cap = if settings.break_doe {
            Duration::try_from_secs_f64(t_sim_each).ok()
        } else {
            None
        };
        let restarts = bank.settings().calibration.num_restarts.max(1) as f64;
        let calib_scale = (REFERENCE_RESTARTS / restarts).round();
        let strategy = settings.doe.unwrap_or(DoeStrategy::Random);
        let selector = settings.bounds.clone().map(|(lower, upper)| {
            let selector = DoeSelector::new(strategy, lower, upper);
            match settings.pool_sizes {
                Some((nc, nq)) => selector.with_pool_sizes(nc, nq),
                None => selector,
            }
        });
        let mut calib_time = 0.0;
        let mut iteration = 0;

        loop {
            if samples.len() < MIN_TRAINING_ROWS {
                if deadline.is_some_and(|d| Instant::now() > d) {
                    warn!(
                        n_samples = samples.len(),
                        "time budget spent before the surrogate could be trained"
                    );
                    let cv = CrossValidation::empty(x_dim, samples.y_dim());
                    let diagnostics = Diagnostics::from_cross_validation(&cv);
                    let fitted = Fitted { bank, samples, cv, diagnostics };
                    return Ok(self.finish(fitted, progress, ExitCode::Time, iteration, false));
                }
                let remaining = settings.thr_count.saturating_sub(progress.n_simulated);
                if remaining == 0 || self.simulator.is_none() {
                    return Err(SimulationError::TooFewSamples {
                        accepted: samples.len(),
                        required: MIN_TRAINING_ROWS,
                    }
                    .into());
                }
                let n = settings
                    .calibration_interval
                    .max(MIN_TRAINING_ROWS - samples.len())
                    .min(remaining);
                warn!(n_samples = samples.len(), added = n, "too few samples to train");
                let (lower, upper) = self.bounds()?;
                let x_fill = uniform(n, &lower, &upper, &mut self.rng)?;
                let outcome = self.evaluate(x_fill.view(), progress.n_simulated, deadline)?;
                progress.absorb(&mut samples, &outcome)?;
                continue;
            }

            // ---- Fitting ----
            self.enter(ControllerState::Fitting);
            bank.fit(&samples)?;
            let calibrate = iteration % settings.calibration_interval.max(1) == 0
                || strategy.calibrates_every_iteration();
            if calibrate {
                let t = Instant::now();
                bank.calibrate(time_cap, &mut self.rng)?;
                calib_time = t.elapsed().as_secs_f64() * calib_scale;
            }
            let cv = bank.cross_validate()?;
            let diagnostics = Diagnostics::from_cross_validation(&cv);
            progress.history.push(iteration, samples.len(), diagnostics.nrmse.clone());
            info!(
                iteration,
                n_samples = samples.len(),
                n_simulated = progress.n_simulated,
                max_nrmse = diagnostics.max_nrmse(),
                calibrated = calibrate,
                "surrogate updated"
            );

            let elapsed = start.elapsed().as_secs_f64();
            let exit = if progress.n_simulated >= settings.thr_count {
                Some(ExitCode::Count)
            } else if diagnostics.max_nrmse() < settings.thr_nrmse {
                Some(ExitCode::Accuracy)
            } else if elapsed > settings.thr_time - calib_time {
                Some(ExitCode::Time)
            } else {
                None
            };
            if let Some(code) = exit {
                let fitted = Fitted { bank, samples, cv, diagnostics };
                return Ok(self.finish(fitted, progress, code, iteration, false));
            }

            // ---- EvaluatingCandidates ----
            self.enter(ControllerState::EvaluatingCandidates);
            let remaining = settings.thr_count - progress.n_simulated;
            let batch = settings.calibration_interval.max(1).min(remaining);
            let selector = selector
                .as_ref()
                .ok_or_else(|| ConfigError::MissingBounds { name: "sampling box".to_string() })?;
            let t_doe = Instant::now();
            let proposal = selector.select(&bank, &cv, batch, &mut self.rng)?;
            let t_doe = t_doe.elapsed().as_secs_f64();
            if proposal.is_empty() {
                return Err(DoeError::EmptyPool { what: "proposal" }.into());
            }
            debug!(iteration, batch, seconds = t_doe, qoi = proposal.qoi, "doe round");

            if settings.break_doe && t_doe > t_sim_each {
                warn!(
                    doe_seconds = t_doe,
                    simulation_seconds = t_sim_each,
                    remaining,
                    "DoE is slower than a simulation; filling the remaining budget at random"
                );
                let (lower, upper) = self.bounds()?;
                let x_fill = uniform(remaining, &lower, &upper, &mut self.rng)?;
                let outcome = self.evaluate(x_fill.view(), progress.n_simulated, deadline)?;
                progress.absorb(&mut samples, &outcome)?;
                bank.fit(&samples)?;
                let cv = bank.cross_validate()?;
                let diagnostics = Diagnostics::from_cross_validation(&cv);
                iteration += 1;
                progress.history.push(iteration, samples.len(), diagnostics.nrmse.clone());
                let code = if outcome.truncated { ExitCode::Time } else { ExitCode::Count };
                let fitted = Fitted { bank, samples, cv, diagnostics };
                return Ok(self.finish(fitted, progress, code, iteration, true));
            }

            let points = proposal.points.slice(s![..batch.min(proposal.len()), ..]);
            let outcome = self.evaluate(points, progress.n_simulated, deadline)?;
            progress.absorb(&mut samples, &outcome)?;
            iteration += 1;
        }
    }

    fn finish(
        &mut self, fitted: Fitted, progress: Progress, exit: ExitCode, iterations: usize,
        doe_shut_off: bool,
    ) -> RunOutcome {
        let Fitted { bank, samples, cv, diagnostics } = fitted;
        self.enter(ControllerState::Converged(exit));
        let elapsed = progress.start.elapsed();
        info!(
            exit = exit.label(),
            n_samples = samples.len(),
            n_simulated = progress.n_simulated,
            max_nrmse = diagnostics.max_nrmse(),
            seconds = elapsed.as_secs_f64(),
            "surrogate converged"
        );
        RunOutcome {
            bank,
            samples,
            cv,
            diagnostics,
            history: progress.history,
            exit,
            n_simulated: progress.n_simulated,
            n_initial: progress.n_initial,
            failures: progress.failures,
            iterations,
            elapsed,
            doe_shut_off,
            calibration_interval: self.settings.calibration_interval,
        }
    }
}
