//! workflow — one surrogate run from a configuration document to files.
//!
//! Purpose
//! -------
//! Wire the components together the way the `build_surrogate` binary runs
//! them: parse the document, read any data files, build the simulators and
//! the model bank, run the controller and export the results.
//!
//! Key behaviors
//! -------------
//! - Data files are read with their expected column counts before anything
//!   is simulated, so a malformed table fails fast as a configuration error.
//! - Model ranges are the sampling box widths, or twice the column standard
//!   deviation when the inputs are imported.
//! - In the model-model case the low-fidelity set is simulated up front in
//!   `work_dir/lf`; the data-model case also runs its low-fidelity simulator
//!   there.
//! - Predictive-error percentiles are computed only when a simulator and a
//!   sampling box exist.
//!
//! Downstream usage
//! ----------------
//! - `bin/build_surrogate.rs` calls [`run_workflow`] and records failures in
//!   the error log.
use crate::config::{
    errors::ConfigError,
    options::{DataFiles, DataSource, FidelitySource, RunSettings, SurrogateOptions},
    InputDocument,
};
use crate::controller::{
    initial::initial_design_size, Controller, ControllerSettings, InitialDesign, RunOutcome,
};
use crate::errors::UqResult;
use crate::gp::{FidelityCase, SurrogateBank};
use crate::report::{
    diagnostics::{percentile_errors, PredictionErrorPercentiles},
    export::{ExportInput, Exporter, RunSummary},
};
use crate::samples::{design::latin_hypercube, table::read_table, SampleSet};
use crate::simulation::{BatchRunner, ExternalSimulator, Simulator};
use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub options: SurrogateOptions,
    pub run: RunOutcome,
    pub percentiles: Option<PredictionErrorPercentiles>,
    pub summary: RunSummary,
}

/// Data, simulator and model layout of one run.
struct Plan {
    case: FidelityCase,
    existing: SampleSet,
    simulator: Option<ExternalSimulator>,
    initial: InitialDesign,
    ranges: Array1<f64>,
}

/// Load the document at `config` and run it.
pub fn run_workflow(config: &Path, run: &RunSettings) -> UqResult<WorkflowOutcome> {
    let doc = InputDocument::load(config)?;
    let options = SurrogateOptions::from_document(&doc, &run.template_dir)?;
    run_options(options, run)
}

/// Run already-parsed options.
///
/// Errors
/// ------
/// - `Configuration` for malformed data files, a missing driver or a missing
///   template directory, all raised before the first simulation.
/// - Any error of the controller or the exporter.
pub fn run_options(options: SurrogateOptions, run: &RunSettings) -> UqResult<WorkflowOutcome> {
    let runner = if options.parallel && run.n_workers > 1 {
        BatchRunner::parallel(run.n_workers)?
    } else {
        BatchRunner::sequential()
    };
    let workers = runner.is_parallel().then(|| runner.n_workers());
    info!(
        x_dim = options.x_dim(),
        y_dim = options.y_dim(),
        parallel = runner.is_parallel(),
        workers = runner.n_workers(),
        "surrogate run started"
    );

    let plan = plan(&options, run, &runner, workers)?;
    let simulated = plan.simulator.is_some();
    let bank = SurrogateBank::new(plan.case, options.model_settings(), plan.ranges);
    let settings = ControllerSettings::from_options(&options, workers);
    let sim = plan.simulator.as_ref().map(|s| s as &dyn Simulator);
    let mut controller = Controller::new(settings, &runner, sim);
    let outcome = controller.run(bank, plan.existing, plan.initial)?;

    let percentiles = match (&options.bounds, simulated) {
        (Some((lower, upper)), true) if outcome.bank.is_fitted() => {
            let mut rng = ChaCha8Rng::seed_from_u64(options.seed.wrapping_add(1));
            let y_data = outcome.cv.y_true.view();
            Some(percentile_errors(&outcome.bank, y_data, lower, upper, &mut rng)?)
        }
        _ => None,
    };

    let summary = RunSummary {
        exit_code: outcome.exit.label(),
        thr_nrmse: options.thr_nrmse,
        thr_count: options.thr_count,
        thr_time: options.thr_time,
        n_samples: outcome.samples.len(),
        n_simulated: outcome.n_simulated,
        elapsed: outcome.elapsed,
        calibration_interval: outcome.calibration_interval,
        do_sampling: options.bounds.is_some(),
        do_simulation: simulated,
        do_doe: simulated && options.doe.is_some(),
        doe_shut_off: outcome.doe_shut_off,
        driver: run.driver.as_ref().map(|d| d.display().to_string()),
    };
    let input = ExportInput {
        options: &options,
        bank: &outcome.bank,
        samples: &outcome.samples,
        cv: &outcome.cv,
        diagnostics: &outcome.diagnostics,
        percentiles: percentiles.as_ref(),
        summary: &summary,
    };
    Exporter::new(&run.output_dir).write_all(&input)?;

    Ok(WorkflowOutcome { options, run: outcome, percentiles, summary })
}

fn plan(
    options: &SurrogateOptions, run: &RunSettings, runner: &BatchRunner, workers: Option<usize>,
) -> UqResult<Plan> {
    let x_dim = options.x_dim();
    let y_dim = options.y_dim();
    let box_ranges = || options.bounds.as_ref().map(|(lower, upper)| upper - lower);
    let lhs = |n_existing: usize| {
        InitialDesign::Lhs(initial_design_size(
            x_dim,
            options.thr_count,
            n_existing,
            options.initial_doe,
            workers,
        ))
    };

    let plan = match &options.source {
        DataSource::Sampling { existing } => {
            let existing = read_optional(existing.as_ref(), x_dim, y_dim)?;
            let simulator = Some(simulator(options, run, run.driver.as_ref(), &run.work_dir)?);
            Plan {
                case: FidelityCase::SingleFidelity,
                initial: lhs(existing.len()),
                ranges: required_ranges(box_ranges())?,
                existing,
                simulator,
            }
        }
        DataSource::Import { inputs, outputs } => {
            let x = read_table(inputs, Some(x_dim))?;
            let ranges = import_ranges(&x, options)?;
            match outputs {
                Some(path) => {
                    let y = read_table(path, Some(y_dim))?;
                    Plan {
                        case: FidelityCase::SingleFidelity,
                        existing: SampleSet::new(x, y)?,
                        simulator: None,
                        initial: InitialDesign::Lhs(0),
                        ranges,
                    }
                }
                None => Plan {
                    case: FidelityCase::SingleFidelity,
                    existing: SampleSet::empty(x_dim, y_dim),
                    simulator: Some(simulator(options, run, run.driver.as_ref(), &run.work_dir)?),
                    initial: InitialDesign::Inputs(x),
                    ranges,
                },
            }
        }
        DataSource::MultiFidelity { high, low } => match (high, low) {
            (FidelitySource::Data(h), FidelitySource::Data(l)) => {
                let high = read_set(h, x_dim, y_dim)?;
                let ranges = import_ranges(high.x(), options)?;
                Plan {
                    case: FidelityCase::DataData { low: read_set(l, x_dim, y_dim)? },
                    existing: high,
                    simulator: None,
                    initial: InitialDesign::Lhs(0),
                    ranges,
                }
            }
            (FidelitySource::Model { existing, .. }, FidelitySource::Data(l)) => {
                let low = read_set(l, x_dim, y_dim)?;
                let existing = read_optional(existing.as_ref(), x_dim, y_dim)?;
                let simulator = Some(simulator(options, run, run.driver.as_ref(), &run.work_dir)?);
                Plan {
                    case: FidelityCase::ModelData { low },
                    initial: lhs(existing.len()),
                    ranges: required_ranges(box_ranges())?,
                    existing,
                    simulator,
                }
            }
            (FidelitySource::Data(h), FidelitySource::Model { existing, .. }) => {
                let high = read_set(h, x_dim, y_dim)?;
                let existing = read_optional(existing.as_ref(), x_dim, y_dim)?;
                let simulator = Some(low_fidelity_simulator(options, run)?);
                Plan {
                    case: FidelityCase::DataModel { high },
                    initial: lhs(existing.len()),
                    ranges: required_ranges(box_ranges())?,
                    existing,
                    simulator,
                }
            }
            (
                FidelitySource::Model { existing: hf_existing, .. },
                FidelitySource::Model { samples, existing: lf_existing },
            ) => {
                let hf_existing = read_optional(hf_existing.as_ref(), x_dim, y_dim)?;
                let mut low = read_optional(lf_existing.as_ref(), x_dim, y_dim)?;
                let hf_sim = simulator(options, run, run.driver.as_ref(), &run.work_dir)?;
                let lf_sim = low_fidelity_simulator(options, run)?;
                let ranges = required_ranges(box_ranges())?;
                simulate_low_fidelity(options, runner, &lf_sim, *samples, &mut low)?;
                Plan {
                    case: FidelityCase::ModelModel { low },
                    initial: lhs(hf_existing.len()),
                    existing: hf_existing,
                    simulator: Some(hf_sim),
                    ranges,
                }
            }
        },
    };
    Ok(plan)
}

fn read_set(files: &DataFiles, x_dim: usize, y_dim: usize) -> UqResult<SampleSet> {
    let x = read_table(&files.inputs, Some(x_dim))?;
    let y = read_table(&files.outputs, Some(y_dim))?;
    if x.nrows() != y.nrows() {
        return Err(ConfigError::DimensionMismatch {
            what: format!("rows of {}", files.outputs.display()),
            expected: x.nrows(),
            found: y.nrows(),
        }
        .into());
    }
    Ok(SampleSet::new(x, y)?)
}

fn read_optional(files: Option<&DataFiles>, x_dim: usize, y_dim: usize) -> UqResult<SampleSet> {
    match files {
        Some(files) => read_set(files, x_dim, y_dim),
        None => Ok(SampleSet::empty(x_dim, y_dim)),
    }
}

fn simulator(
    options: &SurrogateOptions, run: &RunSettings, driver: Option<&PathBuf>, work_dir: &Path,
) -> UqResult<ExternalSimulator> {
    let driver = driver.ok_or(ConfigError::MissingDriver)?;
    Ok(ExternalSimulator::new(
        run.template_dir.clone(),
        work_dir.to_path_buf(),
        driver.clone(),
        options.x_names(),
        options.y_dim(),
    )?)
}

fn low_fidelity_simulator(
    options: &SurrogateOptions, run: &RunSettings,
) -> UqResult<ExternalSimulator> {
    let driver = run.lf_driver.as_ref().or(run.driver.as_ref());
    simulator(options, run, driver, &run.work_dir.join("lf"))
}

/// Simulate `n` LHS points on the low-fidelity model and append them.
fn simulate_low_fidelity(
    options: &SurrogateOptions, runner: &BatchRunner, sim: &ExternalSimulator, n: usize,
    low: &mut SampleSet,
) -> UqResult<()> {
    let Some((lower, upper)) = &options.bounds else {
        return Err(ConfigError::MissingBounds { name: "sampling box".to_string() }.into());
    };
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed.wrapping_add(2));
    let x = latin_hypercube(n, lower, upper, &mut rng)?;
    let outcome = runner.evaluate_batch(sim, x.view(), 0, None)?;
    low.append(outcome.x.view(), outcome.y.view())?;
    info!(requested = n, accepted = outcome.accepted(), "low-fidelity set simulated");
    Ok(())
}

fn required_ranges(ranges: Option<Array1<f64>>) -> UqResult<Array1<f64>> {
    Ok(ranges.ok_or_else(|| ConfigError::MissingBounds { name: "sampling box".to_string() })?)
}

/// Twice the population standard deviation of each input column.
fn import_ranges(x: &Array2<f64>, options: &SurrogateOptions) -> UqResult<Array1<f64>> {
    if x.nrows() == 0 {
        return Err(ConfigError::TooFewSamples { count: 0 }.into());
    }
    let ranges = x.std_axis(Axis(0), 0.0) * 2.0;
    if let Some(j) = ranges.iter().position(|&r| r.is_nan() || r <= 0.0) {
        let name = options.variables.get(j).map(|v| v.name.clone()).unwrap_or_default();
        return Err(ConfigError::ZeroRange { name }.into());
    }
    Ok(ranges)
}
