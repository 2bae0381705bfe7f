// src/bin/build_surrogate.rs
//
// Build a GP surrogate from a JSON input document and write the results.

use clap::Parser;
use rust_surrogate::config::options::RunSettings;
use rust_surrogate::report::ErrorLog;
use rust_surrogate::run_workflow;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "build_surrogate",
    about = "Adaptive GP surrogate modeling with simulator-in-the-loop DoE",
    version
)]
struct Args {
    /// JSON input document.
    #[arg(long)]
    config: PathBuf,

    /// Directory that holds one `workdir.<k>` per simulation.
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Template copied into every working directory.
    /// Defaults to `<work-dir>/templatedir`.
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// Simulator driver run inside each working directory.
    #[arg(long)]
    driver: Option<PathBuf>,

    /// Low-fidelity driver for multi-fidelity runs (defaults to --driver).
    #[arg(long)]
    lf_driver: Option<PathBuf>,

    /// Where results and `dakota.err` are written. Defaults to --work-dir.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Worker threads for parallel execution.
    #[arg(long, default_value_t = 1)]
    workers: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut run = RunSettings::new(args.work_dir);
    if let Some(dir) = args.template_dir {
        run.template_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        run.output_dir = dir;
    }
    run.driver = args.driver;
    run.lf_driver = args.lf_driver;
    run.n_workers = args.workers.max(1);

    let log = match ErrorLog::create(&run.output_dir) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("cannot create the error log: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run_workflow(&args.config, &run) {
        Ok(done) => {
            tracing::info!(
                exit = done.summary.exit_code,
                samples = done.summary.n_samples,
                simulations = done.summary.n_simulated,
                "surrogate built"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            if let Err(e) = log.record(&err) {
                eprintln!("cannot write {}: {e}", log.path().display());
            }
            eprintln!("{}: {err}", err.kind().label());
            ExitCode::FAILURE
        }
    }
}
