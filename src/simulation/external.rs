//! simulation::external — run an external driver in a per-sample directory.
//!
//! Contract
//! --------
//! For sample `id` the adapter:
//! 1. copies `template_dir` to `work_dir/workdir.{id+1}`;
//! 2. writes `params.in`: `x_dim` on the first line, then `name value` per
//!    variable;
//! 3. runs the driver with the sample directory as working directory
//!    (a relative driver path is resolved inside that directory, so drivers
//!    shipped in the template work unchanged);
//! 4. reads `results.out` as whitespace-separated numbers.
//!
//! Working directories are never removed here.
use crate::simulation::{
    errors::{SimResult, SimulationError},
    simulator::Simulator,
};
use ndarray::{Array1, ArrayView1};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::debug;

pub const PARAMS_FILE: &str = "params.in";
pub const RESULTS_FILE: &str = "results.out";

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalSimulator {
    template_dir: PathBuf,
    work_dir: PathBuf,
    driver: PathBuf,
    x_names: Vec<String>,
    y_dim: usize,
}

impl ExternalSimulator {
    /// Errors
    /// ------
    /// - `MissingTemplate` when `template_dir` is not a directory.
    pub fn new(
        template_dir: PathBuf, work_dir: PathBuf, driver: PathBuf, x_names: Vec<String>,
        y_dim: usize,
    ) -> SimResult<Self> {
        if !template_dir.is_dir() {
            return Err(SimulationError::MissingTemplate { path: template_dir.display().to_string() });
        }
        Ok(Self { template_dir, work_dir, driver, x_names, y_dim })
    }

    pub fn sample_dir(&self, sample: usize) -> PathBuf {
        self.work_dir.join(format!("workdir.{}", sample + 1))
    }

    fn write_params(&self, dir: &Path, x: ArrayView1<f64>) -> SimResult<()> {
        if x.len() != self.x_names.len() {
            return Err(SimulationError::ShapeMismatch {
                what: "input row",
                expected: self.x_names.len(),
                found: x.len(),
            });
        }
        let path = dir.join(PARAMS_FILE);
        let mut text = format!("{}\n", x.len());
        for (name, value) in self.x_names.iter().zip(x.iter()) {
            text.push_str(&format!("{name} {value}\n"));
        }
        fs::File::create(&path)
            .and_then(|mut f| f.write_all(text.as_bytes()))
            .map_err(|e| work_dir_error(&path, &e))
    }

    fn run_driver(&self, dir: &Path, sample: usize) -> SimResult<()> {
        let driver = if self.driver.is_absolute() { self.driver.clone() } else { dir.join(&self.driver) };
        let status = Command::new(&driver).current_dir(dir).status().map_err(|e| {
            SimulationError::Spawn {
                sample,
                driver: driver.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(SimulationError::ExitStatus { sample, code: status.code() })
        }
    }
}

impl Simulator for ExternalSimulator {
    fn y_dim(&self) -> usize {
        self.y_dim
    }

    fn evaluate(&self, x: ArrayView1<f64>, sample: usize) -> SimResult<Array1<f64>> {
        let dir = self.sample_dir(sample);
        copy_dir(&self.template_dir, &dir)?;
        self.write_params(&dir, x)?;
        self.run_driver(&dir, sample)?;
        let y = read_results(&dir.join(RESULTS_FILE), sample)?;
        debug!(sample, dir = %dir.display(), "simulation finished");
        Ok(y)
    }
}

/// Parse a results file into a flat vector.
pub fn read_results(path: &Path, sample: usize) -> SimResult<Array1<f64>> {
    let text = fs::read_to_string(path).map_err(|_| SimulationError::MissingResults {
        sample,
        path: path.display().to_string(),
    })?;
    let values = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<f64>().map_err(|_| SimulationError::ParseResult { sample, token: t.to_string() }))
        .collect::<SimResult<Vec<f64>>>()?;
    if values.is_empty() {
        return Err(SimulationError::EmptyResults { sample });
    }
    Ok(Array1::from(values))
}

fn copy_dir(from: &Path, to: &Path) -> SimResult<()> {
    if !from.is_dir() {
        return Err(SimulationError::MissingTemplate { path: from.display().to_string() });
    }
    fs::create_dir_all(to).map_err(|e| work_dir_error(to, &e))?;
    let entries = fs::read_dir(from).map_err(|e| work_dir_error(from, &e))?;
    for entry in entries {
        let entry = entry.map_err(|e| work_dir_error(from, &e))?;
        let target = to.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| work_dir_error(&entry.path(), &e))?;
        if file_type.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| work_dir_error(&target, &e))?;
        }
    }
    Ok(())
}

fn work_dir_error(path: &Path, err: &std::io::Error) -> SimulationError {
    SimulationError::WorkDir { path: path.display().to_string(), reason: err.to_string() }
}
