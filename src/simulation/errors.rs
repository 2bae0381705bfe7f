//! Errors raised while running the simulator.
//!
//! ## Conventions
//! - `sample` is the 0-based sample id; on disk the working directory is
//!   `workdir.{sample + 1}`.
//! - Per-sample variants are absorbed by the batch evaluator and logged; the
//!   batch-level variants (`AllFailed`, `Pool`, `ShapeMismatch`) and
//!   `TooFewSamples` are fatal.

pub type SimResult<T> = Result<T, SimulationError>;

#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    // ---- Working directory ----
    MissingTemplate { path: String },

    WorkDir { path: String, reason: String },

    // ---- Process ----
    Spawn { sample: usize, driver: String, reason: String },

    /// The driver exited with a nonzero status (`None` when killed).
    ExitStatus { sample: usize, code: Option<i32> },

    // ---- Results ----
    MissingResults { sample: usize, path: String },

    EmptyResults { sample: usize },

    ParseResult { sample: usize, token: String },

    ResultLength { sample: usize, expected: usize, found: usize },

    NonFinite { sample: usize, index: usize, value: f64 },

    // ---- Batch ----
    ShapeMismatch { what: &'static str, expected: usize, found: usize },

    /// Every sample of an untruncated batch failed.
    AllFailed { attempted: usize, first: Box<SimulationError> },

    /// The worker pool could not be built.
    Pool { reason: String },

    /// Too few samples survived to train a model and no budget is left.
    TooFewSamples { accepted: usize, required: usize },
}

impl std::error::Error for SimulationError {}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::MissingTemplate { path } => {
                write!(f, "Error running FEM: template directory {path} does not exist")
            }
            SimulationError::WorkDir { path, reason } => {
                write!(f, "Error running FEM: cannot prepare {path}: {reason}")
            }
            SimulationError::Spawn { sample, driver, reason } => write!(
                f,
                "Error running FEM: cannot start {driver} for workdir.{}: {reason}",
                sample + 1
            ),
            SimulationError::ExitStatus { sample, code } => match code {
                Some(c) => {
                    write!(f, "Error running FEM: workdir.{} exited with status {c}", sample + 1)
                }
                None => write!(f, "Error running FEM: workdir.{} was terminated", sample + 1),
            },
            SimulationError::MissingResults { sample: _, path } => {
                write!(f, "Error running FEM: results.out missing at {path}")
            }
            SimulationError::EmptyResults { sample } => {
                write!(f, "Error running FEM: results.out of workdir.{} is empty", sample + 1)
            }
            SimulationError::ParseResult { sample, token } => write!(
                f,
                "Error running FEM: cannot parse '{token}' in results.out of workdir.{}",
                sample + 1
            ),
            SimulationError::ResultLength { sample, expected, found } => write!(
                f,
                "Error running FEM: workdir.{} returned {found} values, expected {expected}",
                sample + 1
            ),
            SimulationError::NonFinite { sample, index, value } => write!(
                f,
                "Error running FEM: response {index} at workdir.{} is {value}",
                sample + 1
            ),
            SimulationError::ShapeMismatch { what, expected, found } => {
                write!(f, "Simulation input mismatch in {what}: expected {expected}, found {found}")
            }
            SimulationError::AllFailed { attempted, first } => write!(
                f,
                "All {attempted} simulations of the batch failed; first failure: {first}"
            ),
            SimulationError::Pool { reason } => {
                write!(f, "Cannot start the simulation worker pool: {reason}")
            }
            SimulationError::TooFewSamples { accepted, required } => write!(
                f,
                "Only {accepted} valid samples remain and the simulation budget is spent; \
                 at least {required} are needed to train the surrogate"
            ),
        }
    }
}
