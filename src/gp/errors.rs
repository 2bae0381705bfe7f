//! gp::errors — error type for the surrogate model bank.
//!
//! [`GpError`] covers malformed training data, kernel/nugget configuration,
//! covariance factorization, calibration and snapshot loading. The crate-level
//! [`UqError`](crate::errors::UqError) classifies each variant into the run's
//! error taxonomy (configuration, input domain, calibration).
use crate::optimization::errors::OptError;

pub type GpResult<T> = Result<T, GpError>;

#[derive(Debug, Clone, PartialEq)]
pub enum GpError {
    // ---- Training data ----
    EmptyTrainingSet,

    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    NonFiniteData {
        what: &'static str,
        index: usize,
        value: f64,
    },

    NonPositiveTarget {
        qoi: usize,
        row: usize,
        value: f64,
    },

    // ---- Configuration ----
    UnknownKernel {
        name: String,
    },

    InvalidNugget {
        qoi: usize,
        reason: &'static str,
    },

    RowOutOfRange {
        row: usize,
        len: usize,
    },

    // ---- Linear algebra ----
    NotPositiveDefinite {
        size: usize,
        jitter: f64,
    },

    // ---- Calibration ----
    CalibrationFailed {
        qoi: usize,
        attempts: usize,
        reason: String,
    },

    Optimization(OptError),

    // ---- Snapshot ----
    InvalidSnapshot {
        reason: String,
    },
}

impl std::error::Error for GpError {}

impl std::fmt::Display for GpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Training data ----
            GpError::EmptyTrainingSet => write!(f, "Training set is empty"),
            GpError::ShapeMismatch { what, expected, found } => {
                write!(f, "Shape mismatch in {what}: expected {expected}, found {found}")
            }
            GpError::NonFiniteData { what, index, value } => {
                write!(f, "Non-finite value {value} in {what} at index {index}")
            }
            GpError::NonPositiveTarget { qoi, row, value } => {
                write!(
                    f,
                    "Response {qoi} contains a non-positive value {value} at row {row}; \
                     disable the log-transform option"
                )
            }

            // ---- Configuration ----
            GpError::UnknownKernel { name } => {
                write!(
                    f,
                    "Unknown kernel '{name}'; expected 'Radial Basis', 'Exponential', \
                     'Matern 3/2' or 'Matern 5/2'"
                )
            }
            GpError::InvalidNugget { qoi, reason } => {
                write!(f, "Invalid nugget specification for QoI {qoi}: {reason}")
            }
            GpError::RowOutOfRange { row, len } => {
                write!(f, "Row {row} out of range for a training set of {len} rows")
            }

            // ---- Linear algebra ----
            GpError::NotPositiveDefinite { size, jitter } => {
                write!(
                    f,
                    "Covariance matrix of size {size} is not positive definite \
                     (jitter up to {jitter:e})"
                )
            }

            // ---- Calibration ----
            GpError::CalibrationFailed { qoi, attempts, reason } => {
                write!(
                    f,
                    "Hyperparameter calibration failed for QoI {qoi} after {attempts} \
                     start(s): {reason}"
                )
            }
            GpError::Optimization(err) => write!(f, "Optimizer error: {err}"),

            // ---- Snapshot ----
            GpError::InvalidSnapshot { reason } => write!(f, "Invalid model snapshot: {reason}"),
        }
    }
}

impl From<OptError> for GpError {
    fn from(err: OptError) -> Self {
        GpError::Optimization(err)
    }
}
