//! Errors raised while persisting or reloading run results.
//!
//! Every variant is classified as an I/O failure by the crate-level
//! taxonomy.
use crate::gp::errors::GpError;
use crate::samples::errors::SampleError;

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ReportError {
    /// A file could not be written or read.
    Io { path: String, reason: String },

    /// A summary or snapshot could not be encoded or decoded.
    Serialize { what: &'static str, reason: String },

    /// A snapshot decoded but is internally inconsistent.
    Snapshot { reason: String },

    /// Rebuilding a model from a snapshot failed.
    Model(GpError),
}

impl ReportError {
    pub(crate) fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        ReportError::Io { path: path.display().to_string(), reason: err.to_string() }
    }
}

impl std::error::Error for ReportError {}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Io { path, reason } => write!(f, "Cannot access {path}: {reason}"),
            ReportError::Serialize { what, reason } => {
                write!(f, "Cannot serialize {what}: {reason}")
            }
            ReportError::Snapshot { reason } => write!(f, "Invalid model snapshot: {reason}"),
            ReportError::Model(e) => write!(f, "Cannot rebuild model from snapshot: {e}"),
        }
    }
}

impl From<GpError> for ReportError {
    fn from(err: GpError) -> Self {
        ReportError::Model(err)
    }
}

impl From<SampleError> for ReportError {
    fn from(err: SampleError) -> Self {
        match err {
            SampleError::Io { path, reason } => ReportError::Io { path, reason },
            other => ReportError::Snapshot { reason: other.to_string() },
        }
    }
}
