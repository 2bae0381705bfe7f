//! Errors for the sample store, table I/O and design generation.
//!
//! ## Conventions
//! - Row and column indices are 0-based; line numbers in parse errors are
//!   1-based as they appear in the file.
//! - I/O failures carry the path and the OS message as strings so the error
//!   stays `Clone + PartialEq`.

/// Result alias for sample-store operations.
pub type SampleResult<T> = Result<T, SampleError>;

#[derive(Debug, Clone, PartialEq)]
pub enum SampleError {
    // ---- Shape ----
    /// Row or column counts disagree.
    ShapeMismatch { what: &'static str, expected: usize, found: usize },

    /// Requested row does not exist.
    RowOutOfRange { row: usize, len: usize },

    // ---- Tables ----
    /// A table row has the wrong number of columns.
    ColumnCount { path: String, line: usize, expected: usize, found: usize },

    /// A table entry could not be parsed as a number.
    Parse { path: String, line: usize, token: String },

    /// Reading or writing a file failed.
    Io { path: String, reason: String },

    // ---- Designs ----
    /// Bounds must be finite with `lower < upper`.
    InvalidBounds { index: usize, lower: f64, upper: f64 },
}

impl std::error::Error for SampleError {}

impl std::fmt::Display for SampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleError::ShapeMismatch { what, expected, found } => {
                write!(f, "Shape mismatch in {what}: expected {expected}, found {found}")
            }
            SampleError::RowOutOfRange { row, len } => {
                write!(f, "Row {row} is out of range for {len} samples")
            }
            SampleError::ColumnCount { path, line, expected, found } => write!(
                f,
                "{path}, line {line}: expected {expected} columns, found {found}"
            ),
            SampleError::Parse { path, line, token } => {
                write!(f, "{path}, line {line}: cannot parse '{token}' as a number")
            }
            SampleError::Io { path, reason } => write!(f, "I/O error on {path}: {reason}"),
            SampleError::InvalidBounds { index, lower, upper } => write!(
                f,
                "Invalid bounds for variable {index}: lower {lower} must be below upper {upper}"
            ),
        }
    }
}

impl SampleError {
    pub(crate) fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        SampleError::Io { path: path.display().to_string(), reason: err.to_string() }
    }
}
