//! report::error_log — the `dakota.err` file of a run.
//!
//! [`ErrorLog::create`] truncates the file when a run starts, so an empty
//! `dakota.err` after the run means success. [`ErrorLog::record`] writes the
//! fatal error that ended the run. The log is an explicit value owned by the
//! caller; library code never writes it.
use crate::errors::UqError;
use crate::report::errors::{ReportError, ReportResult};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::error;

pub const ERROR_FILE: &str = "dakota.err";

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    /// Create (or truncate) `dir/dakota.err`.
    pub fn create(dir: &Path) -> ReportResult<Self> {
        fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, &e))?;
        let path = dir.join(ERROR_FILE);
        fs::write(&path, "").map_err(|e| ReportError::io(&path, &e))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `err` with its kind, replacing any previous content.
    pub fn record(&self, err: &UqError) -> ReportResult<()> {
        let kind = err.kind().label();
        error!(kind, error = %err, "run failed");
        fs::write(&self.path, format!("{kind}: {err}\n"))
            .map_err(|e| ReportError::io(&self.path, &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::errors::ConfigError;

    #[test]
    // Purpose
    // -------
    // The log starts empty and holds the recorded error with its kind.
    //
    // Given
    // -----
    // - A fresh log and a `MissingQoi` configuration error.
    //
    // Expect
    // ------
    // - Empty file after `create`; a line starting with
    //   `ConfigurationError:` after `record`.
    fn error_log_records_kind_and_message() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = ErrorLog::create(dir.path()).expect("create");
        assert_eq!(fs::read_to_string(log.path()).expect("read"), "");

        log.record(&UqError::from(ConfigError::MissingQoi)).expect("record");

        let text = fs::read_to_string(log.path()).expect("read");
        assert!(text.starts_with("ConfigurationError: "), "{text}");
    }
}
