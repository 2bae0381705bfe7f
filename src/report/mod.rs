//! report — diagnostics and everything a run leaves on disk.
//!
//! - [`diagnostics`]: NRMSE, R², correlation and predictive-error
//!   percentiles.
//! - [`export`]: [`Exporter`] for the summary, tables and text report.
//! - [`snapshot`]: `SimGpModel.json` and [`load_snapshot`].
//! - [`error_log`]: the `dakota.err` [`ErrorLog`].
//! - [`errors`]: [`ReportError`].

pub mod diagnostics;
pub mod error_log;
pub mod errors;
pub mod export;
pub mod snapshot;

pub use self::diagnostics::{
    correlation, nrmse, percentile_errors, r_squared, Diagnostics, PredictionErrorPercentiles,
};
pub use self::error_log::{ErrorLog, ERROR_FILE};
pub use self::errors::{ReportError, ReportResult};
pub use self::export::{prediction_bounds, ExportInput, Exporter, RunSummary};
pub use self::snapshot::{
    load_snapshot, save_snapshot, LoadedSurrogate, ModelSnapshot, SNAPSHOT_FILE,
};
