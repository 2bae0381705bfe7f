//! controller — the convergence controller of an adaptive run.
//!
//! - [`adaptive`]: [`Controller`], the fit/check/sample loop.
//! - [`initial`]: initial-design sizing and the existing-data check.
//! - [`history`]: the per-iteration LOO error record.
//! - [`state`]: [`ControllerState`] and [`ExitCode`].

pub mod adaptive;
pub mod history;
pub mod initial;
pub mod state;

pub use self::adaptive::{Controller, ControllerSettings, InitialDesign, RunOutcome};
pub use self::history::{ErrorHistory, ErrorRecord};
pub use self::initial::{
    calibration_interval, consistency_check, initial_design_size, CONSISTENCY_TOLERANCE,
    MAX_AUTO_INITIAL, SEQUENTIAL_INTERVAL,
};
pub use self::state::{ControllerState, ExitCode};
