//! errors — the crate-level error and its taxonomy.
//!
//! Purpose
//! -------
//! Every layer keeps its own error enum. [`UqError`] wraps them at the
//! workflow boundary and [`UqError::kind`] classifies the failure into the
//! five kinds a caller can act on.
//!
//! Conventions
//! -----------
//! - All kinds are fatal for the run; single-sample simulator failures never
//!   reach this type (the batch evaluator absorbs them).
//! - `From` conversions are spelled out per layer so `?` works in the
//!   workflow and the controller.
use crate::config::errors::ConfigError;
use crate::doe::errors::DoeError;
use crate::gp::errors::GpError;
use crate::optimization::errors::OptError;
use crate::report::errors::ReportError;
use crate::samples::errors::SampleError;
use crate::simulation::errors::SimulationError;

pub type UqResult<T> = Result<T, UqError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or inconsistent input.
    Configuration,
    /// A numeric precondition on the data is violated.
    InputDomain,
    /// The simulator failed structurally.
    Simulation,
    /// Likelihood calibration failed.
    Calibration,
    /// Reading or writing persisted files failed.
    Io,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::InputDomain => "InputDomainError",
            ErrorKind::Simulation => "SimulationError",
            ErrorKind::Calibration => "CalibrationError",
            ErrorKind::Io => "IoError",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UqError {
    Config(ConfigError),
    Model(GpError),
    Simulation(SimulationError),
    Samples(SampleError),
    Doe(DoeError),
    Optimization(OptError),
    Report(ReportError),
}

impl UqError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UqError::Config(e) => config_kind(e),
            UqError::Model(e) => model_kind(e),
            UqError::Simulation(_) => ErrorKind::Simulation,
            UqError::Samples(e) => sample_kind(e),
            UqError::Doe(e) => match e {
                DoeError::Model(inner) => model_kind(inner),
                DoeError::Sampling(inner) => sample_kind(inner),
                DoeError::UnknownStrategy { .. } | DoeError::NoModels | DoeError::EmptyPool { .. } => {
                    ErrorKind::Configuration
                }
            },
            UqError::Optimization(_) => ErrorKind::Calibration,
            UqError::Report(_) => ErrorKind::Io,
        }
    }
}

fn config_kind(e: &ConfigError) -> ErrorKind {
    match e {
        ConfigError::ZeroRange { .. } => ErrorKind::InputDomain,
        ConfigError::Read { .. } => ErrorKind::Io,
        _ => ErrorKind::Configuration,
    }
}

fn model_kind(e: &GpError) -> ErrorKind {
    match e {
        GpError::NonPositiveTarget { .. } | GpError::NonFiniteData { .. } => ErrorKind::InputDomain,
        GpError::CalibrationFailed { .. }
        | GpError::NotPositiveDefinite { .. }
        | GpError::Optimization(_) => ErrorKind::Calibration,
        GpError::InvalidSnapshot { .. } => ErrorKind::Io,
        GpError::EmptyTrainingSet
        | GpError::ShapeMismatch { .. }
        | GpError::UnknownKernel { .. }
        | GpError::InvalidNugget { .. }
        | GpError::RowOutOfRange { .. } => ErrorKind::Configuration,
    }
}

fn sample_kind(e: &SampleError) -> ErrorKind {
    match e {
        SampleError::Io { .. } => ErrorKind::Io,
        SampleError::InvalidBounds { .. } => ErrorKind::InputDomain,
        SampleError::ShapeMismatch { .. }
        | SampleError::RowOutOfRange { .. }
        | SampleError::ColumnCount { .. }
        | SampleError::Parse { .. } => ErrorKind::Configuration,
    }
}

impl std::error::Error for UqError {}

impl std::fmt::Display for UqError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UqError::Config(e) => write!(f, "{e}"),
            UqError::Model(e) => write!(f, "{e}"),
            UqError::Simulation(e) => write!(f, "{e}"),
            UqError::Samples(e) => write!(f, "{e}"),
            UqError::Doe(e) => write!(f, "{e}"),
            UqError::Optimization(e) => write!(f, "{e}"),
            UqError::Report(e) => write!(f, "{e}"),
        }
    }
}

impl From<ConfigError> for UqError {
    fn from(err: ConfigError) -> Self {
        UqError::Config(err)
    }
}

impl From<GpError> for UqError {
    fn from(err: GpError) -> Self {
        UqError::Model(err)
    }
}

impl From<SimulationError> for UqError {
    fn from(err: SimulationError) -> Self {
        UqError::Simulation(err)
    }
}

impl From<SampleError> for UqError {
    fn from(err: SampleError) -> Self {
        UqError::Samples(err)
    }
}

impl From<DoeError> for UqError {
    fn from(err: DoeError) -> Self {
        UqError::Doe(err)
    }
}

impl From<OptError> for UqError {
    fn from(err: OptError) -> Self {
        UqError::Optimization(err)
    }
}

impl From<ReportError> for UqError {
    fn from(err: ReportError) -> Self {
        UqError::Report(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Layer errors map onto the five kinds.
    //
    // Given
    // -----
    // - One representative error per kind, including the two input-domain
    //   cases that originate in configuration and the model layer.
    //
    // Expect
    // ------
    // - The matching `ErrorKind`.
    fn layer_errors_map_to_kinds() {
        let cases: Vec<(UqError, ErrorKind)> = vec![
            (ConfigError::MissingQoi.into(), ErrorKind::Configuration),
            (ConfigError::ZeroRange { name: "x".into() }.into(), ErrorKind::InputDomain),
            (
                GpError::NonPositiveTarget { qoi: 0, row: 1, value: -1.0 }.into(),
                ErrorKind::InputDomain,
            ),
            (
                GpError::CalibrationFailed { qoi: 0, attempts: 10, reason: "nan".into() }.into(),
                ErrorKind::Calibration,
            ),
            (SimulationError::EmptyResults { sample: 0 }.into(), ErrorKind::Simulation),
            (SampleError::Io { path: "a".into(), reason: "b".into() }.into(), ErrorKind::Io),
            (DoeError::UnknownStrategy { name: "x".into() }.into(), ErrorKind::Configuration),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{err}");
        }
    }
}
