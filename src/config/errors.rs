//! Errors raised while reading and validating the run configuration.
//!
//! Every variant is a configuration problem except [`ConfigError::ZeroRange`],
//! which the crate-level taxonomy classifies as an input-domain error.

/// Result alias for configuration parsing and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    // ---- Document ----
    /// The configuration file could not be read.
    Read { path: String, reason: String },

    /// The document is not valid JSON or does not match the schema.
    Parse { reason: String },

    /// No random variables were declared.
    MissingRandomVariables,

    /// No QoIs were declared, or a QoI has zero length.
    MissingQoi,

    /// A key required by the selected method is absent.
    MissingKey { key: &'static str },

    // ---- Names ----
    UnknownMethod { name: String },

    UnknownDoeMethod { name: String },

    UnknownKernel { name: String },

    UnknownNuggetOption { name: String },

    // ---- Values ----
    /// Nugget values or bounds are malformed or inconsistent with the QoIs.
    InvalidNugget { reason: String },

    /// A sampled variable has no lower/upper bound.
    MissingBounds { name: String },

    /// Bounds are non-finite or decreasing.
    InvalidBounds { name: String, lower: f64, upper: f64 },

    /// A sampled variable has a zero-width range.
    ZeroRange { name: String },

    /// The sample budget must exceed two.
    TooFewSamples { count: usize },

    /// The initial design is larger than the whole budget.
    InitialExceedsTotal { initial: usize, total: usize },

    /// Thresholds must be finite and positive.
    InvalidThreshold { name: &'static str, value: f64 },

    // ---- Data files ----
    /// A data file disagrees with the declared dimensions.
    DimensionMismatch { what: String, expected: usize, found: usize },

    /// Existing outputs disagree with a fresh simulation of the same input.
    InconsistentData { row: usize, qoi: usize, existing: f64, simulated: f64 },

    /// The selected method needs a simulator driver.
    MissingDriver,
}

impl std::error::Error for ConfigError {}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Document ----
            ConfigError::Read { path, reason } => {
                write!(f, "Error reading json: cannot read {path}: {reason}")
            }
            ConfigError::Parse { reason } => write!(f, "Error reading json: {reason}"),
            ConfigError::MissingRandomVariables => {
                write!(f, "Error reading json: at least one random variable is required")
            }
            ConfigError::MissingQoi => {
                write!(f, "Error reading json: at least one QoI (EDP) of positive length is required")
            }
            ConfigError::MissingKey { key } => write!(f, "Error reading json: missing key '{key}'"),

            // ---- Names ----
            ConfigError::UnknownMethod { name } => write!(
                f,
                "Error reading json: unknown method '{name}'; select 'Sampling and Simulation', \
                 'Import Data File' or 'Import Multi-fidelity Data File'"
            ),
            ConfigError::UnknownDoeMethod { name } => {
                write!(f, "Error reading json: unknown DoE method '{name}'")
            }
            ConfigError::UnknownKernel { name } => {
                write!(f, "Error reading json: unknown kernel '{name}'")
            }
            ConfigError::UnknownNuggetOption { name } => {
                write!(f, "Error reading json: unknown nugget option '{name}'")
            }

            // ---- Values ----
            ConfigError::InvalidNugget { reason } => write!(f, "Error reading json: {reason}"),
            ConfigError::MissingBounds { name } => write!(
                f,
                "Error in input RV: '{name}' has no bounds; all RVs should be uniform"
            ),
            ConfigError::InvalidBounds { name, lower, upper } => write!(
                f,
                "Error in input RV: '{name}' lower bound {lower} must be below upper bound {upper}"
            ),
            ConfigError::ZeroRange { name } => write!(
                f,
                "Error in input RV: training range of '{name}' should be greater than 0"
            ),
            ConfigError::TooFewSamples { count } => {
                write!(f, "Number of samples should be greater than 2 (got {count})")
            }
            ConfigError::InitialExceedsTotal { initial, total } => write!(
                f,
                "Number of initial DoE ({initial}) cannot exceed total number of simulations ({total})"
            ),
            ConfigError::InvalidThreshold { name, value } => {
                write!(f, "Error reading json: {name} must be finite and positive (got {value})")
            }

            // ---- Data files ----
            ConfigError::DimensionMismatch { what, expected, found } => write!(
                f,
                "Error importing input data: {what}: expected {expected} column(s) or row(s), found {found}"
            ),
            ConfigError::InconsistentData { row, qoi, existing, simulated } => write!(
                f,
                "Consistency check failed: row {row}, QoI {qoi} has {existing} in the data but the \
                 model returns {simulated}"
            ),
            ConfigError::MissingDriver => {
                write!(f, "A simulator driver is required for the selected method")
            }
        }
    }
}
