//! Errors for candidate selection.
use crate::gp::errors::GpError;
use crate::samples::errors::SampleError;

pub type DoeResult<T> = Result<T, DoeError>;

#[derive(Debug, Clone, PartialEq)]
pub enum DoeError {
    /// The strategy name is not one of pareto, imsew, mmsew, random.
    UnknownStrategy { name: String },

    /// The bank holds no fitted model.
    NoModels,

    /// A pool size or batch size of zero was requested.
    EmptyPool { what: &'static str },

    Model(GpError),

    Sampling(SampleError),
}

impl std::error::Error for DoeError {}

impl std::fmt::Display for DoeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DoeError::UnknownStrategy { name } => write!(
                f,
                "Unknown DoE method '{name}': valid options are pareto, imsew, mmsew and random"
            ),
            DoeError::NoModels => write!(f, "DoE requires fitted surrogate models"),
            DoeError::EmptyPool { what } => write!(f, "DoE {what} must be greater than zero"),
            DoeError::Model(e) => write!(f, "DoE model evaluation failed: {e}"),
            DoeError::Sampling(e) => write!(f, "DoE candidate generation failed: {e}"),
        }
    }
}

impl From<GpError> for DoeError {
    fn from(err: GpError) -> Self {
        DoeError::Model(err)
    }
}

impl From<SampleError> for DoeError {
    fn from(err: SampleError) -> Self {
        DoeError::Sampling(err)
    }
}
