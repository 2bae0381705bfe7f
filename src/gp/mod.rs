//! gp — Gaussian-process surrogates and the model bank.
//!
//! - [`kernel`]: ARD stationary kernels with an optional linear term.
//! - [`hyper`]: nugget policies and the optimizer θ-layout.
//! - [`linalg`]: jittered Cholesky factorization.
//! - [`regression`]: single-fidelity GP regression.
//! - [`multi_fidelity`]: AR(1) co-kriging.
//! - [`transform`]: the optional log transform of targets.
//! - [`calibration`]: multi-start maximum-likelihood calibration.
//! - [`bank`]: one surrogate per QoI, fidelity dispatch and LOO CV.
//! - [`errors`]: [`GpError`].

pub mod bank;
pub mod calibration;
pub mod errors;
pub mod hyper;
pub mod kernel;
pub mod linalg;
pub mod multi_fidelity;
pub mod regression;
pub mod transform;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::bank::{CrossValidation, FidelityCase, ModelSettings, SurrogateBank, SurrogateModel};
pub use self::calibration::{CalibrationReport, CalibrationSettings, DEFAULT_RESTARTS};
pub use self::errors::{GpError, GpResult};
pub use self::hyper::{NuggetPolicy, DEFAULT_NOISE};
pub use self::kernel::{KernelParams, KernelType};
pub use self::multi_fidelity::{CoKrigingParams, Fidelity, MultiFidelityGp};
pub use self::regression::{GpRegression, Normalizer, Prediction};
pub use self::transform::OutputTransform;

pub mod prelude {
    pub use super::bank::{FidelityCase, ModelSettings, SurrogateBank, SurrogateModel};
    pub use super::errors::{GpError, GpResult};
    pub use super::hyper::NuggetPolicy;
    pub use super::kernel::{KernelParams, KernelType};
    pub use super::transform::OutputTransform;
}
