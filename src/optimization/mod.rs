//! optimization — hyperparameter optimization for surrogate calibration.
//!
//! - [`loglik_optimizer`]: L-BFGS maximization of log-likelihoods, with
//!   finite-difference fallbacks and multi-start restarts.
//! - [`numerical_stability`]: smooth maps from unconstrained reals onto
//!   positive and bounded hyperparameters.
//! - [`errors`]: the shared [`errors::OptError`] type.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
