//! loglik_optimizer — argmin-powered maximizer for GP marginal likelihoods.
//!
//! Purpose
//! -------
//! Provide the optimization layer used by surrogate calibration. Likelihoods
//! implement [`LogLikelihood`]; callers run [`maximize`] for a single L-BFGS
//! start or [`maximize_with_restarts`] for the multi-start procedure used to
//! calibrate kernel hyperparameters.
//!
//! Key behaviors
//! -------------
//! - [`adapter::ArgMinAdapter`] turns `ℓ(θ)` into the argmin cost
//!   `c(θ) = -ℓ(θ)` and falls back to [`finite_diff`] when no analytic
//!   gradient is available.
//! - [`builders`] construct L-BFGS with a Hager–Zhang or More–Thuente line
//!   search; [`run::run_lbfgs`] executes it and normalizes the result into an
//!   [`OptimOutcome`].
//! - [`restarts`] repeats the run from caller-supplied starting points and
//!   keeps the best, honouring a per-start wall-clock cap.
//!
//! Invariants & assumptions
//! ------------------------
//! - Parameters live in an unconstrained space ([`Theta`]); the GP layer owns
//!   the mapping to positive length scales, variances and bounded nuggets.
//! - Likelihood failures are `OptError` values, never panics.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests on toy likelihoods; the GP
//!   calibration tests exercise the full path on real covariance models.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod restarts;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::restarts::{maximize_with_restarts, RestartOptions, RestartOutcome};
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, FnEvalMap, Grad, Theta, DEFAULT_LBFGS_MEM};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::restarts::{maximize_with_restarts, RestartOptions};
    pub use super::traits::{LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
