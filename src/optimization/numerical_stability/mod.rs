//! numerical_stability — guarded transforms for constrained hyperparameters.
//!
//! Purpose
//! -------
//! Map unconstrained optimizer coordinates onto strictly positive or bounded
//! hyperparameters (length scales, signal variances, nuggets) without
//! overflow, and provide the matching derivatives for chain-rule gradients.
//!
//! Conventions
//! -----------
//! - `softplus` is used for positive quantities; `logistic` for quantities
//!   confined to an interval `[lo, hi]`.
//! - Every forward map has an inverse used to encode starting points.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    bounded_from_unit, bounded_to_unit, safe_logistic, safe_logit, safe_softplus,
    safe_softplus_inv, LOGIT_EPS, POSITIVE_FLOOR,
};

pub mod prelude {
    pub use super::transformations::{
        safe_logistic, safe_logit, safe_softplus, safe_softplus_inv, POSITIVE_FLOOR,
    };
}
