//! loglik_optimizer::types — shared numeric aliases and solver wiring.
//!
//! Purpose
//! -------
//! Centralize the numeric types and solver aliases used when maximizing GP
//! marginal log-likelihoods, so the calibration code never spells out
//! `ndarray` or argmin generics directly.
//!
//! Conventions
//! -----------
//! - `Theta` is the unconstrained hyperparameter vector; the GP layer maps it
//!   to length scales, variances and noise.
//! - `Cost` is a scalar in log-likelihood space; the adapter flips the sign.
//! - `DEFAULT_LBFGS_MEM` is the L-BFGS history size used when the caller
//!   does not override it.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    quasinewton::LBFGS,
};
use ndarray::Array1;
use std::collections::HashMap;

pub type Theta = Array1<f64>;

pub type Grad = Array1<f64>;

pub type Cost = f64;

pub type FnEvalMap = HashMap<String, u64>;

pub const DEFAULT_LBFGS_MEM: usize = 7;

pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;

pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
