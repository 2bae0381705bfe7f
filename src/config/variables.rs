//! config::variables — random-variable and QoI descriptors.
//!
//! A vector QoI `name` of length `n > 1` expands into the scalar QoIs
//! `name_1 … name_n`; a scalar QoI keeps its name.
use crate::config::{
    document::{QoiDoc, RandomVariableDoc},
    errors::{ConfigError, ConfigResult},
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomVariable {
    pub name: String,
    pub distribution: String,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl From<&RandomVariableDoc> for RandomVariable {
    fn from(doc: &RandomVariableDoc) -> Self {
        Self {
            name: doc.name.clone(),
            distribution: doc.distribution.clone().unwrap_or_else(|| "Uniform".to_string()),
            lower: doc.lower,
            upper: doc.upper,
        }
    }
}

impl RandomVariable {
    /// Midpoint of the bounds, when both are known.
    pub fn midpoint(&self) -> Option<f64> {
        match (self.lower, self.upper) {
            (Some(lo), Some(hi)) => Some(0.5 * (lo + hi)),
            _ => None,
        }
    }
}

pub fn random_variables(docs: &[RandomVariableDoc]) -> ConfigResult<Vec<RandomVariable>> {
    if docs.is_empty() {
        return Err(ConfigError::MissingRandomVariables);
    }
    Ok(docs.iter().map(RandomVariable::from).collect())
}

pub fn qoi_names(docs: &[QoiDoc]) -> ConfigResult<Vec<String>> {
    if docs.is_empty() || docs.iter().any(|q| q.length == 0) {
        return Err(ConfigError::MissingQoi);
    }
    let mut names = Vec::new();
    for qoi in docs {
        if qoi.length == 1 {
            names.push(qoi.name.clone());
        } else {
            names.extend((1..=qoi.length).map(|k| format!("{}_{k}", qoi.name)));
        }
    }
    Ok(names)
}

/// Lower and upper bounds for sampling.
///
/// Errors
/// ------
/// - `MissingBounds` when a variable has no bounds.
/// - `InvalidBounds` for non-finite or decreasing bounds.
/// - `ZeroRange` when `lower == upper`.
pub fn sampling_bounds(vars: &[RandomVariable]) -> ConfigResult<(Array1<f64>, Array1<f64>)> {
    let mut lower = Array1::zeros(vars.len());
    let mut upper = Array1::zeros(vars.len());
    for (i, rv) in vars.iter().enumerate() {
        let (lo, hi) = match (rv.lower, rv.upper) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => return Err(ConfigError::MissingBounds { name: rv.name.clone() }),
        };
        if !(lo.is_finite() && hi.is_finite()) || lo > hi {
            return Err(ConfigError::InvalidBounds { name: rv.name.clone(), lower: lo, upper: hi });
        }
        if lo == hi {
            return Err(ConfigError::ZeroRange { name: rv.name.clone() });
        }
        lower[i] = lo;
        upper[i] = hi;
    }
    Ok((lower, upper))
}
