//! doe::strategy — the named DoE strategies.
use crate::doe::errors::DoeError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DoeStrategy {
    /// Two-objective Pareto ranking of variance×VOI and weighted LOO error.
    #[default]
    Pareto,
    /// Error-weighted integrated mean-squared error.
    Imse,
    /// Error-weighted maximum mean-squared error.
    Mmse,
    Random,
}

impl DoeStrategy {
    pub fn label(self) -> &'static str {
        match self {
            DoeStrategy::Pareto => "pareto",
            DoeStrategy::Imse => "imsew",
            DoeStrategy::Mmse => "mmsew",
            DoeStrategy::Random => "random",
        }
    }

    /// Pareto and random designs recalibrate on every iteration.
    pub fn calibrates_every_iteration(self) -> bool {
        matches!(self, DoeStrategy::Pareto | DoeStrategy::Random)
    }
}

impl FromStr for DoeStrategy {
    type Err = DoeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pareto" => Ok(DoeStrategy::Pareto),
            "imse" | "imsew" => Ok(DoeStrategy::Imse),
            "mmse" | "mmsew" => Ok(DoeStrategy::Mmse),
            "random" => Ok(DoeStrategy::Random),
            _ => Err(DoeError::UnknownStrategy { name: s.to_string() }),
        }
    }
}
