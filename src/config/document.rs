//! config::document — the serde view of the JSON input document.
//!
//! Field names mirror the document keys; every key that a method does not
//! need is optional here and checked in [`super::options`].
use crate::config::errors::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDocument {
    #[serde(rename = "randomVariables", default)]
    pub random_variables: Vec<RandomVariableDoc>,
    #[serde(rename = "EDP", default)]
    pub edp: Vec<QoiDoc>,
    #[serde(rename = "UQ_Method")]
    pub uq_method: UqMethodDoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomVariableDoc {
    pub name: String,
    #[serde(default)]
    pub distribution: Option<String>,
    #[serde(rename = "lowerbound", default)]
    pub lower: Option<f64>,
    #[serde(rename = "upperbound", default)]
    pub upper: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QoiDoc {
    pub name: String,
    #[serde(default = "one")]
    pub length: usize,
}

fn one() -> usize {
    1
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UqMethodDoc {
    #[serde(rename = "surrogateMethodInfo")]
    pub surrogate: SurrogateMethodDoc,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SurrogateMethodDoc {
    pub method: String,
    #[serde(default)]
    pub samples: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(rename = "accuracyLimit", default)]
    pub accuracy_limit: Option<f64>,
    /// Minutes.
    #[serde(rename = "timeLimit", default)]
    pub time_limit: Option<f64>,
    #[serde(rename = "parallelExecution", default)]
    pub parallel_execution: bool,
    #[serde(rename = "existingDoE", default)]
    pub existing_doe: bool,
    #[serde(rename = "inpFile", default)]
    pub inp_file: Option<String>,
    #[serde(rename = "outFile", default)]
    pub out_file: Option<String>,
    /// Import mode: outputs are provided (otherwise the inputs are simulated).
    #[serde(rename = "outputData", default = "yes")]
    pub output_data: bool,
    #[serde(rename = "advancedOpt", default)]
    pub advanced_opt: bool,
    #[serde(rename = "DoEmethod", default)]
    pub doe_method: Option<String>,
    #[serde(rename = "initialDoE", default)]
    pub initial_doe: Option<i64>,
    #[serde(rename = "logTransform", default)]
    pub log_transform: bool,
    #[serde(default)]
    pub kernel: Option<String>,
    #[serde(default)]
    pub linear: bool,
    #[serde(rename = "nuggetOpt", default)]
    pub nugget_opt: Option<String>,
    #[serde(rename = "nuggetString", default)]
    pub nugget_string: Option<String>,
    #[serde(rename = "doDoE", default = "yes")]
    pub do_doe: bool,
    /// Switch to random sampling when one DoE round costs more than a
    /// simulation.
    #[serde(rename = "breakDoE", default)]
    pub break_doe: bool,

    // ---- Multi-fidelity ----
    #[serde(rename = "HFfromModel", default)]
    pub hf_from_model: bool,
    #[serde(rename = "LFfromModel", default)]
    pub lf_from_model: bool,
    #[serde(rename = "samples_HF", default)]
    pub samples_hf: Option<usize>,
    #[serde(rename = "samples_LF", default)]
    pub samples_lf: Option<usize>,
    #[serde(rename = "existingDoE_HF", default)]
    pub existing_doe_hf: bool,
    #[serde(rename = "existingDoE_LF", default)]
    pub existing_doe_lf: bool,
    #[serde(rename = "inpFile_HF", default)]
    pub inp_file_hf: Option<String>,
    #[serde(rename = "outFile_HF", default)]
    pub out_file_hf: Option<String>,
    #[serde(rename = "inpFile_LF", default)]
    pub inp_file_lf: Option<String>,
    #[serde(rename = "outFile_LF", default)]
    pub out_file_lf: Option<String>,
}

impl InputDocument {
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse { reason: e.to_string() })
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&text)
    }
}
