//! config::options — validated, immutable run options.
//!
//! Purpose
//! -------
//! Turn an [`InputDocument`] into [`SurrogateOptions`]: where the data comes
//! from, the stop thresholds, the DoE strategy and the model settings. Paths
//! that only exist at run time live in [`RunSettings`].
//!
//! Key behaviors
//! -------------
//! - `Sampling and Simulation` grows one simulator-backed set, optionally
//!   seeded with existing data.
//! - `Import Data File` fits on given inputs; outputs are read from file or,
//!   when `outputData` is false, simulated once.
//! - `Import Multi-fidelity Data File` pairs an LF and an HF source, each a
//!   simulator or a data file, giving the four fidelity cases.
//! - Without `advancedOpt`, the defaults are pareto DoE, Matérn 5/2, no
//!   linear term, no log transform and an optimized nugget.
//!
//! Invariants & assumptions
//! ------------------------
//! - Nugget lists are empty-or-`y_dim` long; a single `Optimize`/`Zero`
//!   policy applies to every QoI.
//! - Data-file paths are resolved against the template directory.
use crate::config::{
    document::{InputDocument, SurrogateMethodDoc},
    errors::{ConfigError, ConfigResult},
    variables::{qoi_names, random_variables, sampling_bounds, RandomVariable},
};
use crate::doe::strategy::DoeStrategy;
use crate::gp::{
    bank::ModelSettings, calibration::CalibrationSettings, hyper::NuggetPolicy,
    kernel::KernelType, transform::OutputTransform,
};
use ndarray::Array1;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Accuracy threshold used when the document gives none.
pub const DEFAULT_NRMSE: f64 = 0.02;

#[derive(Debug, Clone, PartialEq)]
pub struct DataFiles {
    pub inputs: PathBuf,
    pub outputs: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FidelitySource {
    Model { samples: usize, existing: Option<DataFiles> },
    Data(DataFiles),
}

impl FidelitySource {
    pub fn is_model(&self) -> bool {
        matches!(self, FidelitySource::Model { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Sampling { existing: Option<DataFiles> },
    /// `outputs == None` means the inputs are simulated.
    Import { inputs: PathBuf, outputs: Option<PathBuf> },
    MultiFidelity { high: FidelitySource, low: FidelitySource },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurrogateOptions {
    pub variables: Vec<RandomVariable>,
    pub qoi_names: Vec<String>,
    pub source: DataSource,
    /// Sampling box, present whenever a simulator generates samples.
    pub bounds: Option<(Array1<f64>, Array1<f64>)>,
    /// Simulation budget; zero when the budget is set by imported data.
    pub thr_count: usize,
    pub thr_nrmse: f64,
    /// Seconds; infinite when unlimited.
    pub thr_time: f64,
    pub seed: u64,
    pub parallel: bool,
    /// `None` disables adaptive DoE.
    pub doe: Option<DoeStrategy>,
    /// `None` sizes the initial design automatically.
    pub initial_doe: Option<usize>,
    pub kernel: KernelType,
    pub linear: bool,
    pub transform: OutputTransform,
    pub nuggets: Vec<NuggetPolicy>,
    pub break_doe: bool,
}

/// Paths and resources supplied by the caller rather than the document.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub work_dir: PathBuf,
    pub template_dir: PathBuf,
    pub driver: Option<PathBuf>,
    /// Low-fidelity driver; falls back to `driver` when absent.
    pub lf_driver: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub n_workers: usize,
}

impl RunSettings {
    pub fn new(work_dir: PathBuf) -> Self {
        Self {
            template_dir: work_dir.join("templatedir"),
            output_dir: work_dir.clone(),
            work_dir,
            driver: None,
            lf_driver: None,
            n_workers: 1,
        }
    }
}

impl SurrogateOptions {
    pub fn from_document(doc: &InputDocument, template_dir: &Path) -> ConfigResult<Self> {
        let s = &doc.uq_method.surrogate;
        let variables = random_variables(&doc.random_variables)?;
        let qoi_names = qoi_names(&doc.edp)?;
        let y_dim = qoi_names.len();
        let resolve = |name: &Option<String>, default: &str| -> PathBuf {
            template_dir.join(name.as_deref().unwrap_or(default))
        };

        let thr_nrmse = s.accuracy_limit.unwrap_or(DEFAULT_NRMSE);
        if !(thr_nrmse.is_finite() && thr_nrmse > 0.0) {
            return Err(ConfigError::InvalidThreshold { name: "accuracyLimit", value: thr_nrmse });
        }
        let thr_time = match s.time_limit {
            Some(minutes) if minutes.is_finite() && minutes > 0.0 => minutes * 60.0,
            Some(minutes) => {
                return Err(ConfigError::InvalidThreshold { name: "timeLimit", value: minutes })
            }
            None => f64::INFINITY,
        };

        let (source, thr_count, doe, initial_doe) = match s.method.trim() {
            "Sampling and Simulation" => {
                let thr_count = s.samples.ok_or(ConfigError::MissingKey { key: "samples" })?;
                let existing = s.existing_doe.then(|| DataFiles {
                    inputs: resolve(&s.inp_file, "inpFile.in"),
                    outputs: resolve(&s.out_file, "outFile.in"),
                });
                let (doe, initial) = doe_settings(s, thr_count)?;
                (DataSource::Sampling { existing }, thr_count, doe, initial)
            }
            "Import Data File" => {
                let outputs = s.output_data.then(|| resolve(&s.out_file, "outFile.in"));
                let source =
                    DataSource::Import { inputs: resolve(&s.inp_file, "inpFile.in"), outputs };
                (source, 0, None, None)
            }
            "Import Multi-fidelity Data File" => {
                let high = fidelity_source(
                    s.hf_from_model,
                    s.samples_hf,
                    "samples_HF",
                    s.existing_doe_hf,
                    DataFiles {
                        inputs: resolve(&s.inp_file_hf, "inpFile_HF.in"),
                        outputs: resolve(&s.out_file_hf, "outFile_HF.in"),
                    },
                )?;
                let low = fidelity_source(
                    s.lf_from_model,
                    s.samples_lf,
                    "samples_LF",
                    s.existing_doe_lf,
                    DataFiles {
                        inputs: resolve(&s.inp_file_lf, "inpFile_LF.in"),
                        outputs: resolve(&s.out_file_lf, "outFile_LF.in"),
                    },
                )?;
                let thr_count = match (&high, &low) {
                    (FidelitySource::Model { samples, .. }, _) => *samples,
                    (FidelitySource::Data(_), FidelitySource::Model { samples, .. }) => *samples,
                    _ => 0,
                };
                let simulated = high.is_model() || low.is_model();
                let (doe, initial) = if simulated && s.do_doe {
                    let strategy = match &s.doe_method {
                        Some(name) if s.advanced_opt => parse_strategy(name)?,
                        _ => Some(DoeStrategy::default()),
                    };
                    (strategy, None)
                } else {
                    (None, Some(thr_count))
                };
                (DataSource::MultiFidelity { high, low }, thr_count, doe, initial)
            }
            other => return Err(ConfigError::UnknownMethod { name: other.to_string() }),
        };

        let needs_bounds = match &source {
            DataSource::Sampling { .. } => true,
            DataSource::Import { .. } => false,
            DataSource::MultiFidelity { high, low } => high.is_model() || low.is_model(),
        };
        let bounds = if needs_bounds { Some(sampling_bounds(&variables)?) } else { None };
        if needs_bounds && thr_count <= 2 {
            return Err(ConfigError::TooFewSamples { count: thr_count });
        }

        let (kernel, linear, transform, nuggets) = if s.advanced_opt {
            let kernel = match &s.kernel {
                Some(name) => name
                    .parse::<KernelType>()
                    .map_err(|_| ConfigError::UnknownKernel { name: name.clone() })?,
                None => KernelType::default(),
            };
            let transform =
                if s.log_transform { OutputTransform::Log } else { OutputTransform::Identity };
            let nuggets = parse_nuggets(s.nugget_opt.as_deref(), s.nugget_string.as_deref(), y_dim)?;
            (kernel, s.linear, transform, nuggets)
        } else {
            (KernelType::default(), false, OutputTransform::Identity, vec![NuggetPolicy::Optimize])
        };

        Ok(Self {
            variables,
            qoi_names,
            source,
            bounds,
            thr_count,
            thr_nrmse,
            thr_time,
            seed: s.seed.unwrap_or(0),
            parallel: s.parallel_execution,
            doe,
            initial_doe,
            kernel,
            linear,
            transform,
            nuggets,
            break_doe: s.break_doe,
        })
    }

    pub fn x_dim(&self) -> usize {
        self.variables.len()
    }

    pub fn y_dim(&self) -> usize {
        self.qoi_names.len()
    }

    pub fn x_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }

    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            kernel: self.kernel,
            linear: self.linear,
            nuggets: self.nuggets.clone(),
            transform: self.transform,
            calibration: CalibrationSettings::default(),
        }
    }
}

fn parse_strategy(name: &str) -> ConfigResult<Option<DoeStrategy>> {
    if name.trim().eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    name.parse::<DoeStrategy>()
        .map(Some)
        .map_err(|_| ConfigError::UnknownDoeMethod { name: name.to_string() })
}

fn doe_settings(
    s: &SurrogateMethodDoc, thr_count: usize,
) -> ConfigResult<(Option<DoeStrategy>, Option<usize>)> {
    if !s.advanced_opt {
        return Ok((Some(DoeStrategy::default()), None));
    }
    let strategy = match &s.doe_method {
        Some(name) => parse_strategy(name)?,
        None => Some(DoeStrategy::default()),
    };
    if strategy.is_none() {
        return Ok((None, Some(thr_count)));
    }
    let initial = match s.initial_doe {
        Some(n) if n >= 0 => Some(n as usize),
        _ => None,
    };
    if let Some(n) = initial {
        if n > thr_count {
            return Err(ConfigError::InitialExceedsTotal { initial: n, total: thr_count });
        }
    }
    Ok((strategy, initial))
}

fn fidelity_source(
    from_model: bool, samples: Option<usize>, key: &'static str, existing: bool, files: DataFiles,
) -> ConfigResult<FidelitySource> {
    if from_model {
        let samples = samples.ok_or(ConfigError::MissingKey { key })?;
        Ok(FidelitySource::Model { samples, existing: existing.then_some(files) })
    } else {
        Ok(FidelitySource::Data(files))
    }
}

/// Parse `nuggetOpt` and the comma-delimited `nuggetString`.
///
/// - `Optimize` (default) and `Zero` apply to every QoI.
/// - `Fixed Values`: one number per QoI, e.g. `0.1,0.2`.
/// - `Fixed Bounds`: one `[lo, hi]` pair per QoI, e.g. `[0,1],[0,2]`.
pub fn parse_nuggets(
    option: Option<&str>, values: Option<&str>, y_dim: usize,
) -> ConfigResult<Vec<NuggetPolicy>> {
    let key = option.map(|o| o.trim().to_lowercase()).unwrap_or_else(|| "optimize".to_string());
    let entries = || -> ConfigResult<Vec<Value>> {
        let text = values.unwrap_or("").trim();
        let parsed: Vec<Value> = serde_json::from_str(&format!("[{text}]")).map_err(|_| {
            ConfigError::InvalidNugget {
                reason: "improper format of nugget values/bounds; provide one entry per QoI \
                         with comma delimiter"
                    .to_string(),
            }
        })?;
        if parsed.len() != y_dim {
            return Err(ConfigError::InvalidNugget {
                reason: format!(
                    "number of nugget quantities ({}) does not match # QoIs ({y_dim})",
                    parsed.len()
                ),
            });
        }
        Ok(parsed)
    };
    let policies = match key.as_str() {
        "optimize" => vec![NuggetPolicy::Optimize],
        "zero" => vec![NuggetPolicy::Zero],
        "fixed values" => entries()?
            .iter()
            .map(|v| {
                v.as_f64().map(NuggetPolicy::Fixed).ok_or_else(|| ConfigError::InvalidNugget {
                    reason: "provide nugget values of each QoI with comma delimiter".to_string(),
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?,
        "fixed bounds" => entries()?
            .iter()
            .map(|v| match v.as_array().map(|a| a.iter().map(Value::as_f64).collect::<Vec<_>>()) {
                Some(pair) if pair.len() == 2 => match (pair[0], pair[1]) {
                    (Some(lo), Some(hi)) => Ok(NuggetPolicy::Bounded { lo, hi }),
                    _ => Err(bounds_format_error()),
                },
                _ => Err(bounds_format_error()),
            })
            .collect::<ConfigResult<Vec<_>>>()?,
        _ => return Err(ConfigError::UnknownNuggetOption { name: option.unwrap_or("").to_string() }),
    };
    for (qoi, policy) in policies.iter().enumerate() {
        policy.validate(qoi).map_err(|e| ConfigError::InvalidNugget { reason: e.to_string() })?;
    }
    Ok(policies)
}

fn bounds_format_error() -> ConfigError {
    ConfigError::InvalidNugget {
        reason: "provide nugget bounds of each QoI in brackets with comma delimiter, \
                 e.g. [0.0,1.0],[0.0,2.0]"
            .to_string(),
    }
}
