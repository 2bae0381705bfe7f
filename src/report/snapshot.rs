//! report::snapshot — persist a fitted bank and rebuild it for prediction.
//!
//! Purpose
//! -------
//! Write every model of a [`SurrogateBank`] as explicit training data plus
//! named hyperparameters (`SimGpModel.json`), and rebuild an equivalent bank
//! from that file without recalibrating.
//!
//! Key behaviors
//! -------------
//! - Single-fidelity models store `(x, y, kernel, noise)`; co-kriging models
//!   store both datasets, [`CoKrigingParams`] and the adaptive fidelity.
//!   Targets are stored in model space so the refit is exact.
//! - The fidelity case is stored as its label plus the fixed companion set
//!   in output units.
//! - [`load_snapshot`] refactorizes every model; predictions of the loaded
//!   bank match the bank that was saved.
//!
//! Invariants & assumptions
//! ------------------------
//! - `models.len() == y_names.len()` and every model has `x_names.len()`
//!   input columns; a file violating either is rejected.
use crate::gp::{
    bank::{FidelityCase, ModelSettings, SurrogateBank, SurrogateModel},
    hyper::NuggetPolicy,
    kernel::{KernelParams, KernelType},
    multi_fidelity::{CoKrigingParams, Fidelity, MultiFidelityGp},
    regression::GpRegression,
    transform::OutputTransform,
};
use crate::report::errors::{ReportError, ReportResult};
use crate::samples::SampleSet;
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::info;

pub const SNAPSHOT_FILE: &str = "SimGpModel.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSamples {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoredModel {
    Single {
        x: Array2<f64>,
        y: Array1<f64>,
        kernel: KernelParams,
        /// Standardized-scale noise variance.
        noise: f64,
    },
    CoKriging {
        x_low: Array2<f64>,
        y_low: Array1<f64>,
        x_high: Array2<f64>,
        y_high: Array1<f64>,
        params: CoKrigingParams,
        adaptive: Fidelity,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub x_names: Vec<String>,
    pub y_names: Vec<String>,
    pub case: String,
    pub kernel: KernelType,
    pub linear: bool,
    pub transform: OutputTransform,
    pub nuggets: Vec<NuggetPolicy>,
    pub ranges: Array1<f64>,
    pub companion: Option<StoredSamples>,
    pub models: Vec<StoredModel>,
}

impl ModelSnapshot {
    /// Capture a fitted bank.
    ///
    /// Errors
    /// ------
    /// - `Snapshot` when the bank holds no models or the names disagree with
    ///   its dimensions.
    pub fn capture(
        bank: &SurrogateBank, x_names: &[String], y_names: &[String],
    ) -> ReportResult<Self> {
        if !bank.is_fitted() {
            return Err(ReportError::Snapshot { reason: "the model bank is not fitted".into() });
        }
        if bank.y_dim() != y_names.len() || bank.ranges().len() != x_names.len() {
            return Err(ReportError::Snapshot {
                reason: format!(
                    "names ({} inputs, {} outputs) disagree with the bank ({} inputs, {} outputs)",
                    x_names.len(),
                    y_names.len(),
                    bank.ranges().len(),
                    bank.y_dim()
                ),
            });
        }
        let companion = match bank.case() {
            FidelityCase::SingleFidelity => None,
            FidelityCase::DataModel { high: set }
            | FidelityCase::ModelData { low: set }
            | FidelityCase::ModelModel { low: set }
            | FidelityCase::DataData { low: set } => {
                Some(StoredSamples { x: set.x().clone(), y: set.y().clone() })
            }
        };
        let models = bank
            .models()
            .iter()
            .map(|model| match model {
                SurrogateModel::Single(m) => StoredModel::Single {
                    x: m.x().clone(),
                    y: m.y().clone(),
                    kernel: m.kernel().clone(),
                    noise: m.noise(),
                },
                SurrogateModel::CoKriging(m) => StoredModel::CoKriging {
                    x_low: m.x_low().clone(),
                    y_low: m.y_low().clone(),
                    x_high: m.x_high().clone(),
                    y_high: m.y_high().clone(),
                    params: m.params().clone(),
                    adaptive: m.adaptive(),
                },
            })
            .collect();
        let settings = bank.settings();
        Ok(Self {
            x_names: x_names.to_vec(),
            y_names: y_names.to_vec(),
            case: bank.case().label().to_string(),
            kernel: settings.kernel,
            linear: settings.linear,
            transform: settings.transform,
            nuggets: settings.nuggets.clone(),
            ranges: bank.ranges().clone(),
            companion,
            models,
        })
    }

    /// Rebuild the bank; hyperparameters are used as stored.
    pub fn into_bank(self) -> ReportResult<SurrogateBank> {
        if self.models.len() != self.y_names.len() {
            return Err(ReportError::Snapshot {
                reason: format!("{} models for {} outputs", self.models.len(), self.y_names.len()),
            });
        }
        let x_dim = self.x_names.len();
        let case = self.fidelity_case()?;
        let mut models = Vec::with_capacity(self.models.len());
        for stored in self.models {
            let model = match stored {
                StoredModel::Single { x, y, kernel, noise } => {
                    check_columns(x.view(), x_dim)?;
                    SurrogateModel::Single(GpRegression::fit(x, y, kernel, noise)?)
                }
                StoredModel::CoKriging { x_low, y_low, x_high, y_high, params, adaptive } => {
                    check_columns(x_low.view(), x_dim)?;
                    check_columns(x_high.view(), x_dim)?;
                    SurrogateModel::CoKriging(MultiFidelityGp::fit(
                        x_low, y_low, x_high, y_high, params, adaptive,
                    )?)
                }
            };
            models.push(model);
        }
        let settings = ModelSettings {
            kernel: self.kernel,
            linear: self.linear,
            nuggets: self.nuggets,
            transform: self.transform,
            ..ModelSettings::default()
        };
        Ok(SurrogateBank::from_models(case, settings, self.ranges, models))
    }

    fn fidelity_case(&self) -> ReportResult<FidelityCase> {
        let companion = || -> ReportResult<SampleSet> {
            let stored = self.companion.as_ref().ok_or_else(|| ReportError::Snapshot {
                reason: format!("case {} needs a companion sample set", self.case),
            })?;
            Ok(SampleSet::new(stored.x.clone(), stored.y.clone())?)
        };
        match self.case.as_str() {
            "single-fidelity" => Ok(FidelityCase::SingleFidelity),
            "data-model" => Ok(FidelityCase::DataModel { high: companion()? }),
            "model-data" => Ok(FidelityCase::ModelData { low: companion()? }),
            "model-model" => Ok(FidelityCase::ModelModel { low: companion()? }),
            "data-data" => Ok(FidelityCase::DataData { low: companion()? }),
            other => {
                Err(ReportError::Snapshot { reason: format!("unknown fidelity case {other}") })
            }
        }
    }
}

fn check_columns(x: ArrayView2<f64>, x_dim: usize) -> ReportResult<()> {
    if x.ncols() == x_dim {
        Ok(())
    } else {
        Err(ReportError::Snapshot {
            reason: format!("stored inputs have {} columns, expected {x_dim}", x.ncols()),
        })
    }
}

/// A bank rebuilt from disk together with its variable names.
#[derive(Debug, Clone)]
pub struct LoadedSurrogate {
    pub x_names: Vec<String>,
    pub y_names: Vec<String>,
    pub bank: SurrogateBank,
}

impl LoadedSurrogate {
    /// Predictive mean and variance in output units.
    pub fn predict(&self, xq: ArrayView2<f64>) -> ReportResult<(Array2<f64>, Array2<f64>)> {
        Ok(self.bank.predict(xq)?)
    }
}

pub fn save_snapshot(path: &Path, snapshot: &ModelSnapshot) -> ReportResult<()> {
    let text = serde_json::to_string_pretty(snapshot)
        .map_err(|e| ReportError::Serialize { what: "model snapshot", reason: e.to_string() })?;
    fs::write(path, text).map_err(|e| ReportError::io(path, &e))?;
    info!(path = %path.display(), models = snapshot.models.len(), "model snapshot written");
    Ok(())
}

/// Read a snapshot written by [`save_snapshot`] and rebuild its bank.
///
/// Errors
/// ------
/// - `Io` when the file cannot be read.
/// - `Serialize` when it is not a snapshot.
/// - `Snapshot`/`Model` when the stored models are inconsistent.
pub fn load_snapshot(path: &Path) -> ReportResult<LoadedSurrogate> {
    let text = fs::read_to_string(path).map_err(|e| ReportError::io(path, &e))?;
    let snapshot: ModelSnapshot = serde_json::from_str(&text)
        .map_err(|e| ReportError::Serialize { what: "model snapshot", reason: e.to_string() })?;
    let x_names = snapshot.x_names.clone();
    let y_names = snapshot.y_names.clone();
    let bank = snapshot.into_bank()?;
    Ok(LoadedSurrogate { x_names, y_names, bank })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Save/load of a single-fidelity and a co-kriging bank with matching
    //   predictions.
    // - Rejection of inconsistent snapshots.
    // -------------------------------------------------------------------------

    fn single_bank() -> SurrogateBank {
        let x = Array2::from_shape_fn((7, 1), |(i, _)| i as f64 / 6.0);
        let y = Array2::from_shape_fn((7, 2), |(i, j)| {
            let v = i as f64 / 6.0;
            if j == 0 {
                v * v + 1.0
            } else {
                (2.0 * v).cos() + 2.0
            }
        });
        let samples = SampleSet::new(x, y).expect("samples");
        let settings = ModelSettings { transform: OutputTransform::Log, ..ModelSettings::default() };
        let mut bank = SurrogateBank::new(FidelityCase::SingleFidelity, settings, array![1.0]);
        bank.fit(&samples).expect("fit");
        bank
    }

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    // Purpose
    // -------
    // A saved single-fidelity bank reloads with identical predictions.
    //
    // Given
    // -----
    // - A two-QoI log-transformed bank on seven 1-D samples.
    //
    // Expect
    // ------
    // - Names survive; mean and variance agree at three query points.
    fn single_fidelity_snapshot_round_trips() {
        // Arrange
        let bank = single_bank();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(SNAPSHOT_FILE);
        let snapshot = ModelSnapshot::capture(&bank, &names("x", 1), &names("y", 2)).expect("capture");

        // Act
        save_snapshot(&path, &snapshot).expect("save");
        let loaded = load_snapshot(&path).expect("load");

        // Assert
        assert_eq!(loaded.y_names, names("y", 2));
        let xq = array![[0.05], [0.5], [0.93]];
        let (m0, v0) = bank.predict(xq.view()).expect("predict");
        let (m1, v1) = loaded.predict(xq.view()).expect("predict loaded");
        for (a, b) in m0.iter().zip(m1.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-9);
        }
        for (a, b) in v0.iter().zip(v1.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-7, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // A co-kriging bank keeps its case and companion set through a reload.
    //
    // Given
    // -----
    // - A model-data bank with five LF rows and four HF rows.
    //
    // Expect
    // ------
    // - Case label `model-data`, a co-kriging model, matching means.
    fn co_kriging_snapshot_keeps_case() {
        // Arrange
        let xl = Array2::from_shape_fn((5, 1), |(i, _)| i as f64 / 4.0);
        let yl = xl.mapv(|v| 0.5 * v + 0.1);
        let xh = array![[0.1], [0.4], [0.6], [0.9]];
        let yh = xh.mapv(|v| v + 0.2);
        let case = FidelityCase::ModelData { low: SampleSet::new(xl, yl).expect("low") };
        let mut bank = SurrogateBank::new(case, ModelSettings::default(), array![1.0]);
        bank.fit(&SampleSet::new(xh, yh).expect("high")).expect("fit");
        let snapshot = ModelSnapshot::capture(&bank, &names("x", 1), &names("y", 1)).expect("capture");

        // Act
        let text = serde_json::to_string(&snapshot).expect("encode");
        let decoded: ModelSnapshot = serde_json::from_str(&text).expect("decode");
        let rebuilt = decoded.into_bank().expect("rebuild");

        // Assert
        assert_eq!(rebuilt.case().label(), "model-data");
        assert!(matches!(rebuilt.models()[0], SurrogateModel::CoKriging(_)));
        let xq = array![[0.25], [0.75]];
        let (m0, _) = bank.predict(xq.view()).expect("predict");
        let (m1, _) = rebuilt.predict(xq.view()).expect("predict rebuilt");
        for (a, b) in m0.iter().zip(m1.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-9);
        }
    }

    #[test]
    // Purpose
    // -------
    // Inconsistent snapshots are rejected.
    //
    // Given
    // -----
    // - A snapshot with one model removed; one with an unknown case label.
    //
    // Expect
    // ------
    // - `Snapshot` errors for both.
    fn inconsistent_snapshot_is_rejected() {
        let bank = single_bank();
        let snapshot = ModelSnapshot::capture(&bank, &names("x", 1), &names("y", 2)).expect("capture");

        let mut short = snapshot.clone();
        short.models.pop();
        assert!(matches!(short.into_bank(), Err(ReportError::Snapshot { .. })));

        let mut unknown = snapshot;
        unknown.case = "model-model-model".into();
        assert!(matches!(unknown.into_bank(), Err(ReportError::Snapshot { .. })));
    }
}
