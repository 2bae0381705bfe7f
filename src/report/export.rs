//! report::export — persist the final state of a run.
//!
//! Purpose
//! -------
//! Write every output file of a finished run into one directory:
//!
//! | file               | content                                            |
//! |--------------------|----------------------------------------------------|
//! | `dakota.out`       | JSON summary (flags, termination, diagnostics)     |
//! | `dakotaTab.out`    | id, inputs and outputs of the validation rows      |
//! | `inputTab.out`     | raw inputs of the adaptive set                     |
//! | `outputTab.out`    | raw outputs of the adaptive set                    |
//! | `surrogateTab.out` | validation rows plus LOO median, q5, q95, variance |
//! | `GPresults.out`    | human-readable report                              |
//! | `SimGpModel.json`  | model snapshot (see [`crate::report::snapshot`])   |
//!
//! The snapshot is skipped when the run stopped before any model was trained.
//!
//! Conventions
//! -----------
//! - "Validation rows" are the rows cross-validation ran on: the adaptive set
//!   for single-fidelity runs, the HF set for multi-fidelity runs.
//! - Percentile bounds come from the model-space LOO distribution: normal,
//!   or log-normal under the log transform.
use crate::config::options::{DataSource, FidelitySource, SurrogateOptions};
use crate::gp::{
    bank::{CrossValidation, SurrogateBank, SurrogateModel},
    transform::OutputTransform,
};
use crate::report::{
    diagnostics::{Diagnostics, PredictionErrorPercentiles},
    errors::{ReportError, ReportResult},
    snapshot::{save_snapshot, ModelSnapshot, SNAPSHOT_FILE},
};
use crate::samples::{table::write_table, SampleSet};
use ndarray::{concatenate, Array1, Array2, ArrayView2, Axis};
use serde_json::{json, Map, Value};
use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{info, warn};

pub const SUMMARY_FILE: &str = "dakota.out";
pub const REPORT_FILE: &str = "GPresults.out";

/// Termination metadata of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// `count`, `accuracy` or `time`.
    pub exit_code: &'static str,
    pub thr_nrmse: f64,
    pub thr_count: usize,
    /// Seconds.
    pub thr_time: f64,
    /// Rows the final model was trained on.
    pub n_samples: usize,
    /// Simulator evaluations spent, failures included.
    pub n_simulated: usize,
    pub elapsed: Duration,
    pub calibration_interval: usize,
    pub do_sampling: bool,
    pub do_simulation: bool,
    pub do_doe: bool,
    /// Adaptive DoE was switched off during the run.
    pub doe_shut_off: bool,
    pub driver: Option<String>,
}

/// Everything the exporter reads.
#[derive(Debug, Clone, Copy)]
pub struct ExportInput<'a> {
    pub options: &'a SurrogateOptions,
    pub bank: &'a SurrogateBank,
    pub samples: &'a SampleSet,
    pub cv: &'a CrossValidation,
    pub diagnostics: &'a Diagnostics,
    pub percentiles: Option<&'a PredictionErrorPercentiles>,
    pub summary: &'a RunSummary,
}

/// Lower and upper `p`-bounds of the LOO predictions, output units.
pub fn prediction_bounds(
    cv: &CrossValidation, transform: OutputTransform, p_lo: f64, p_hi: f64,
) -> (Array2<f64>, Array2<f64>) {
    let bound = |p: f64| {
        Array2::from_shape_fn(cv.latent_mean.raw_dim(), |(i, j)| {
            transform.quantile(cv.latent_mean[[i, j]], cv.latent_var[[i, j]], p)
        })
    };
    (bound(p_lo), bound(p_hi))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exporter {
    output_dir: PathBuf,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every output file.
    ///
    /// Errors
    /// ------
    /// - `Io` when the directory or a file cannot be written.
    /// - `Serialize`/`Snapshot` when the summary or snapshot cannot be built.
    pub fn write_all(&self, input: &ExportInput<'_>) -> ReportResult<()> {
        fs::create_dir_all(&self.output_dir).map_err(|e| ReportError::io(&self.output_dir, &e))?;
        self.write_tables(input)?;
        self.write_summary(input)?;
        self.write_report(input)?;
        if input.bank.is_fitted() {
            let snapshot = ModelSnapshot::capture(
                input.bank,
                &input.options.x_names(),
                &input.options.qoi_names,
            )?;
            save_snapshot(&self.output_dir.join(SNAPSHOT_FILE), &snapshot)?;
        } else {
            warn!("no model was trained; {SNAPSHOT_FILE} is not written");
        }
        info!(dir = %self.output_dir.display(), "results saved");
        Ok(())
    }

    pub fn write_tables(&self, input: &ExportInput<'_>) -> ReportResult<()> {
        let x_names = input.options.x_names();
        let y_names = &input.options.qoi_names;
        let cv = input.cv;

        let mut header: Vec<String> = vec!["eval_id".to_string()];
        header.extend(x_names.iter().cloned());
        header.extend(y_names.iter().cloned());
        let ids = Array2::from_shape_fn((cv.len(), 1), |(i, _)| (i + 1) as f64);
        let xy = hstack(&[ids.view(), cv.x.view(), cv.y_true.view()])?;
        write_table(&self.output_dir.join("dakotaTab.out"), &header, xy.view())?;
        write_table(&self.output_dir.join("inputTab.out"), &x_names, input.samples.x().view())?;
        write_table(&self.output_dir.join("outputTab.out"), y_names, input.samples.y().view())?;

        let transform = input.bank.settings().transform;
        let median = cv.latent_mean.mapv(|mu| transform.median(mu));
        let (q5, q95) = prediction_bounds(cv, transform, 0.05, 0.95);
        let surrogate =
            hstack(&[xy.view(), median.view(), q5.view(), q95.view(), cv.y_pred_var.view()])?;
        let mut sur_header = header;
        for suffix in ["median", "q5", "q95", "var"] {
            sur_header.extend(y_names.iter().map(|n| format!("{n}.{suffix}")));
        }
        write_table(&self.output_dir.join("surrogateTab.out"), &sur_header, surrogate.view())?;
        Ok(())
    }

    pub fn write_summary(&self, input: &ExportInput<'_>) -> ReportResult<()> {
        let value = summary_json(input);
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| ReportError::Serialize { what: "run summary", reason: e.to_string() })?;
        let path = self.output_dir.join(SUMMARY_FILE);
        fs::write(&path, text).map_err(|e| ReportError::io(&path, &e))
    }

    pub fn write_report(&self, input: &ExportInput<'_>) -> ReportResult<()> {
        let path = self.output_dir.join(REPORT_FILE);
        fs::write(&path, report_text(input)).map_err(|e| ReportError::io(&path, &e))
    }
}

fn hstack(blocks: &[ArrayView2<f64>]) -> ReportResult<Array2<f64>> {
    concatenate(Axis(1), blocks)
        .map_err(|e| ReportError::Serialize { what: "result table", reason: e.to_string() })
}

fn by_name(names: &[String], m: &Array2<f64>) -> Map<String, Value> {
    names
        .iter()
        .zip(m.axis_iter(Axis(1)))
        .map(|(n, col)| (n.clone(), json!(col.to_vec())))
        .collect()
}

fn per_qoi(names: &[String], v: &Array1<f64>) -> Map<String, Value> {
    names.iter().zip(v.iter()).map(|(n, &x)| (n.clone(), json!(x))).collect()
}

fn path_value(p: &Path) -> Value {
    Value::String(p.display().to_string())
}

/// The `dakota.out` document.
pub fn summary_json(input: &ExportInput<'_>) -> Value {
    let ExportInput { options, bank, cv, diagnostics, percentiles, summary, .. } = *input;
    let x_names = options.x_names();
    let y_names = &options.qoi_names;
    let settings = bank.settings();
    let (lb, ub) = prediction_bounds(cv, settings.transform, 0.25, 0.75);

    let mut doc = Map::new();
    doc.insert("doSampling".into(), json!(summary.do_sampling));
    doc.insert("doSimulation".into(), json!(summary.do_simulation));
    doc.insert("doDoE".into(), json!(summary.do_doe));
    doc.insert("doLogtransform".into(), json!(settings.transform.is_log()));
    doc.insert("doLinear".into(), json!(settings.linear));
    doc.insert("doMultiFidelity".into(), json!(bank.case().is_multi_fidelity()));
    doc.insert("kernName".into(), json!(settings.kernel.label()));
    doc.insert("terminationCode".into(), json!(summary.exit_code));
    doc.insert("thrNRMSE".into(), json!(summary.thr_nrmse));
    doc.insert("valSamp".into(), json!(summary.n_samples));
    doc.insert("valSim".into(), json!(summary.n_simulated));
    doc.insert("valTime".into(), json!(summary.elapsed.as_secs_f64()));
    doc.insert("xdim".into(), json!(x_names.len()));
    doc.insert("ydim".into(), json!(y_names.len()));
    doc.insert("xlabels".into(), json!(x_names));
    doc.insert("ylabels".into(), json!(y_names));
    doc.insert("xExact".into(), Value::Object(by_name(&x_names, &cv.x)));
    doc.insert("yExact".into(), Value::Object(by_name(y_names, &cv.y_true)));
    doc.insert("yPredict".into(), Value::Object(by_name(y_names, &cv.y_pred)));
    doc.insert("yPredict_CI_lb".into(), Value::Object(by_name(y_names, &lb)));
    doc.insert("yPredict_CI_ub".into(), Value::Object(by_name(y_names, &ub)));
    let nuggets = Array1::from_iter(bank.models().iter().map(SurrogateModel::noise_variance));
    doc.insert("valNugget".into(), Value::Object(per_qoi(y_names, &nuggets)));
    doc.insert("valNRMSE".into(), Value::Object(per_qoi(y_names, &diagnostics.nrmse)));
    doc.insert("valR2".into(), Value::Object(per_qoi(y_names, &diagnostics.r2)));
    doc.insert("valCorrCoeff".into(), Value::Object(per_qoi(y_names, &diagnostics.corr)));

    if summary.do_simulation {
        if let Some(perc) = percentiles {
            doc.insert("predError".into(), json!({ "percent": perc.percent, "value": perc.value }));
        }
        doc.insert("fem".into(), json!({ "workflow_driver": summary.driver }));
    }
    insert_data_files(&mut doc, &options.source);

    doc.insert("randomVariables".into(), json!(options.variables));
    let model_info: Map<String, Value> = y_names
        .iter()
        .zip(bank.models())
        .map(|(name, model)| {
            let info = match model {
                SurrogateModel::Single(m) => json!({
                    "kernel": m.kernel(),
                    "noise": m.noise_variance(),
                }),
                SurrogateModel::CoKriging(m) => json!({
                    "coKriging": m.params(),
                    "noise": m.noise_variance(),
                }),
            };
            (name.clone(), info)
        })
        .collect();
    doc.insert("modelInfo".into(), Value::Object(model_info));
    Value::Object(doc)
}

fn insert_data_files(doc: &mut Map<String, Value>, source: &DataSource) {
    match source {
        DataSource::Sampling { existing: Some(files) } => {
            doc.insert("inpData".into(), path_value(&files.inputs));
            doc.insert("outData".into(), path_value(&files.outputs));
        }
        DataSource::Sampling { existing: None } => {}
        DataSource::Import { inputs, outputs } => {
            doc.insert("inpData".into(), path_value(inputs));
            if let Some(outputs) = outputs {
                doc.insert("outData".into(), path_value(outputs));
            }
        }
        DataSource::MultiFidelity { high, low } => {
            for (source, tag) in [(high, "HF"), (low, "LF")] {
                if let FidelitySource::Data(files) = source {
                    doc.insert(format!("inpData_{tag}"), path_value(&files.inputs));
                    doc.insert(format!("outData_{tag}"), path_value(&files.outputs));
                }
            }
        }
    }
}

/// The `GPresults.out` text.
pub fn report_text(input: &ExportInput<'_>) -> String {
    let ExportInput { options, bank, diagnostics, summary, .. } = *input;
    let settings = bank.settings();
    let x_names = options.x_names();
    let mut out = String::new();

    let _ = writeln!(out, "* Problem setting");
    let _ = writeln!(out, "  - dimension of x : {}", options.x_dim());
    let _ = writeln!(out, "  - dimension of y : {}", options.y_dim());
    let _ = writeln!(out, "  - sampling : {}", summary.do_sampling);
    let _ = writeln!(out, "  - simulation : {}", summary.do_simulation);
    if bank.case().is_multi_fidelity() {
        let _ = writeln!(out, "  - fidelity case : {}", bank.case().label());
    }
    if summary.doe_shut_off {
        let _ = writeln!(
            out,
            "  - design of experiments (DoE) turned off - DoE evaluation time exceeds the model \
             simulation time"
        );
    } else if summary.do_doe {
        let _ = writeln!(out, "  - design of experiments : {}", summary.do_doe);
    }
    out.push('\n');

    let _ = writeln!(out, "* Convergence");
    let _ = writeln!(out, "  - exit code : \"{}\"", summary.exit_code);
    let _ = write!(out, "    simulation terminated as ");
    let _ = match summary.exit_code {
        "count" => {
            writeln!(out, "number of counts reached the maximum (max={})", summary.thr_count)
        }
        "accuracy" => writeln!(
            out,
            "minimum accuracy level (NRMSE={:.2}) is achieved",
            summary.thr_nrmse
        ),
        "time" => writeln!(out, "maximum running time (t={:.1}s) reached", summary.thr_time),
        _ => writeln!(out, "cannot identify the exit code"),
    };
    let _ = writeln!(out, "  - number of simulations (count) : {}", summary.n_samples);
    let _ = writeln!(
        out,
        "  - maximum normalized root-mean-squared error (NRMSE): {:.5}",
        diagnostics.max_nrmse()
    );
    for (name, v) in options.qoi_names.iter().zip(diagnostics.nrmse.iter()) {
        let _ = writeln!(out, "     {name} : {v:.2}");
    }
    let _ = writeln!(out, "  - analysis time : {:.1} sec", summary.elapsed.as_secs_f64());
    let _ = writeln!(out, "  - calibration interval : {}", summary.calibration_interval);
    out.push('\n');

    let _ = writeln!(out, "* GP parameters");
    let _ = writeln!(out, "  - Kernel : {}", settings.kernel.label());
    let _ = writeln!(out, "  - Linear : {}", settings.linear);
    out.push('\n');
    for (name, model) in options.qoi_names.iter().zip(bank.models()) {
        let _ = writeln!(out, "  [{name}]");
        match model {
            SurrogateModel::Single(m) => {
                let k = m.kernel();
                let _ = writeln!(out, "    - variance : {:.2e}", k.variance);
                let _ = writeln!(out, "    - lengthscale");
                for (x, l) in x_names.iter().zip(k.lengthscales.iter()) {
                    let _ = writeln!(out, "       {x} : {l:.2e}");
                }
                if let Some(lin) = &k.linear_variances {
                    let _ = writeln!(out, "    - linear variances");
                    for (x, v) in x_names.iter().zip(lin.iter()) {
                        let _ = writeln!(out, "       {x} : {v:.2e}");
                    }
                }
            }
            SurrogateModel::CoKriging(m) => {
                let p = m.params();
                let _ = writeln!(out, "    - rho : {:.2e}", p.rho);
                let _ = writeln!(out, "    - LF variance : {:.2e}", p.low.variance);
                let _ = writeln!(out, "    - discrepancy variance : {:.2e}", p.delta.variance);
                let _ = writeln!(out, "    - lengthscale (LF / discrepancy)");
                for ((x, a), b) in
                    x_names.iter().zip(p.low.lengthscales.iter()).zip(p.delta.lengthscales.iter())
                {
                    let _ = writeln!(out, "       {x} : {a:.2e} / {b:.2e}");
                }
            }
        }
        let _ = writeln!(out, "    - Gaussian_noise.variance : {:.2e}", model.noise_variance());
        out.push('\n');
    }
    out
}
