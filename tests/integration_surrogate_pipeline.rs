//! Integration tests for the adaptive surrogate pipeline.
//!
//! Purpose
//! -------
//! - Validate the end-to-end path from an initial design, through the
//!   adaptive controller and the model bank, to the exported files and a
//!   reloaded snapshot.
//! - Check that malformed data fails before any simulator work starts and
//!   that failed simulations shrink the sample set without stopping the run.
//!
//! Coverage
//! --------
//! - `controller::Controller` with a closure simulator.
//! - `report::Exporter` and `report::load_snapshot`.
//! - `workflow::run_options` on a document with existing data.
//!
//! Exclusions
//! ----------
//! - External driver processes; `simulation::external` has its own unit
//!   tests.
//! - Multi-fidelity calibration details, covered in `gp::multi_fidelity`.
use ndarray::{array, Array1, ArrayView1};
use rust_surrogate::{
    config::{options::RunSettings, InputDocument, SurrogateOptions},
    controller::{Controller, ControllerSettings, ExitCode, InitialDesign},
    doe::DoeStrategy,
    errors::{ErrorKind, UqError},
    gp::{FidelityCase, ModelSettings, SurrogateBank},
    load_snapshot,
    report::{Diagnostics, ExportInput, Exporter, RunSummary, SNAPSHOT_FILE},
    run_options,
    samples::{SampleError, SampleSet},
    simulation::{BatchRunner, FnSimulator},
};
use std::fs;

fn one_d_settings(thr_count: usize, thr_nrmse: f64) -> ControllerSettings {
    ControllerSettings {
        thr_count,
        thr_nrmse,
        thr_time: f64::INFINITY,
        calibration_interval: 5,
        doe: Some(DoeStrategy::Pareto),
        bounds: Some((array![0.0], array![1.0])),
        break_doe: false,
        seed: 3,
        check_existing: true,
        pool_sizes: Some((50, 50)),
    }
}

fn one_d_bank() -> SurrogateBank {
    SurrogateBank::new(FidelityCase::SingleFidelity, ModelSettings::default(), array![1.0])
}

#[test]
// Purpose
// -------
// A smooth 1-D response converges on accuracy and the exported snapshot
// reproduces the fitted model.
//
// Given
// -----
// - y = x² on [0, 1], 20 LHS points, NRMSE threshold 0.05, budget 30.
//
// Expect
// ------
// - Exit `accuracy` with 20 simulations.
// - The snapshot reloads and predicts close to the truth at x = 0.5.
fn quadratic_converges_and_exports() {
    // Arrange
    let sim = FnSimulator::new(1, |x: ArrayView1<f64>| array![x[0] * x[0]]);
    let runner = BatchRunner::sequential();
    let mut controller = Controller::new(one_d_settings(30, 0.05), &runner, Some(&sim));
    let dir = tempfile::tempdir().expect("tempdir");

    // Act
    let out = controller
        .run(one_d_bank(), SampleSet::empty(1, 1), InitialDesign::Lhs(20))
        .expect("run");

    // Assert
    assert_eq!(out.exit, ExitCode::Accuracy);
    assert_eq!(out.n_simulated, 20);
    assert!(out.diagnostics.max_nrmse() < 0.05);

    let doc = InputDocument::from_json(
        r#"{
            "randomVariables": [
                {"name": "x", "distribution": "Uniform", "lowerbound": 0, "upperbound": 1}
            ],
            "EDP": [{"name": "y", "length": 1}],
            "UQ_Method": {"surrogateMethodInfo": {
                "method": "Sampling and Simulation", "samples": 30
            }}
        }"#,
    )
    .expect("document");
    let options = SurrogateOptions::from_document(&doc, dir.path()).expect("options");
    let summary = RunSummary {
        exit_code: out.exit.label(),
        thr_nrmse: 0.05,
        thr_count: 30,
        thr_time: f64::INFINITY,
        n_samples: out.samples.len(),
        n_simulated: out.n_simulated,
        elapsed: out.elapsed,
        calibration_interval: out.calibration_interval,
        do_sampling: true,
        do_simulation: true,
        do_doe: true,
        doe_shut_off: false,
        driver: None,
    };
    let diagnostics = Diagnostics::from_cross_validation(&out.cv);
    let input = ExportInput {
        options: &options,
        bank: &out.bank,
        samples: &out.samples,
        cv: &out.cv,
        diagnostics: &diagnostics,
        percentiles: None,
        summary: &summary,
    };
    Exporter::new(dir.path()).write_all(&input).expect("export");

    let summary_text = fs::read_to_string(dir.path().join("dakota.out")).expect("summary");
    assert!(summary_text.contains("\"terminationCode\""));
    let loaded = load_snapshot(&dir.path().join(SNAPSHOT_FILE)).expect("snapshot");
    let (mean, _) = loaded.predict(array![[0.5]].view()).expect("predict");
    assert!((mean[[0, 0]] - 0.25).abs() < 0.02);
}

#[test]
// Purpose
// -------
// A data file with the wrong number of columns is a configuration error
// raised before any simulation starts.
//
// Given
// -----
// - Three random variables and an existing input file with five columns.
//
// Expect
// ------
// - `ColumnCount` classified as `Configuration`; no working directory is
//   created.
fn column_mismatch_fails_before_simulation() {
    // Arrange
    let work = tempfile::tempdir().expect("tempdir");
    let run = {
        let mut run = RunSettings::new(work.path().to_path_buf());
        run.driver = Some(work.path().join("driver.sh"));
        run
    };
    fs::create_dir_all(&run.template_dir).expect("template");
    fs::write(run.template_dir.join("inp.in"), "0.1 0.2 0.3 0.4 0.5\n0.5 0.4 0.3 0.2 0.1\n")
        .expect("inputs");
    fs::write(run.template_dir.join("out.in"), "1.0\n2.0\n").expect("outputs");
    let doc = InputDocument::from_json(
        r#"{
            "randomVariables": [
                {"name": "a", "distribution": "Uniform", "lowerbound": 0, "upperbound": 1},
                {"name": "b", "distribution": "Uniform", "lowerbound": 0, "upperbound": 1},
                {"name": "c", "distribution": "Uniform", "lowerbound": 0, "upperbound": 1}
            ],
            "EDP": [{"name": "y", "length": 1}],
            "UQ_Method": {"surrogateMethodInfo": {
                "method": "Sampling and Simulation", "samples": 10,
                "existingDoE": true, "inpFile": "inp.in", "outFile": "out.in"
            }}
        }"#,
    )
    .expect("document");
    let options = SurrogateOptions::from_document(&doc, &run.template_dir).expect("options");

    // Act
    let err = run_options(options, &run).expect_err("column mismatch");

    // Assert
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(matches!(
        err,
        UqError::Samples(SampleError::ColumnCount { expected: 3, found: 5, .. })
    ));
    assert!(!work.path().join("workdir.1").exists());
}

#[test]
// Purpose
// -------
// A simulation that returns NaN is dropped and the run still finishes.
//
// Given
// -----
// - A response that is NaN for x ≥ 0.9, 10 LHS points (exactly one in the
//   top cell), budget 10.
//
// Expect
// ------
// - Exit `count`, ten simulation ids spent, nine rows kept, one failure,
//   and every kept input below 0.9.
fn nan_response_is_dropped() {
    // Arrange
    let sim = FnSimulator::new(1, |x: ArrayView1<f64>| -> Array1<f64> {
        if x[0] >= 0.9 {
            array![f64::NAN]
        } else {
            array![(3.0 * x[0]).sin()]
        }
    });
    let runner = BatchRunner::sequential();
    let mut settings = one_d_settings(10, 1e-12);
    settings.doe = Some(DoeStrategy::Random);
    let mut controller = Controller::new(settings, &runner, Some(&sim));

    // Act
    let out = controller
        .run(one_d_bank(), SampleSet::empty(1, 1), InitialDesign::Lhs(10))
        .expect("run");

    // Assert
    assert_eq!(out.exit, ExitCode::Count);
    assert_eq!(out.n_simulated, 10);
    assert_eq!(out.samples.len(), 9);
    assert_eq!(out.failures, 1);
    assert!(out.samples.x().iter().all(|&v| v < 0.9));
}
