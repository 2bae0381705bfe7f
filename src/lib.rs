//! rust_surrogate — adaptive Gaussian-process surrogates for expensive
//! simulators.
//!
//! Purpose
//! -------
//! Build a GP surrogate of a black-box simulator (or of imported data) with
//! as few simulator runs as possible: an initial space-filling design, then
//! adaptive design-of-experiments rounds until the leave-one-out error, the
//! sample budget or the time budget says stop.
//!
//! Key behaviors
//! -------------
//! - [`config`] turns the JSON input document into typed options.
//! - [`simulation`] runs the simulator contract (`params.in` /
//!   `results.out`) sequentially or on a rayon pool.
//! - [`gp`] holds the model bank: one GP (or AR(1) co-kriging model) per
//!   QoI, with likelihood calibration through [`optimization`].
//! - [`doe`] proposes the next batch (pareto, IMSEw, MMSEw or random).
//! - [`controller`] drives the adaptive loop and decides the exit code.
//! - [`report`] computes diagnostics and writes every output file.
//! - [`workflow`] wires all of the above for the `build_surrogate` binary.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are `n × x_dim` and outputs `n × y_dim` `ndarray` matrices, row
//!   per sample.
//! - Simulations are identified by a zero-based sample id that only grows;
//!   failed ids are never reused.
//!
//! Conventions
//! -----------
//! - Every module has its own error enum; [`errors::UqError`] wraps them and
//!   classifies each into an [`errors::ErrorKind`].
//! - Progress is reported through `tracing` events; the binary installs the
//!   subscriber.

pub mod config;
pub mod controller;
pub mod doe;
pub mod errors;
pub mod gp;
pub mod optimization;
pub mod report;
pub mod samples;
pub mod simulation;
pub mod workflow;

pub use crate::controller::{Controller, ControllerSettings, ExitCode, InitialDesign, RunOutcome};
pub use crate::errors::{ErrorKind, UqError, UqResult};
pub use crate::gp::{FidelityCase, ModelSettings, SurrogateBank};
pub use crate::report::{load_snapshot, LoadedSurrogate};
pub use crate::samples::SampleSet;
pub use crate::workflow::{run_options, run_workflow, WorkflowOutcome};
