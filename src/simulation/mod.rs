//! simulation — the adapter between the surrogate loop and the simulator.
//!
//! - [`simulator`]: the [`Simulator`] trait and [`FnSimulator`].
//! - [`external`]: [`ExternalSimulator`], the `params.in`/`results.out`
//!   file contract.
//! - [`batch`]: [`BatchRunner::evaluate_batch`] with deadline and failure
//!   handling.
//! - [`errors`]: [`SimulationError`].

pub mod batch;
pub mod errors;
pub mod external;
pub mod simulator;

pub use self::batch::{BatchOutcome, BatchRunner};
pub use self::errors::{SimResult, SimulationError};
pub use self::external::{read_results, ExternalSimulator, PARAMS_FILE, RESULTS_FILE};
pub use self::simulator::{check_response, FnSimulator, Simulator};
