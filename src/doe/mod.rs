//! doe — design of experiments: where to simulate next.
//!
//! - [`strategy`]: the named strategies.
//! - [`selector`]: dimension of interest, pools and dispatch ([`DoeSelector`]).
//! - [`pareto`]: two-objective Pareto ranking with greedy pseudo-updates.
//! - [`variance`]: IMSEw and MMSEw.
//! - [`errors`]: [`DoeError`].

pub mod errors;
pub mod pareto;
pub mod selector;
pub mod strategy;
pub mod variance;

pub use self::errors::{DoeError, DoeResult};
pub use self::selector::{default_pool_size, dimension_of_interest, DoeProposal, DoeSelector};
pub use self::strategy::DoeStrategy;
