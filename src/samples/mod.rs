//! samples — the sample store and everything that produces or persists rows.
//!
//! - [`store`]: the aligned, append-only [`SampleSet`].
//! - [`design`]: Latin-hypercube/uniform designs and range-scaled distances.
//! - [`table`]: `%`-commented numeric tables.
//! - [`errors`]: [`SampleError`].

pub mod design;
pub mod errors;
pub mod store;
pub mod table;

pub use self::design::{closest_node, input_range, latin_hypercube, uniform, weights_node};
pub use self::errors::{SampleError, SampleResult};
pub use self::store::SampleSet;
pub use self::table::{format_sci, read_table, write_table};

pub mod prelude {
    pub use super::design::{latin_hypercube, uniform};
    pub use super::errors::{SampleError, SampleResult};
    pub use super::store::SampleSet;
}
