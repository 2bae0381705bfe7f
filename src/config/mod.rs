//! config — the JSON input document and the validated run options.
//!
//! - [`document`]: serde structs mirroring the document keys.
//! - [`variables`]: random variables, QoI names and sampling bounds.
//! - [`options`]: [`SurrogateOptions`] and [`RunSettings`].
//! - [`errors`]: [`ConfigError`].

pub mod document;
pub mod errors;
pub mod options;
pub mod variables;

pub use self::document::{InputDocument, SurrogateMethodDoc};
pub use self::errors::{ConfigError, ConfigResult};
pub use self::options::{
    parse_nuggets, DataFiles, DataSource, FidelitySource, RunSettings, SurrogateOptions,
    DEFAULT_NRMSE,
};
pub use self::variables::{qoi_names, random_variables, sampling_bounds, RandomVariable};
