//! vitaltrend.sample.v1 input schema
//!
//! Samples arrive already parsed from device exports and manual forms. This
//! module reads them from JSON arrays or NDJSON and checks each one for
//! issues the engine would otherwise silently skip.

mod reader;
mod validation;

pub use reader::*;
pub use validation::*;

/// Current input schema version
pub const SCHEMA_VERSION: &str = "vitaltrend.sample.v1";
