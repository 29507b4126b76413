//! vitaltrend - Time-series analytics and forecasting for body measurements
//!
//! vitaltrend turns irregular, multi-source measurement samples into
//! dashboard-ready series through a deterministic pipeline: source merge →
//! daily aggregation → trend statistics, regression line and damped-trend
//! forecast. Every operation is a pure transform of its input.
//!
//! ## Modules
//!
//! - **Pipeline**: Merge, aggregate and analyze one metric (`TrendEngine`)
//! - **Forecast**: Damped Holt projection with a capped confidence band
//! - **Zones**: Threshold classification of single physiological values

pub mod aggregator;
pub mod config;
pub mod encoder;
pub mod error;
pub mod forecast;
pub mod merger;
pub mod pipeline;
pub mod regression;
pub mod schema;
pub mod stats;
pub mod types;
pub mod zones;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use error::ComputeError;
pub use pipeline::{analyze_metric, forecast_metric, TrendEngine};

// Schema exports
pub use schema::{SampleReader, SCHEMA_VERSION};

pub use types::{MetricField, Sample, Source, TimeSlot};
pub use zones::ZoneReading;

/// vitaltrend version embedded in all reports
pub const VITALTREND_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "vitaltrend";
