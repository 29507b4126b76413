//! Report encoding
//!
//! Wraps a metric analysis with producer metadata and serializes it for the
//! presentation layer or a JSON API response.

use crate::error::ComputeError;
use crate::types::{MetricAnalysis, MetricReport, ReportProducer};
use crate::{PRODUCER_NAME, VITALTREND_VERSION};
use chrono::Utc;
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Encoder for producing report payloads
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Wrap an analysis in a report
    pub fn encode(&self, analysis: MetricAnalysis) -> MetricReport {
        MetricReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: VITALTREND_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            analysis,
        }
    }

    /// Encode an analysis straight to a JSON string
    pub fn encode_to_json(&self, analysis: MetricAnalysis) -> Result<String, ComputeError> {
        let report = self.encode(analysis);
        serde_json::to_string(&report).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Forecast, MetricField, SampleCounts, SeriesAnalysis, TimeSlot, TrendDirection,
        TrendSummary,
    };

    fn empty_analysis() -> MetricAnalysis {
        MetricAnalysis {
            metric: MetricField::Weight,
            unit: "kg".to_string(),
            slot: TimeSlot::All,
            series: SeriesAnalysis {
                counts: SampleCounts::default(),
                daily: vec![],
                moving_average: vec![],
                trend_line: vec![],
                summary: TrendSummary {
                    latest: None,
                    volatility: None,
                    weekly_change: None,
                    extremes: None,
                    direction: TrendDirection::Stable,
                    current_month: None,
                },
                forecast: Forecast::default(),
            },
            zone: None,
        }
    }

    #[test]
    fn test_encode_metadata() {
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let report = encoder.encode(empty_analysis());

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert!(chrono::DateTime::parse_from_rfc3339(&report.computed_at_utc).is_ok());
    }

    #[test]
    fn test_json_is_flat() {
        let json = ReportEncoder::new().encode_to_json(empty_analysis()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["metric"], "weight");
        assert_eq!(value["slot"], "all");
        assert_eq!(value["summary"]["direction"], "stable");
        assert!(value["forecast"]["points"].as_array().unwrap().is_empty());
        assert!(value["zone"].is_null());
    }

    #[test]
    fn test_unique_instance_ids() {
        assert_ne!(
            ReportEncoder::new().instance_id(),
            ReportEncoder::new().instance_id()
        );
    }
}
