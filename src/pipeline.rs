//! Pipeline orchestration
//!
//! This module provides the public API for vitaltrend. It runs the stages
//! from raw samples to a finished metric report:
//! merge → daily aggregation → {statistics, trend line, forecast}.

use crate::aggregator::Aggregator;
use crate::config::EngineConfig;
use crate::encoder::ReportEncoder;
use crate::error::ComputeError;
use crate::forecast::ForecastEngine;
use crate::merger::SourceMerger;
use crate::regression::fit_trend_line;
use crate::schema::SampleReader;
use crate::stats::TrendStats;
use crate::types::{
    Forecast, Measurements, MetricAnalysis, MetricField, MetricReport, Sample, SampleCounts,
    SeriesAnalysis, Source, TimeSlot,
};
use crate::zones::ZoneReading;
use tracing::{debug, info_span};

/// Analyze one metric from a JSON array or NDJSON of samples.
///
/// # Arguments
/// * `samples_json` - Samples from both sources, tagged with `source`
/// * `metric` - Field name, e.g. `"weight"` or `"heart_rate"`
/// * `config_json` - Optional engine configuration; defaults when `None`
///
/// # Returns
/// The metric report serialized as JSON
///
/// # Example
/// ```ignore
/// let report = analyze_metric(samples_json, "weight", None)?;
/// ```
pub fn analyze_metric(
    samples_json: &str,
    metric: &str,
    config_json: Option<&str>,
) -> Result<String, ComputeError> {
    let engine = TrendEngine::from_config_json(config_json)?;
    let metric: MetricField = metric.parse()?;
    let samples = SampleReader::parse(samples_json)?;
    let report = engine.report(&samples, metric, TimeSlot::All);
    serde_json::to_string(&report).map_err(|e| ComputeError::EncodingError(e.to_string()))
}

/// Forecast one metric from a JSON array or NDJSON of samples.
///
/// Returns the forecast serialized as JSON; an empty forecast when the
/// history is too short.
pub fn forecast_metric(
    samples_json: &str,
    metric: &str,
    config_json: Option<&str>,
) -> Result<String, ComputeError> {
    let engine = TrendEngine::from_config_json(config_json)?;
    let metric: MetricField = metric.parse()?;
    let samples = SampleReader::parse(samples_json)?;
    let forecast = engine.forecast(&samples, metric, TimeSlot::All);
    serde_json::to_string(&forecast).map_err(|e| ComputeError::EncodingError(e.to_string()))
}

/// Engine holding a validated configuration and a report encoder.
///
/// Holds no sample state: every call recomputes from its input.
pub struct TrendEngine {
    config: EngineConfig,
    encoder: ReportEncoder,
}

impl Default for TrendEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendEngine {
    /// Create an engine with default settings
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            encoder: ReportEncoder::new(),
        }
    }

    /// Create an engine with a specific configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            encoder: ReportEncoder::new(),
        })
    }

    /// Create an engine from optional configuration JSON
    pub fn from_config_json(config_json: Option<&str>) -> Result<Self, ComputeError> {
        match config_json {
            Some(json) => Self::with_config(EngineConfig::from_json(json)?),
            None => Ok(Self::new()),
        }
    }

    /// Replace the report encoder (e.g. to pin the instance ID)
    pub fn with_encoder(mut self, encoder: ReportEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze any numeric field of the samples.
    ///
    /// Pipeline stages:
    /// 1. SourceMerger - Unified timeline, device wins on identical keys
    /// 2. Aggregator - Daily averages within the time slot
    /// 3. TrendStats - Moving average and headline statistics
    /// 4. fit_trend_line - Least-squares line
    /// 5. ForecastEngine - Damped-trend projection
    pub fn analyze_field<F>(
        &self,
        manual: &[Sample],
        device: &[Sample],
        field: F,
        slot: TimeSlot,
    ) -> SeriesAnalysis
    where
        F: Fn(&Measurements) -> Option<f64> + Copy,
    {
        let config = &self.config;

        // Stage 1: Merge sources
        let unified = SourceMerger::merge(manual, device, field);

        // Stage 2: Aggregate per day
        let daily =
            Aggregator::daily_averages(&unified, field, slot, config.evening_cutoff_hour);

        // Stage 3-5: Derive statistics, trend line and forecast from the daily series
        let moving_average = TrendStats::moving_average(&daily, config.moving_average_window);
        let summary = TrendStats::summarize(&daily, config);
        let trend_line = fit_trend_line(&daily);
        let forecast = ForecastEngine::forecast(&daily, config);

        let counts = SampleCounts {
            manual: manual.len(),
            device: device.len(),
            unified: unified.len(),
            days: daily.len(),
        };
        debug!(
            unified = counts.unified,
            days = counts.days,
            direction = %summary.direction,
            forecast_days = forecast.points.len(),
            "series analyzed"
        );

        SeriesAnalysis {
            counts,
            daily,
            moving_average,
            trend_line,
            summary,
            forecast,
        }
    }

    /// Analyze a named metric from a mixed collection of tagged samples
    pub fn analyze(
        &self,
        samples: &[Sample],
        metric: MetricField,
        slot: TimeSlot,
    ) -> MetricAnalysis {
        let span = info_span!("analyze", metric = metric.as_str(), slot = slot.as_str());
        let _enter = span.enter();

        let (manual, device) = split_by_source(samples);
        let series = self.analyze_field(&manual, &device, metric.accessor(), slot);
        let zone = series
            .summary
            .latest
            .and_then(|latest| ZoneReading::classify(metric, latest.value));

        MetricAnalysis {
            metric,
            unit: metric.unit().to_string(),
            slot,
            series,
            zone,
        }
    }

    /// Analyze a metric and wrap it in a report
    pub fn report(&self, samples: &[Sample], metric: MetricField, slot: TimeSlot) -> MetricReport {
        self.encoder.encode(self.analyze(samples, metric, slot))
    }

    /// Forecast a metric with the configured horizon
    pub fn forecast(&self, samples: &[Sample], metric: MetricField, slot: TimeSlot) -> Forecast {
        self.forecast_days(samples, metric, slot, self.config.forecast_days)
    }

    /// Forecast a metric over `days` days
    pub fn forecast_days(
        &self,
        samples: &[Sample],
        metric: MetricField,
        slot: TimeSlot,
        days: usize,
    ) -> Forecast {
        let field = metric.accessor();
        let unified = SourceMerger::merge_tagged(samples, field);
        let daily =
            Aggregator::daily_averages(&unified, field, slot, self.config.evening_cutoff_hour);
        ForecastEngine::forecast_days(&daily, days, &self.config)
    }

    /// Run every metric present in the samples, skipping metrics with no values
    pub fn analyze_all(&self, samples: &[Sample], slot: TimeSlot) -> Vec<MetricAnalysis> {
        MetricField::ALL
            .into_iter()
            .filter(|metric| samples.iter().any(|s| metric.value(&s.values).is_some()))
            .map(|metric| self.analyze(samples, metric, slot))
            .collect()
    }
}

fn split_by_source(samples: &[Sample]) -> (Vec<Sample>, Vec<Sample>) {
    samples
        .iter()
        .cloned()
        .partition(|sample| sample.source == Source::Manual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrendDirection;

    fn sample_json() -> &'static str {
        r#"[
            {"date": "2024-01-01", "time": "07:00", "source": "manual", "weight_kg": 80.0, "heart_rate_bpm": 64},
            {"date": "2024-01-02", "time": "07:05", "source": "device", "weight_kg": 79.7, "heart_rate_bpm": 62},
            {"date": "2024-01-03", "time": "07:10", "source": "device", "weight_kg": 79.9},
            {"date": "2024-01-04", "time": "07:00", "source": "manual", "weight_kg": 79.4},
            {"date": "2024-01-04", "time": "07:00", "source": "device", "weight_kg": 79.3},
            {"date": "2024-01-05", "time": "06:55", "source": "device", "weight_kg": 79.2},
            {"date": "2024-01-06", "time": "07:20", "source": "manual", "weight_kg": 79.5},
            {"date": "2024-01-07", "time": "07:00", "source": "device", "weight_kg": 79.0, "heart_rate_bpm": 58}
        ]"#
    }

    #[test]
    fn test_analyze_metric_json() {
        let result = analyze_metric(sample_json(), "weight", None);

        assert!(result.is_ok());
        let payload: serde_json::Value = serde_json::from_str(&result.unwrap()).unwrap();
        assert_eq!(payload["producer"]["name"], "vitaltrend");
        assert_eq!(payload["metric"], "weight");
        assert_eq!(payload["unit"], "kg");
        assert_eq!(payload["counts"]["unified"], 7);
        assert_eq!(payload["daily"].as_array().unwrap().len(), 7);
        assert_eq!(payload["forecast"]["points"].as_array().unwrap().len(), 14);
        assert_eq!(payload["summary"]["weekly_change"]["change"], -1.0);
    }

    #[test]
    fn test_device_reading_wins_in_daily_series() {
        let engine = TrendEngine::new();
        let samples = SampleReader::parse(sample_json()).unwrap();
        let analysis = engine.analyze(&samples, MetricField::Weight, TimeSlot::All);

        assert_eq!(analysis.series.daily[3].value, 79.3);
        assert_eq!(analysis.series.counts.manual, 3);
        assert_eq!(analysis.series.counts.device, 5);
    }

    #[test]
    fn test_zone_of_latest_value() {
        let engine = TrendEngine::new();
        let samples = SampleReader::parse(sample_json()).unwrap();
        let analysis = engine.analyze(&samples, MetricField::HeartRate, TimeSlot::All);

        assert_eq!(analysis.series.daily.len(), 3);
        assert_eq!(analysis.zone.map(|z| z.label()), Some("low"));
        assert!(analysis.series.forecast.points.len() == 14);
    }

    #[test]
    fn test_short_history_degrades_gracefully() {
        let json = r#"[{"date": "2024-01-01", "source": "manual", "weight_kg": 80.0}]"#;
        let engine = TrendEngine::new();
        let samples = SampleReader::parse(json).unwrap();
        let analysis = engine.analyze(&samples, MetricField::Weight, TimeSlot::All);

        assert!(analysis.series.trend_line.is_empty());
        assert!(analysis.series.forecast.is_empty());
        assert!(analysis.series.summary.weekly_change.is_none());
        assert_eq!(analysis.series.summary.direction, TrendDirection::Stable);
        assert_eq!(analysis.series.summary.volatility, Some(0.0));
    }

    #[test]
    fn test_custom_config() {
        let engine = TrendEngine::from_config_json(Some(r#"{"forecast_days": 3}"#)).unwrap();
        let samples = SampleReader::parse(sample_json()).unwrap();

        let forecast = engine.forecast(&samples, MetricField::Weight, TimeSlot::All);
        assert_eq!(forecast.points.len(), 3);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(analyze_metric(sample_json(), "shoe_size", None).is_err());
        assert!(analyze_metric("not valid json", "weight", None).is_err());
        assert!(analyze_metric(sample_json(), "weight", Some(r#"{"phi": 2.0}"#)).is_err());
    }

    #[test]
    fn test_oversized_config_is_an_error() {
        let result = analyze_metric(
            sample_json(),
            "weight",
            Some(r#"{"weekly_lookback_days": 1000000000}"#),
        );
        assert!(matches!(result, Err(ComputeError::InvalidConfig(_))));

        let result = forecast_metric(
            sample_json(),
            "weight",
            Some(r#"{"forecast_days": 1000000000000}"#),
        );
        assert!(matches!(result, Err(ComputeError::InvalidConfig(_))));
    }

    #[test]
    fn test_trend_parameters_change_direction() {
        let samples = SampleReader::parse(sample_json()).unwrap();
        let direction = |config: EngineConfig| {
            TrendEngine::with_config(config)
                .unwrap()
                .analyze(&samples, MetricField::Weight, TimeSlot::All)
                .series
                .summary
                .direction
        };

        // Last three moving-average points: 79.62, 79.6, 79.51
        assert_eq!(direction(EngineConfig::default()), TrendDirection::Stable);
        assert_eq!(
            direction(EngineConfig {
                trend_threshold: 0.1,
                ..Default::default()
            }),
            TrendDirection::Down
        );
        // Whole week: 80.0 down to 79.51
        assert_eq!(
            direction(EngineConfig {
                trend_lookback: 7,
                ..Default::default()
            }),
            TrendDirection::Down
        );
        assert_eq!(
            direction(EngineConfig {
                trend_lookback: 8,
                trend_threshold: 0.0,
                ..Default::default()
            }),
            TrendDirection::Stable
        );
    }

    #[test]
    fn test_pinned_encoder_in_report() {
        let engine =
            TrendEngine::new().with_encoder(ReportEncoder::with_instance_id("kiosk-1".to_string()));
        let samples = SampleReader::parse(sample_json()).unwrap();

        let report = engine.report(&samples, MetricField::Weight, TimeSlot::Morning);
        assert_eq!(report.producer.instance_id, "kiosk-1");
        assert_eq!(report.analysis.slot, TimeSlot::Morning);
        assert_eq!(report.analysis.series.daily.len(), 7);
    }

    #[test]
    fn test_analyze_all_skips_absent_metrics() {
        let engine = TrendEngine::new();
        let samples = SampleReader::parse(sample_json()).unwrap();
        let metrics: Vec<MetricField> = engine
            .analyze_all(&samples, TimeSlot::All)
            .into_iter()
            .map(|a| a.metric)
            .collect();

        assert_eq!(metrics, vec![MetricField::Weight, MetricField::HeartRate]);
    }

    #[test]
    fn test_forecast_metric_json() {
        let json = forecast_metric(sample_json(), "weight", None).unwrap();
        let forecast: Forecast = serde_json::from_str(&json).unwrap();
        assert_eq!(forecast.points.len(), 14);
    }
}
