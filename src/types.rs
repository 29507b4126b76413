//! Core types for the vitaltrend engine
//!
//! This module defines the value objects that flow through the engine:
//! raw samples, unified samples, per-day series points, forecast points and
//! the summaries handed to the presentation layer.

use crate::error::ComputeError;
use crate::zones::ZoneReading;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Clock time assumed for samples recorded without one
pub const DEFAULT_TIME: &str = "00:00";

/// Origin of a measurement. Only used to break ties during merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Entered by hand
    Manual,
    /// Read from a scale, watch or other device export
    Device,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Manual => "manual",
            Source::Device => "device",
        }
    }
}

/// Numeric fields a sample may carry. Every field is nullable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Measurements {
    /// Body weight (kg)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    /// Body fat (percent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_fat_pct: Option<f64>,
    /// Skeletal muscle mass (kg)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muscle_mass_kg: Option<f64>,
    /// Total body water (percent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_water_pct: Option<f64>,
    /// Bone mass (kg)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bone_mass_kg: Option<f64>,
    /// Body mass index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
    /// Visceral fat rating (scale-specific, typically 1-59)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visceral_fat: Option<f64>,
    /// Heart rate (bpm)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate_bpm: Option<f64>,
}

impl Measurements {
    /// True when no field carries a value
    pub fn is_empty(&self) -> bool {
        MetricField::ALL.iter().all(|field| field.value(self).is_none())
    }
}

/// Selects one numeric field of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricField {
    Weight,
    BodyFat,
    MuscleMass,
    BodyWater,
    BoneMass,
    Bmi,
    VisceralFat,
    HeartRate,
}

impl MetricField {
    pub const ALL: [MetricField; 8] = [
        MetricField::Weight,
        MetricField::BodyFat,
        MetricField::MuscleMass,
        MetricField::BodyWater,
        MetricField::BoneMass,
        MetricField::Bmi,
        MetricField::VisceralFat,
        MetricField::HeartRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricField::Weight => "weight",
            MetricField::BodyFat => "body_fat",
            MetricField::MuscleMass => "muscle_mass",
            MetricField::BodyWater => "body_water",
            MetricField::BoneMass => "bone_mass",
            MetricField::Bmi => "bmi",
            MetricField::VisceralFat => "visceral_fat",
            MetricField::HeartRate => "heart_rate",
        }
    }

    /// Display unit for the field
    pub fn unit(&self) -> &'static str {
        match self {
            MetricField::Weight | MetricField::MuscleMass | MetricField::BoneMass => "kg",
            MetricField::BodyFat | MetricField::BodyWater => "%",
            MetricField::Bmi => "kg/m2",
            MetricField::VisceralFat => "rating",
            MetricField::HeartRate => "bpm",
        }
    }

    /// Read this field from a set of measurements
    pub fn value(&self, values: &Measurements) -> Option<f64> {
        match self {
            MetricField::Weight => values.weight_kg,
            MetricField::BodyFat => values.body_fat_pct,
            MetricField::MuscleMass => values.muscle_mass_kg,
            MetricField::BodyWater => values.body_water_pct,
            MetricField::BoneMass => values.bone_mass_kg,
            MetricField::Bmi => values.bmi,
            MetricField::VisceralFat => values.visceral_fat,
            MetricField::HeartRate => values.heart_rate_bpm,
        }
    }

    /// Write this field on a set of measurements
    pub fn set(&self, values: &mut Measurements, value: Option<f64>) {
        let slot = match self {
            MetricField::Weight => &mut values.weight_kg,
            MetricField::BodyFat => &mut values.body_fat_pct,
            MetricField::MuscleMass => &mut values.muscle_mass_kg,
            MetricField::BodyWater => &mut values.body_water_pct,
            MetricField::BoneMass => &mut values.bone_mass_kg,
            MetricField::Bmi => &mut values.bmi,
            MetricField::VisceralFat => &mut values.visceral_fat,
            MetricField::HeartRate => &mut values.heart_rate_bpm,
        };
        *slot = value;
    }

    /// Field accessor usable with the generic engine operations
    pub fn accessor(self) -> impl Fn(&Measurements) -> Option<f64> + Copy {
        move |values: &Measurements| self.value(values)
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricField {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        MetricField::ALL
            .into_iter()
            .find(|field| field.as_str() == normalized)
            .ok_or_else(|| ComputeError::UnknownMetric(s.to_string()))
    }
}

/// One measurement event as handed over by the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Civil date of the measurement
    pub date: NaiveDate,
    /// Local clock time ("HH:MM"), if the source recorded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Where the sample came from
    pub source: Source,
    /// Measured values
    #[serde(flatten)]
    pub values: Measurements,
}

impl Sample {
    pub fn new(date: NaiveDate, time: Option<&str>, source: Source) -> Self {
        Self {
            date,
            time: time.map(str::to_string),
            source,
            values: Measurements::default(),
        }
    }

    /// Set one field, builder style
    pub fn with(mut self, field: MetricField, value: f64) -> Self {
        field.set(&mut self.values, Some(value));
        self
    }

    /// Clock time, falling back to midnight when absent
    pub fn time_or_default(&self) -> &str {
        self.time.as_deref().unwrap_or(DEFAULT_TIME)
    }
}

/// A sample on the merged timeline, keyed by `(date, time)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedSample {
    pub date: NaiveDate,
    pub time: String,
    /// Source that won the merge for this key
    pub source: Source,
    #[serde(flatten)]
    pub values: Measurements,
}

/// Dated value of one field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Mean of one field over a calendar day
pub type DailyAverage = SeriesPoint;

/// Time-of-day filter applied before daily aggregation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    /// Hour before the evening cutoff
    Morning,
    /// Hour at or after the evening cutoff
    Evening,
    /// No filtering
    #[default]
    All,
}

impl TimeSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::Morning => "morning",
            TimeSlot::Evening => "evening",
            TimeSlot::All => "all",
        }
    }
}

impl FromStr for TimeSlot {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(TimeSlot::Morning),
            "evening" => Ok(TimeSlot::Evening),
            "all" => Ok(TimeSlot::All),
            other => Err(ComputeError::ParseError(format!("unknown time slot: {other}"))),
        }
    }
}

/// Qualitative direction of the recent moving average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "up"),
            TrendDirection::Down => write!(f, "down"),
            TrendDirection::Stable => write!(f, "stable"),
        }
    }
}

/// Change between the latest entry and the entry nearest one week earlier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyChange {
    /// Date of the comparison entry
    pub from_date: NaiveDate,
    /// Date of the latest entry
    pub to_date: NaiveDate,
    /// Latest value minus comparison value
    pub change: f64,
}

/// All-time lowest and highest entries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extremes {
    pub min: SeriesPoint,
    pub max: SeriesPoint,
}

/// Statistics for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    /// Month as `YYYY-MM`
    pub month: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// One projected day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    /// Damped-trend point estimate
    pub predicted: f64,
    /// Point estimate plus the deterministic day-to-day wiggle
    pub simulated: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Forecast output: projected days plus the fluctuation estimate they used
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
    /// Root-mean-square of historical step deltas
    pub daily_swing: f64,
}

impl Forecast {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Headline statistics for a metric's series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub latest: Option<SeriesPoint>,
    pub volatility: Option<f64>,
    pub weekly_change: Option<WeeklyChange>,
    pub extremes: Option<Extremes>,
    pub direction: TrendDirection,
    /// Summary of the month containing the latest entry
    pub current_month: Option<MonthlySummary>,
}

/// How many samples went into an analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounts {
    pub manual: usize,
    pub device: usize,
    /// Entries on the merged timeline
    pub unified: usize,
    /// Days with at least one value in the selected slot
    pub days: usize,
}

/// Everything derived from one field's daily series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesAnalysis {
    pub counts: SampleCounts,
    pub daily: Vec<DailyAverage>,
    pub moving_average: Vec<SeriesPoint>,
    pub trend_line: Vec<SeriesPoint>,
    pub summary: TrendSummary,
    pub forecast: Forecast,
}

/// Analysis of a named metric, including the zone of its latest value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAnalysis {
    pub metric: MetricField,
    pub unit: String,
    pub slot: TimeSlot,
    #[serde(flatten)]
    pub series: SeriesAnalysis,
    pub zone: Option<ZoneReading>,
}

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Complete report payload for the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    #[serde(flatten)]
    pub analysis: MetricAnalysis,
}
