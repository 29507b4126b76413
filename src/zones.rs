//! Health zone classification
//!
//! Stateless threshold lookups for single physiological values.

use crate::types::MetricField;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Visceral fat rating bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisceralFatZone {
    /// Rating up to 9
    Healthy,
    /// Rating 10 to 14
    Elevated,
    /// Rating above 14
    High,
}

impl VisceralFatZone {
    pub fn from_rating(rating: f64) -> Self {
        if rating <= 9.0 {
            Self::Healthy
        } else if rating <= 14.0 {
            Self::Elevated
        } else {
            Self::High
        }
    }
}

/// Resting heart rate bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartRateZone {
    /// Below 60 bpm
    Low,
    /// 60 to 100 bpm
    Normal,
    /// Above 100 bpm
    Elevated,
}

impl HeartRateZone {
    pub fn from_bpm(bpm: f64) -> Self {
        if bpm < 60.0 {
            Self::Low
        } else if bpm <= 100.0 {
            Self::Normal
        } else {
            Self::Elevated
        }
    }
}

/// WHO adult BMI categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BmiZone {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiZone {
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            Self::Underweight
        } else if bmi < 25.0 {
            Self::Normal
        } else if bmi < 30.0 {
            Self::Overweight
        } else {
            Self::Obese
        }
    }
}

/// Zone of a single value, tagged by classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "classifier", content = "zone", rename_all = "snake_case")]
pub enum ZoneReading {
    VisceralFat(VisceralFatZone),
    HeartRate(HeartRateZone),
    Bmi(BmiZone),
}

impl ZoneReading {
    /// Classify `value` for `metric`; `None` for metrics without bands
    pub fn classify(metric: MetricField, value: f64) -> Option<Self> {
        match metric {
            MetricField::VisceralFat => Some(Self::VisceralFat(VisceralFatZone::from_rating(value))),
            MetricField::HeartRate => Some(Self::HeartRate(HeartRateZone::from_bpm(value))),
            MetricField::Bmi => Some(Self::Bmi(BmiZone::from_bmi(value))),
            _ => None,
        }
    }

    /// Zone name without the classifier tag
    pub fn label(&self) -> &'static str {
        match self {
            Self::VisceralFat(VisceralFatZone::Healthy) => "healthy",
            Self::VisceralFat(VisceralFatZone::Elevated) => "elevated",
            Self::VisceralFat(VisceralFatZone::High) => "high",
            Self::HeartRate(HeartRateZone::Low) => "low",
            Self::HeartRate(HeartRateZone::Normal) => "normal",
            Self::HeartRate(HeartRateZone::Elevated) => "elevated",
            Self::Bmi(BmiZone::Underweight) => "underweight",
            Self::Bmi(BmiZone::Normal) => "normal",
            Self::Bmi(BmiZone::Overweight) => "overweight",
            Self::Bmi(BmiZone::Obese) => "obese",
        }
    }
}

impl fmt::Display for ZoneReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
