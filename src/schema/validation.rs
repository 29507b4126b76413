//! Per-sample validation

use crate::aggregator::parse_hour;
use crate::types::{MetricField, Sample};
use serde::{Deserialize, Serialize};

impl Sample {
    /// Every issue found on the sample, errors and warnings alike.
    ///
    /// Type errors (non-numeric values, malformed dates) never reach this
    /// point; they fail during parsing.
    pub fn issues(&self) -> Vec<ValidationError> {
        let mut issues = Vec::new();

        if self.values.is_empty() {
            issues.push(ValidationError::NoMeasurement);
        }

        issues.extend(
            MetricField::ALL
                .into_iter()
                .filter(|field| field.value(&self.values).is_some_and(|v| v < 0.0))
                .map(|field| ValidationError::NegativeValue {
                    field: field.as_str().to_string(),
                }),
        );

        if let Some(time) = &self.time {
            if !is_clock_time(time) {
                issues.push(ValidationError::InvalidTime(time.clone()));
            }
        }

        issues
    }

    /// Fail on the first error-class issue. Warnings never fail a sample.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self
            .issues()
            .into_iter()
            .find(|issue| issue.severity() == Severity::Error)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn is_clock_time(time: &str) -> bool {
    let Some((hours, minutes)) = time.split_once(':') else {
        return false;
    };
    parse_hour(hours).is_some()
        && hours.len() == 2
        && minutes.len() == 2
        && minutes.parse::<u32>().is_ok_and(|m| m < 60)
}

/// How much a validation issue matters to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The sample drops out of, or distorts, every series
    Error,
    /// The engine still uses the sample under a fallback rule
    Warning,
}

/// Validation errors for samples
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Sample carries no measurement")]
    NoMeasurement,

    #[error("Negative value for {field}")]
    NegativeValue { field: String },

    #[error("Time is not HH:MM: {0} (counted as a morning reading)")]
    InvalidTime(String),
}

impl ValidationError {
    pub fn severity(&self) -> Severity {
        match self {
            ValidationError::NoMeasurement | ValidationError::NegativeValue { .. } => {
                Severity::Error
            }
            ValidationError::InvalidTime(_) => Severity::Warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Source;
    use chrono::NaiveDate;

    fn sample(time: Option<&str>) -> Sample {
        Sample::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), time, Source::Manual)
    }

    #[test]
    fn test_valid_sample() {
        assert!(sample(Some("07:45")).with(MetricField::Weight, 80.0).validate().is_ok());
        assert!(sample(None).with(MetricField::HeartRate, 58.0).validate().is_ok());
    }

    #[test]
    fn test_no_measurement() {
        assert_eq!(sample(Some("07:45")).validate(), Err(ValidationError::NoMeasurement));
    }

    #[test]
    fn test_negative_value() {
        let result = sample(None)
            .with(MetricField::Weight, 80.0)
            .with(MetricField::BodyFat, -3.0)
            .validate();
        assert_eq!(
            result,
            Err(ValidationError::NegativeValue {
                field: "body_fat".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_time_is_a_warning() {
        for time in ["7:45", "25:00", "07:60", "0745", "morning"] {
            let sample = sample(Some(time)).with(MetricField::Weight, 80.0);
            assert_eq!(
                sample.issues(),
                vec![ValidationError::InvalidTime(time.to_string())]
            );
            assert_eq!(sample.issues()[0].severity(), Severity::Warning);
            assert!(sample.validate().is_ok());
        }
    }

    #[test]
    fn test_all_issues_reported() {
        let sample = sample(Some("7am"))
            .with(MetricField::Weight, -80.0)
            .with(MetricField::BodyFat, -3.0);

        assert_eq!(
            sample.issues(),
            vec![
                ValidationError::NegativeValue {
                    field: "weight".to_string()
                },
                ValidationError::NegativeValue {
                    field: "body_fat".to_string()
                },
                ValidationError::InvalidTime("7am".to_string()),
            ]
        );
        assert_eq!(
            sample.validate(),
            Err(ValidationError::NegativeValue {
                field: "weight".to_string()
            })
        );
    }
}
