//! Reading samples from JSON and NDJSON

use super::{Severity, ValidationError};
use crate::error::ComputeError;
use crate::types::Sample;

/// Reader for sample collections
pub struct SampleReader;

impl SampleReader {
    /// Parse a JSON string containing an array of samples
    pub fn parse_array(json: &str) -> Result<Vec<Sample>, ComputeError> {
        let samples: Vec<Sample> = serde_json::from_str(json)?;
        Ok(samples)
    }

    /// Parse NDJSON (newline-delimited JSON) containing one sample per line
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<Sample>, ComputeError> {
        let mut samples = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Sample>(trimmed) {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(samples)
    }

    /// Parse either format, deciding by the first non-blank character
    pub fn parse(input: &str) -> Result<Vec<Sample>, ComputeError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Validate a batch of samples, returning one entry per issue found
    pub fn validate_samples(samples: &[Sample]) -> Vec<ValidationResult> {
        samples
            .iter()
            .enumerate()
            .flat_map(|(index, sample)| {
                sample.issues().into_iter().map(move |issue| ValidationResult {
                    index,
                    severity: issue.severity(),
                    issue,
                })
            })
            .collect()
    }
}

/// One issue found on one sample
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub index: usize,
    pub severity: Severity,
    pub issue: ValidationError,
}

impl ValidationResult {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
