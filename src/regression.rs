//! Linear trend line
//!
//! Ordinary least-squares fit of value against sequence index. Using the
//! index instead of the date keeps long logging gaps from dominating the
//! slope.

use crate::stats::round_to;
use crate::types::SeriesPoint;
use serde::{Deserialize, Serialize};

/// Slope and intercept of a fitted line over indices `0..n`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Fit a line through `(i, values[i])`. Needs at least two values.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }

        let n = values.len() as f64;
        let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
        let sum_y: f64 = values.iter().sum();
        let sum_xy: f64 = values.iter().enumerate().map(|(i, &y)| i as f64 * y).sum();
        let sum_x2: f64 = (0..values.len()).map(|i| (i as f64).powi(2)).sum();

        let denominator = n * sum_x2 - sum_x.powi(2);
        if denominator.abs() < f64::EPSILON {
            return None;
        }

        let slope = (n * sum_xy - sum_x * sum_y) / denominator;
        let intercept = (sum_y - slope * sum_x) / n;
        Some(Self { slope, intercept })
    }

    pub fn at(&self, index: usize) -> f64 {
        self.intercept + self.slope * index as f64
    }
}

/// Fitted value for every entry of a chronologically sorted series,
/// rounded to 2 decimals. Empty when fewer than two entries exist.
pub fn fit_trend_line(points: &[SeriesPoint]) -> Vec<SeriesPoint> {
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    match LinearFit::from_values(&values) {
        Some(fit) => points
            .iter()
            .enumerate()
            .map(|(i, p)| SeriesPoint::new(p.date, round_to(fit.at(i), 2)))
            .collect(),
        None => Vec::new(),
    }
}
