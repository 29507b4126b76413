//! Trend statistics
//!
//! Rolling and summary statistics over a date-sorted series of one field:
//! - Trailing moving average
//! - Volatility of the most recent entries
//! - Week-over-week change with nearest-date matching
//! - All-time extremes and monthly summaries
//! - Qualitative trend direction

use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::types::{Extremes, MonthlySummary, SeriesPoint, TrendDirection, TrendSummary, WeeklyChange};
use chrono::{Datelike, Duration, NaiveDate};

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Calculator for series statistics
pub struct TrendStats;

impl TrendStats {
    /// Trailing moving average, one point per input entry.
    ///
    /// The first entries average over however many values exist so far.
    pub fn moving_average(points: &[SeriesPoint], window: usize) -> Vec<SeriesPoint> {
        let window = window.max(1);
        let mut sum = 0.0;

        points
            .iter()
            .enumerate()
            .map(|(i, point)| {
                sum += point.value;
                if i >= window {
                    sum -= points[i - window].value;
                }
                let len = (i + 1).min(window);
                SeriesPoint::new(point.date, round_to(sum / len as f64, 2))
            })
            .collect()
    }

    /// Population standard deviation of the last `count` entries
    pub fn volatility(points: &[SeriesPoint], count: usize) -> Option<f64> {
        if points.is_empty() {
            return None;
        }
        let recent = &points[points.len().saturating_sub(count.max(1))..];
        let n = recent.len() as f64;
        let mean = recent.iter().map(|p| p.value).sum::<f64>() / n;
        let variance = recent.iter().map(|p| (p.value - mean).powi(2)).sum::<f64>() / n;
        Some(round_to(variance.sqrt(), 2))
    }

    /// Latest value minus the entry closest to `lookback_days` before it.
    ///
    /// Returns `None` with fewer than two entries, when the closest entry is
    /// the latest one itself, or when the target date falls off the calendar.
    pub fn weekly_change(points: &[SeriesPoint], lookback_days: i64) -> Option<WeeklyChange> {
        if points.len() < 2 {
            return None;
        }
        let last_index = points.len() - 1;
        let latest = points[last_index];
        let target = latest
            .date
            .checked_sub_signed(Duration::try_days(lookback_days)?)?;

        let mut nearest = 0;
        let mut best = i64::MAX;
        for (i, point) in points.iter().enumerate() {
            let distance = (point.date - target).num_days().abs();
            if distance < best {
                best = distance;
                nearest = i;
            }
        }

        if nearest == last_index {
            return None;
        }

        let reference = points[nearest];
        Some(WeeklyChange {
            from_date: reference.date,
            to_date: latest.date,
            change: round_to(latest.value - reference.value, 2),
        })
    }

    /// Lowest and highest entries; the first occurrence wins ties
    pub fn extremes(points: &[SeriesPoint]) -> Option<Extremes> {
        let first = *points.first()?;
        let (min, max) = points.iter().skip(1).fold((first, first), |(min, max), p| {
            (
                if p.value < min.value { *p } else { min },
                if p.value > max.value { *p } else { max },
            )
        });
        Some(Extremes { min, max })
    }

    /// Mean, min, max and count for entries in `month` (`YYYY-MM`)
    pub fn monthly_summary(
        points: &[SeriesPoint],
        month: &str,
    ) -> Result<Option<MonthlySummary>, ComputeError> {
        let first_day = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
            .map_err(|e| ComputeError::DateParseError(format!("{month}: {e}")))?;

        let values: Vec<f64> = points
            .iter()
            .filter(|p| p.date.year() == first_day.year() && p.date.month() == first_day.month())
            .map(|p| p.value)
            .collect();

        if values.is_empty() {
            return Ok(None);
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(Some(MonthlySummary {
            month: month_key(first_day),
            mean: round_to(mean, 2),
            min,
            max,
            count,
        }))
    }

    /// Direction of the moving average over its last `lookback` points
    pub fn trend_direction(
        points: &[SeriesPoint],
        window: usize,
        lookback: usize,
        threshold: f64,
    ) -> TrendDirection {
        let averaged: Vec<f64> = Self::moving_average(points, window)
            .into_iter()
            .map(|p| p.value)
            .collect();
        classify_trend(&averaged, lookback, threshold)
    }

    /// Compute every headline statistic with the configured windows
    pub fn summarize(points: &[SeriesPoint], config: &EngineConfig) -> TrendSummary {
        let latest = points.last().copied();
        let current_month = latest.and_then(|p| {
            Self::monthly_summary(points, &month_key(p.date))
                .ok()
                .flatten()
        });

        TrendSummary {
            latest,
            volatility: Self::volatility(points, config.volatility_window),
            weekly_change: Self::weekly_change(points, config.weekly_lookback_days),
            extremes: Self::extremes(points),
            direction: Self::trend_direction(
                points,
                config.moving_average_window,
                config.trend_lookback,
                config.trend_threshold,
            ),
            current_month,
        }
    }
}

/// Compare the first and last of the trailing `lookback` moving-average values.
///
/// Too few values to compare means `Stable`.
pub fn classify_trend(moving_average: &[f64], lookback: usize, threshold: f64) -> TrendDirection {
    let lookback = lookback.max(2);
    if moving_average.len() < lookback {
        return TrendDirection::Stable;
    }
    let tail = &moving_average[moving_average.len() - lookback..];
    let delta = tail[tail.len() - 1] - tail[0];

    if delta > threshold {
        TrendDirection::Up
    } else if delta < -threshold {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    }
}

/// `YYYY-MM` key of a date
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}
