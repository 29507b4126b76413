//! Short-horizon forecasting
//!
//! Damped double exponential smoothing (damped Holt) over the historical
//! series, projected forward day by day. Each projected day carries:
//! - a point estimate from the damped level + trend
//! - a simulated value with a fixed, input-deterministic wiggle
//! - a confidence band sized from the historical step-to-step swing
//!
//! No randomness is involved: the same history always yields the same output.

use crate::config::{EngineConfig, MAX_FORECAST_DAYS};
use crate::stats::round_to;
use crate::types::{Forecast, ForecastPoint, SeriesPoint};
use chrono::Duration;
use tracing::debug;

/// Minimum number of historical entries needed to forecast
pub const MIN_HISTORY: usize = 3;

/// Number of initial steps averaged for the starting trend
const TREND_INIT_STEPS: usize = 6;

/// Level and trend after running the smoothing recurrence over the history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingState {
    pub level: f64,
    pub trend: f64,
}

impl SmoothingState {
    /// Run the damped Holt recurrence once over `values` (needs two or more).
    pub fn fit(values: &[f64], alpha: f64, beta: f64, phi: f64) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }

        let init_steps = TREND_INIT_STEPS.min(values.len() - 1);
        let mut level = values[0];
        let mut trend = (values[init_steps] - values[0]) / init_steps as f64;

        for &y in &values[1..] {
            let prev_level = level;
            level = alpha * y + (1.0 - alpha) * (level + phi * trend);
            trend = beta * (level - prev_level) + (1.0 - beta) * phi * trend;
        }

        Some(Self { level, trend })
    }
}

/// Root-mean-square of consecutive differences, or `default` without any
pub fn daily_swing(values: &[f64], default: f64) -> f64 {
    if values.len() < 2 {
        return default;
    }
    let squares: Vec<f64> = values.windows(2).map(|w| (w[1] - w[0]).powi(2)).collect();
    (squares.iter().sum::<f64>() / squares.len() as f64).sqrt()
}

/// Deterministic day-to-day wiggle shape for step `k`, in [-1, 1]
fn oscillation(k: usize) -> f64 {
    let k = k as f64;
    (k * 1.3 + (k * 0.7).cos()).sin()
}

/// Pull a rounded band edge toward `center` until it lies within `cap` of it.
///
/// Rounding to cents can leave the edge a few ulps past the cap.
fn capped_bound(center: f64, bound: f64, cap: f64) -> f64 {
    let mut bound = bound;
    while (bound - center).abs() > cap {
        bound = step_toward(bound, center);
    }
    bound
}

/// Adjacent representable value from `x` in the direction of `target`
fn step_toward(x: f64, target: f64) -> f64 {
    if x == target {
        return x;
    }
    if x == 0.0 {
        let tiny = f64::from_bits(1);
        return if target > 0.0 { tiny } else { -tiny };
    }
    // Moving toward zero shrinks the magnitude, i.e. the bit pattern
    let toward_zero = (x > target) == (x > 0.0);
    if toward_zero {
        f64::from_bits(x.to_bits() - 1)
    } else {
        f64::from_bits(x.to_bits() + 1)
    }
}

/// Forecaster over a single field's history
pub struct ForecastEngine;

impl ForecastEngine {
    /// Forecast `config.forecast_days` days past the last historical date
    pub fn forecast(points: &[SeriesPoint], config: &EngineConfig) -> Forecast {
        Self::forecast_days(points, config.forecast_days, config)
    }

    /// Forecast `days` days past the last historical date.
    ///
    /// With fewer than [`MIN_HISTORY`] entries the forecast is empty and the
    /// swing is zero.
    pub fn forecast_days(points: &[SeriesPoint], days: usize, config: &EngineConfig) -> Forecast {
        if points.len() < MIN_HISTORY {
            debug!(history = points.len(), "not enough history to forecast");
            return Forecast::default();
        }

        let mut history = points.to_vec();
        history.sort_by_key(|p| p.date);
        let values: Vec<f64> = history.iter().map(|p| p.value).collect();

        let swing = daily_swing(&values, config.default_swing);
        let state = match SmoothingState::fit(&values, config.alpha, config.beta, config.phi) {
            Some(state) => state,
            None => return Forecast::default(),
        };
        let last_date = history[history.len() - 1].date;

        let mut sum_phi = 0.0;
        let mut points = Vec::with_capacity(days.min(MAX_FORECAST_DAYS));

        for k in 1..=days {
            let Some(date) = Duration::try_days(k as i64)
                .and_then(|offset| last_date.checked_add_signed(offset))
            else {
                debug!(days = k - 1, "forecast reached the end of the calendar");
                break;
            };

            sum_phi += config.phi.powi(k as i32);

            let predicted = round_to(state.level + sum_phi * state.trend, 1);
            let simulated = round_to(predicted + swing * oscillation(k), 1);
            let margin = (config.confidence_z * swing * (k as f64).sqrt()).min(config.band_cap);

            points.push(ForecastPoint {
                date,
                predicted,
                simulated,
                lower: capped_bound(predicted, round_to(predicted - margin, 2), config.band_cap),
                upper: capped_bound(predicted, round_to(predicted + margin, 2), config.band_cap),
            });
        }

        debug!(
            history = values.len(),
            days,
            level = state.level,
            trend = state.trend,
            swing,
            "forecast computed"
        );

        Forecast {
            points,
            daily_swing: round_to(swing, 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn series(values: &[f64]) -> Vec<SeriesPoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| SeriesPoint::new(start + Duration::days(i as i64), *v))
            .collect()
    }

    fn history() -> Vec<SeriesPoint> {
        series(&[
            80.0, 79.7, 79.9, 79.4, 79.2, 79.5, 79.0, 78.8, 79.1, 78.6, 78.5, 78.7,
        ])
    }

    #[test]
    fn test_three_samples_one_day() {
        let forecast =
            ForecastEngine::forecast_days(&series(&[70.0, 70.2, 70.4]), 1, &EngineConfig::default());

        assert_eq!(forecast.points.len(), 1);
        let point = forecast.points[0];
        assert_eq!(point.date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert!(point.predicted.is_finite());
        assert!(point.simulated.is_finite());
        assert!(point.lower <= point.predicted && point.predicted <= point.upper);
        assert!((forecast.daily_swing - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_history() {
        let forecast = ForecastEngine::forecast(&series(&[70.0, 70.2]), &EngineConfig::default());
        assert!(forecast.is_empty());
        assert_eq!(forecast.daily_swing, 0.0);
    }

    #[test]
    fn test_deterministic() {
        let config = EngineConfig::default();
        let first = ForecastEngine::forecast(&history(), &config);
        let second = ForecastEngine::forecast(&history(), &config);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let config = EngineConfig::default();
        let mut shuffled = history();
        shuffled.reverse();

        assert_eq!(
            ForecastEngine::forecast(&shuffled, &config),
            ForecastEngine::forecast(&history(), &config)
        );
    }

    #[test]
    fn test_default_horizon_and_dates() {
        let forecast = ForecastEngine::forecast(&history(), &EngineConfig::default());

        assert_eq!(forecast.points.len(), 14);
        let last = NaiveDate::from_ymd_opt(2024, 1, 12).unwrap();
        for (k, point) in forecast.points.iter().enumerate() {
            assert_eq!(point.date, last + Duration::days(k as i64 + 1));
        }
    }

    #[test]
    fn test_confidence_band_sanity() {
        let volatile = series(&[80.0, 84.0, 77.0, 86.0, 75.0, 88.0, 74.0]);
        for points in [history(), volatile] {
            let forecast = ForecastEngine::forecast_days(&points, 60, &EngineConfig::default());
            for point in &forecast.points {
                assert!(point.lower <= point.predicted);
                assert!(point.predicted <= point.upper);
                assert!(point.upper - point.predicted <= 2.0);
                assert!(point.predicted - point.lower <= 2.0);
            }
        }
    }

    #[test]
    fn test_band_edges_never_pass_cap() {
        let config = EngineConfig {
            band_cap: 0.37,
            ..Default::default()
        };
        let jumpy = series(&[70.3, 71.9, 69.7, 72.1, 70.0, 71.7]);
        let forecast = ForecastEngine::forecast_days(&jumpy, 30, &config);

        for point in &forecast.points {
            assert!(point.upper - point.predicted <= config.band_cap);
            assert!(point.predicted - point.lower <= config.band_cap);
            assert!((point.upper - point.predicted - config.band_cap).abs() < 0.01);
        }
    }

    #[test]
    fn test_capped_bound_steps_inside() {
        let center = 70.4;
        let bound = capped_bound(center, 72.4 + 1e-12, 2.0);
        assert!(bound - center <= 2.0);
        assert!((bound - 72.4).abs() < 1e-9);

        let bound = capped_bound(-0.1, -2.1 - 1e-12, 2.0);
        assert!(-0.1 - bound <= 2.0);
    }

    #[test]
    fn test_history_ending_at_calendar_limit() {
        let end = NaiveDate::MAX;
        let points = vec![
            SeriesPoint::new(end - Duration::days(2), 70.0),
            SeriesPoint::new(end - Duration::days(1), 70.2),
            SeriesPoint::new(end, 70.4),
        ];

        let forecast = ForecastEngine::forecast_days(&points, 1, &EngineConfig::default());
        assert!(forecast.points.is_empty());

        let near_end = vec![
            SeriesPoint::new(end - Duration::days(4), 70.0),
            SeriesPoint::new(end - Duration::days(3), 70.2),
            SeriesPoint::new(end - Duration::days(2), 70.4),
        ];
        let forecast = ForecastEngine::forecast_days(&near_end, 14, &EngineConfig::default());
        assert_eq!(forecast.points.len(), 2);
        assert_eq!(forecast.points[1].date, end);
    }

    #[test]
    fn test_band_widens_with_horizon() {
        let forecast = ForecastEngine::forecast(&history(), &EngineConfig::default());
        let widths: Vec<f64> = forecast.points.iter().map(|p| p.upper - p.lower).collect();

        for pair in widths.windows(2) {
            assert!(pair[1] >= pair[0] - 0.011);
        }
        assert!(widths[widths.len() - 1] > widths[0]);
    }

    #[test]
    fn test_damped_trend_flattens() {
        let config = EngineConfig::default();
        let rising = series(&[60.0, 61.0, 62.0, 63.0, 64.0, 65.0, 66.0, 67.0]);
        let values: Vec<f64> = rising.iter().map(|p| p.value).collect();
        let state = SmoothingState::fit(&values, config.alpha, config.beta, config.phi).unwrap();

        let forecast = ForecastEngine::forecast_days(&rising, 400, &config);
        let ceiling = state.level + state.trend * config.phi / (1.0 - config.phi);

        let late = &forecast.points[forecast.points.len() - 10..];
        for point in late {
            assert!(point.predicted <= ceiling + 0.05);
        }
        assert!((late[9].predicted - late[0].predicted).abs() <= 0.1);
        assert!(forecast.points[0].predicted < late[0].predicted);
    }

    #[test]
    fn test_daily_swing() {
        assert!((daily_swing(&[70.0, 70.2, 70.4], 0.3) - 0.2).abs() < 1e-9);
        assert!((daily_swing(&[1.0, 4.0, 0.0], 0.3) - (12.5f64).sqrt()).abs() < 1e-9);
        assert_eq!(daily_swing(&[70.0], 0.3), 0.3);
    }

    #[test]
    fn test_flat_history_stays_flat() {
        let forecast = ForecastEngine::forecast(&series(&[70.0; 10]), &EngineConfig::default());

        for point in &forecast.points {
            assert_eq!(point.predicted, 70.0);
            assert_eq!(point.simulated, 70.0);
            assert_eq!(point.lower, 70.0);
            assert_eq!(point.upper, 70.0);
        }
        assert_eq!(forecast.daily_swing, 0.0);
    }

    #[test]
    fn test_simulated_stays_within_one_swing() {
        let forecast = ForecastEngine::forecast(&history(), &EngineConfig::default());
        for point in &forecast.points {
            assert!((point.simulated - point.predicted).abs() <= forecast.daily_swing + 0.1);
        }
    }
}
