//! Engine configuration
//!
//! Every tunable constant of the engine lives here with its default, so that
//! alternate parameterizations can be exercised without touching the math.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Default trailing window for the moving average (entries)
pub const DEFAULT_MOVING_AVERAGE_WINDOW: usize = 7;

/// Default number of most recent entries used for volatility
pub const DEFAULT_VOLATILITY_WINDOW: usize = 14;

/// Default forecast horizon (days)
pub const DEFAULT_FORECAST_DAYS: usize = 14;

/// Default hour at which the evening slot starts
pub const DEFAULT_EVENING_CUTOFF_HOUR: u32 = 15;

/// Longest accepted forecast horizon (days)
pub const MAX_FORECAST_DAYS: usize = 3650;

/// Longest accepted look-back for the weekly comparison (days)
pub const MAX_WEEKLY_LOOKBACK_DAYS: i64 = 366;

/// Tunables for every engine stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Trailing window of the moving average
    pub moving_average_window: usize,
    /// Number of most recent entries used for volatility
    pub volatility_window: usize,
    /// Number of days to project
    pub forecast_days: usize,
    /// Level smoothing weight
    pub alpha: f64,
    /// Trend smoothing weight
    pub beta: f64,
    /// Trend damping factor
    pub phi: f64,
    /// Multiplier applied to the swing when sizing the confidence band
    pub confidence_z: f64,
    /// Maximum half-width of the confidence band
    pub band_cap: f64,
    /// Fluctuation estimate used when the history has no step deltas
    pub default_swing: f64,
    /// Clock hour (0-23) at which samples count as evening
    pub evening_cutoff_hour: u32,
    /// Minimum moving-average change, in metric units, to call a trend
    pub trend_threshold: f64,
    /// Number of trailing moving-average points compared for the trend
    pub trend_lookback: usize,
    /// Target distance in days for the weekly comparison
    pub weekly_lookback_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            moving_average_window: DEFAULT_MOVING_AVERAGE_WINDOW,
            volatility_window: DEFAULT_VOLATILITY_WINDOW,
            forecast_days: DEFAULT_FORECAST_DAYS,
            alpha: 0.4,
            beta: 0.2,
            phi: 0.95,
            confidence_z: 1.96,
            band_cap: 2.0,
            default_swing: 0.3,
            evening_cutoff_hour: DEFAULT_EVENING_CUTOFF_HOUR,
            trend_threshold: 0.3,
            trend_lookback: 3,
            weekly_lookback_days: 7,
        }
    }
}

impl EngineConfig {
    /// Check that every parameter is inside its usable range
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.moving_average_window == 0 {
            return Err(invalid("moving_average_window must be at least 1"));
        }
        if self.volatility_window == 0 {
            return Err(invalid("volatility_window must be at least 1"));
        }
        if self.trend_lookback < 2 {
            return Err(invalid("trend_lookback must be at least 2"));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(invalid("alpha must be in (0, 1]"));
        }
        if !(self.beta > 0.0 && self.beta <= 1.0) {
            return Err(invalid("beta must be in (0, 1]"));
        }
        if !(self.phi > 0.0 && self.phi < 1.0) {
            return Err(invalid("phi must be in (0, 1)"));
        }
        if !(self.confidence_z >= 0.0) || !(self.band_cap >= 0.0) {
            return Err(invalid("confidence_z and band_cap must be non-negative"));
        }
        if !(self.default_swing >= 0.0) {
            return Err(invalid("default_swing must be non-negative"));
        }
        if !(self.trend_threshold >= 0.0) {
            return Err(invalid("trend_threshold must be non-negative"));
        }
        if self.evening_cutoff_hour > 23 {
            return Err(invalid("evening_cutoff_hour must be between 0 and 23"));
        }
        if self.forecast_days > MAX_FORECAST_DAYS {
            return Err(invalid(&format!(
                "forecast_days must be at most {MAX_FORECAST_DAYS}"
            )));
        }
        if self.weekly_lookback_days <= 0 || self.weekly_lookback_days > MAX_WEEKLY_LOOKBACK_DAYS {
            return Err(invalid(&format!(
                "weekly_lookback_days must be between 1 and {MAX_WEEKLY_LOOKBACK_DAYS}"
            )));
        }
        Ok(())
    }

    /// Load and validate a configuration from JSON. Missing keys take defaults.
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn invalid(msg: &str) -> ComputeError {
    ComputeError::InvalidConfig(msg.to_string())
}
