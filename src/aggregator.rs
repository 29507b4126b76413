//! Daily aggregation
//!
//! Groups unified samples by calendar day, optionally restricted to a
//! time-of-day slot, and averages one numeric field per day.

use crate::stats::round_to;
use crate::types::{DailyAverage, Measurements, SeriesPoint, TimeSlot, UnifiedSample};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::trace;

/// Aggregator for per-day and per-slot series
pub struct Aggregator;

impl Aggregator {
    /// Average `field` per calendar day over the samples in `slot`.
    ///
    /// Days without a single value for the field are omitted. Output is
    /// ordered by date ascending, means rounded to 2 decimals.
    pub fn daily_averages<F>(
        samples: &[UnifiedSample],
        field: F,
        slot: TimeSlot,
        evening_cutoff_hour: u32,
    ) -> Vec<DailyAverage>
    where
        F: Fn(&Measurements) -> Option<f64>,
    {
        let mut by_day: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

        for sample in Self::filter_slot(samples, slot, evening_cutoff_hour) {
            if let Some(value) = field(&sample.values) {
                let entry = by_day.entry(sample.date).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }

        by_day
            .into_iter()
            .map(|(date, (sum, count))| SeriesPoint::new(date, round_to(sum / count as f64, 2)))
            .collect()
    }

    /// Samples falling into `slot`
    pub fn filter_slot(
        samples: &[UnifiedSample],
        slot: TimeSlot,
        evening_cutoff_hour: u32,
    ) -> impl Iterator<Item = &UnifiedSample> {
        samples
            .iter()
            .filter(move |sample| slot_of(&sample.time, evening_cutoff_hour, slot))
    }
}

/// Parse the hour from an `HH:MM` clock string
pub fn parse_hour(time: &str) -> Option<u32> {
    let hour = time.split(':').next()?.trim().parse::<u32>().ok()?;
    (hour < 24).then_some(hour)
}

fn slot_of(time: &str, evening_cutoff_hour: u32, slot: TimeSlot) -> bool {
    if slot == TimeSlot::All {
        return true;
    }

    let is_morning = match parse_hour(time) {
        Some(hour) => hour < evening_cutoff_hour,
        None => {
            // Unreadable device clock: count it as a morning reading
            trace!(time, "unparseable sample time, treating as morning");
            true
        }
    };

    match slot {
        TimeSlot::Morning => is_morning,
        TimeSlot::Evening => !is_morning,
        TimeSlot::All => true,
    }
}
