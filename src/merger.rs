//! Source merging
//!
//! Reconciles manual entries and device readings into one ordered timeline.
//! Samples are keyed by their exact `(date, time)` pair; a device reading
//! replaces a manual entry at the same key. Entries a few minutes apart are
//! kept as distinct samples.

use crate::types::{Measurements, Sample, Source, UnifiedSample};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Merger for building the unified timeline
pub struct SourceMerger;

impl SourceMerger {
    /// Merge manual and device samples, sorted ascending by `(date, time)`.
    ///
    /// Samples whose primary value is missing are dropped before insertion.
    /// The source recorded on each output entry is the collection it came from.
    pub fn merge<F>(manual: &[Sample], device: &[Sample], primary: F) -> Vec<UnifiedSample>
    where
        F: Fn(&Measurements) -> Option<f64>,
    {
        let mut timeline: BTreeMap<(NaiveDate, String), UnifiedSample> = BTreeMap::new();
        let mut dropped = 0usize;

        for (samples, source) in [(manual, Source::Manual), (device, Source::Device)] {
            for sample in samples {
                if primary(&sample.values).is_none() {
                    dropped += 1;
                    continue;
                }

                let time = sample.time_or_default().to_string();
                let key = (sample.date, time.clone());
                if let Some(previous) = timeline.get(&key) {
                    trace!(
                        date = %sample.date,
                        time = %time,
                        replaced = previous.source.as_str(),
                        by = source.as_str(),
                        "merge key collision"
                    );
                }

                timeline.insert(
                    key,
                    UnifiedSample {
                        date: sample.date,
                        time,
                        source,
                        values: sample.values,
                    },
                );
            }
        }

        debug!(
            manual = manual.len(),
            device = device.len(),
            dropped,
            unified = timeline.len(),
            "merged sample sources"
        );

        timeline.into_values().collect()
    }

    /// Merge a single mixed collection, splitting it by each sample's source tag
    pub fn merge_tagged<F>(samples: &[Sample], primary: F) -> Vec<UnifiedSample>
    where
        F: Fn(&Measurements) -> Option<f64>,
    {
        let (manual, device): (Vec<Sample>, Vec<Sample>) = samples
            .iter()
            .cloned()
            .partition(|sample| sample.source == Source::Manual);
        Self::merge(&manual, &device, primary)
    }
}
