use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};

use crate::bucket::{align_down, day_key};
use crate::peaks::{PeakAccumulator, Peaks};
use crate::reading::{Channel, Reading};

/// Inclusive time window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// A window of `days` calendar days ending at `end`: `[end - (days - 1), end]`.
    /// With `days = 30` this is the usual monthly report window.
    /// `None` when the start falls outside the representable range.
    pub fn trailing_days(end: DateTime<Utc>, days: u32) -> Option<Self> {
        let back = Duration::days(i64::from(days.saturating_sub(1)));
        Some(Self::new(end.checked_sub_signed(back)?, end))
    }

    /// The full `days * 24h` before `end`: `[end - days, end]`.
    pub fn lookback_days(end: DateTime<Utc>, days: u32) -> Option<Self> {
        let back = Duration::days(i64::from(days));
        Some(Self::new(end.checked_sub_signed(back)?, end))
    }

    /// An inverted window contains nothing.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// Peaks for one day bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct DayPeaks {
    pub day: String,
    pub peaks: Peaks,
}

/// Output of one [`aggregate`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    /// Day buckets in the order they were first seen while scanning input.
    days: Vec<DayPeaks>,
    all_time: Peaks,
    all_time_ever: Peaks,
    in_window: usize,
}

impl AggregationResult {
    pub fn days(&self) -> &[DayPeaks] {
        &self.days
    }

    #[cfg(test)]
    pub fn day(&self, key: &str) -> Option<Peaks> {
        self.days.iter().find(|d| d.day == key).map(|d| d.peaks)
    }

    /// Peaks across every reading inside the window.
    pub fn all_time(&self) -> Peaks {
        self.all_time
    }

    /// Peaks across every reading supplied, ignoring the window.
    pub fn all_time_ever(&self) -> Peaks {
        self.all_time_ever
    }

    /// Number of readings that fell inside the window.
    pub fn reading_count(&self) -> usize {
        self.in_window
    }
}

/// Reduce readings into per-day and all-time peaks.
///
/// Input order does not matter for the values, only for the order of
/// [`AggregationResult::days`]. Readings outside `window` only feed the
/// unscoped all-time-ever peaks.
pub fn aggregate<I>(records: I, window: Window) -> AggregationResult
where
    I: IntoIterator,
    I::Item: Borrow<Reading>,
{
    let mut days: Vec<(String, PeakAccumulator)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut all_time = PeakAccumulator::new();
    let mut all_time_ever = PeakAccumulator::new();
    let mut in_window = 0;

    for record in records {
        let reading = record.borrow();
        all_time_ever.observe(reading);
        if !window.contains(reading.timestamp) {
            continue;
        }
        in_window += 1;

        let slot = *index
            .entry(day_key(reading.timestamp))
            .or_insert_with_key(|key| {
                days.push((key.clone(), PeakAccumulator::new()));
                days.len() - 1
            });
        days[slot].1.observe(reading);
        all_time.observe(reading);
    }

    AggregationResult {
        days: days
            .into_iter()
            .map(|(day, acc)| DayPeaks {
                day,
                peaks: acc.snapshot(),
            })
            .collect(),
        all_time: all_time.snapshot(),
        all_time_ever: all_time_ever.snapshot(),
        in_window,
    }
}

/// Reduce raw readings to one peak snapshot per owner and interval.
///
/// Each snapshot is stamped with its interval start. Output is sorted by
/// time, then owner.
pub fn compact<I>(records: I, interval: Duration) -> Vec<Reading>
where
    I: IntoIterator,
    I::Item: Borrow<Reading>,
{
    let mut buckets: BTreeMap<(DateTime<Utc>, String), PeakAccumulator> = BTreeMap::new();
    for record in records {
        let reading = record.borrow();
        let start = align_down(reading.timestamp, interval);
        buckets
            .entry((start, reading.user_id.clone()))
            .or_default()
            .observe(reading);
    }

    buckets
        .into_iter()
        .map(|((start, user_id), acc)| {
            let peaks = acc.snapshot();
            let mut saved = Reading::new(user_id, start);
            for channel in Channel::ALL {
                saved.set_channel(channel, Some(peaks.get(channel)));
            }
            saved
        })
        .collect()
}
