use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::info;

use crate::aggregate::{self, Window};
use crate::bucket::align_down;
use crate::config::{CompactArgs, ReportArgs};
use crate::document::Report;
use crate::reading::{Reading, RecordKind};
use crate::store::ReadingStore;

/// Build the peak report for the `args.days` calendar days ending at `now`.
///
/// The owner's full history is aggregated so the report also carries peaks
/// across all stored readings. Fails when nothing falls inside the window.
pub fn build_report(store: &ReadingStore, args: &ReportArgs, now: DateTime<Utc>) -> Result<Report> {
    let window = Window::trailing_days(now, args.days)
        .with_context(|| format!("A {}-day window is out of range", args.days))?;
    let readings = store.load(args.kind, &args.user)?;
    if !readings.iter().any(|r| window.contains(r.timestamp)) {
        bail!("No readings found in the last {} days", args.days);
    }

    let result = aggregate::aggregate(&readings, window);
    info!(
        "Aggregated {} reading(s) into {} day bucket(s) for {}",
        result.reading_count(),
        result.days().len(),
        args.user
    );
    Ok(Report::new(&args.user, args.days, window, &result))
}

/// Append saved snapshots for every closed interval after the newest one
/// already saved. Returns the number of snapshots written.
pub fn compact_saved(store: &ReadingStore, args: &CompactArgs, now: DateTime<Utc>) -> Result<usize> {
    let interval = Duration::minutes(i64::from(args.interval_minutes.max(1)));
    let window = Window::lookback_days(now, args.days)
        .with_context(|| format!("A {}-day window is out of range", args.days))?;
    let last_saved = store
        .latest(RecordKind::Saved, &args.user)?
        .map(|r| r.timestamp);

    let raw = store.in_window(RecordKind::Raw, &args.user, window)?;
    let pending: Vec<&Reading> = raw
        .iter()
        .filter(|r| {
            let start = align_down(r.timestamp, interval);
            let closed = start + interval <= now;
            closed && last_saved.map_or(true, |last| start > last)
        })
        .collect();

    let saved = aggregate::compact(pending.iter().copied(), interval);
    store.append_all(RecordKind::Saved, &saved)?;
    info!(
        "Compacted {} of {} raw reading(s) into {} snapshot(s) for {}",
        pending.len(),
        raw.len(),
        saved.len(),
        args.user
    );
    Ok(saved.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportFormat;
    use crate::reading::{Channel, Phase};

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn reading(at: &str, v1: f64) -> Reading {
        let mut r = Reading::new("u1", ts(at));
        r.voltage_p1 = Some(v1);
        r
    }

    fn report_args(days: u32) -> ReportArgs {
        ReportArgs {
            user: "u1".to_string(),
            days,
            kind: RecordKind::Raw,
            format: ReportFormat::Text,
            output: None,
        }
    }

    fn compact_args() -> CompactArgs {
        CompactArgs {
            user: "u1".to_string(),
            interval_minutes: 15,
            days: 1,
        }
    }

    #[test]
    fn report_without_readings_in_window_fails() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ReadingStore::open(dir.path())?;
        let now = ts("2024-06-30T12:00:00Z");

        let err = build_report(&store, &report_args(30), now).unwrap_err();
        assert_eq!(err.to_string(), "No readings found in the last 30 days");

        store.append(RecordKind::Raw, &reading("2024-05-01T00:00:00Z", 230.0))?;
        assert!(build_report(&store, &report_args(30), now).is_err());
        Ok(())
    }

    #[test]
    fn report_covers_window_and_full_history() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ReadingStore::open(dir.path())?;
        store.append_all(
            RecordKind::Raw,
            &[
                reading("2024-05-01T00:00:00Z", 250.0),
                reading("2024-06-10T08:00:00Z", 231.0),
                reading("2024-06-11T08:00:00Z", 229.0),
            ],
        )?;

        let report = build_report(&store, &report_args(30), ts("2024-06-30T12:00:00Z"))?;
        assert_eq!(report.reading_count, 2);
        assert_eq!(report.table.len(), 3);
        let window_peaks = report.table.last().unwrap().peaks;
        assert_eq!(window_peaks.get(Channel::Voltage(Phase::P1)), 231.0);
        assert_eq!(report.all_time_ever.get(Channel::Voltage(Phase::P1)), 250.0);
        Ok(())
    }

    #[test]
    fn default_compact_picks_up_the_last_minute() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ReadingStore::open(dir.path())?;
        let now = ts("2024-06-30T12:00:30Z");
        store.append(RecordKind::Raw, &reading("2024-06-30T11:59:30Z", 231.0))?;

        assert_eq!(compact_saved(&store, &compact_args(), now)?, 1);
        let saved = store.load(RecordKind::Saved, "u1")?;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].timestamp, ts("2024-06-30T11:45:00Z"));
        assert_eq!(saved[0].voltage_p1, Some(231.0));
        Ok(())
    }

    #[test]
    fn open_interval_is_left_for_later() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ReadingStore::open(dir.path())?;
        store.append(RecordKind::Raw, &reading("2024-06-30T12:00:10Z", 231.0))?;

        assert_eq!(compact_saved(&store, &compact_args(), ts("2024-06-30T12:00:30Z"))?, 0);
        assert_eq!(compact_saved(&store, &compact_args(), ts("2024-06-30T12:15:00Z"))?, 1);
        Ok(())
    }

    #[test]
    fn compacting_twice_adds_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ReadingStore::open(dir.path())?;
        store.append_all(
            RecordKind::Raw,
            &[
                reading("2024-06-30T10:01:00Z", 230.0),
                reading("2024-06-30T10:20:00Z", 232.0),
                reading("2024-06-30T11:59:00Z", 228.0),
            ],
        )?;
        let now = ts("2024-06-30T12:00:30Z");

        assert_eq!(compact_saved(&store, &compact_args(), now)?, 3);
        assert_eq!(compact_saved(&store, &compact_args(), now)?, 0);
        assert_eq!(store.load(RecordKind::Saved, "u1")?.len(), 3);

        store.append(RecordKind::Raw, &reading("2024-06-30T12:05:00Z", 233.0))?;
        assert_eq!(compact_saved(&store, &compact_args(), ts("2024-06-30T12:16:00Z"))?, 1);
        assert_eq!(store.load(RecordKind::Saved, "u1")?.len(), 4);
        Ok(())
    }
}
