use anyhow::{bail, Context, Result};
use log::{debug, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::aggregate::Window;
use crate::reading::{Reading, RecordKind};

/// Readings kept as JSON lines, one file per owner and record kind:
/// `<root>/<raw|saved>/<owner>.jsonl`.
pub struct ReadingStore {
    root: PathBuf,
}

impl ReadingStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for kind in [RecordKind::Raw, RecordKind::Saved] {
            let dir = root.join(kind.dir_name());
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create store directory {}", dir.display()))?;
        }
        Ok(Self { root })
    }

    fn path(&self, kind: RecordKind, user_id: &str) -> Result<PathBuf> {
        if user_id.is_empty()
            || user_id.starts_with('.')
            || user_id.contains(|c: char| c == '/' || c == '\\' || c.is_control())
        {
            bail!("Invalid user id: {:?}", user_id);
        }
        Ok(self
            .root
            .join(kind.dir_name())
            .join(format!("{}.jsonl", user_id)))
    }

    pub fn append(&self, kind: RecordKind, reading: &Reading) -> Result<()> {
        self.append_all(kind, std::slice::from_ref(reading))
    }

    /// Append readings, each to the file of its own owner.
    pub fn append_all(&self, kind: RecordKind, readings: &[Reading]) -> Result<()> {
        for reading in readings {
            let path = self.path(kind, &reading.user_id)?;
            let line =
                serde_json::to_string(reading).context("Failed to serialize reading to JSON")?;
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            writeln!(file, "{}", line)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        debug!("Stored {} {} reading(s)", readings.len(), kind.dir_name());
        Ok(())
    }

    /// Every stored reading of one owner, in file order. Unknown owners have none.
    pub fn load(&self, kind: RecordKind, user_id: &str) -> Result<Vec<Reading>> {
        let path = self.path(kind, user_id)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
        read_lines(BufReader::new(file), &path)
    }

    /// Readings of one owner inside `window`, newest first.
    pub fn in_window(&self, kind: RecordKind, user_id: &str, window: Window) -> Result<Vec<Reading>> {
        let mut readings: Vec<Reading> = self
            .load(kind, user_id)?
            .into_iter()
            .filter(|r| window.contains(r.timestamp))
            .collect();
        readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(readings)
    }

    /// The most recent reading of one owner, by timestamp.
    pub fn latest(&self, kind: RecordKind, user_id: &str) -> Result<Option<Reading>> {
        Ok(self
            .load(kind, user_id)?
            .into_iter()
            .max_by_key(|r| r.timestamp))
    }
}

fn read_lines(reader: impl BufRead, path: &Path) -> Result<Vec<Reading>> {
    let mut readings = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Reading>(&line) {
            Ok(r) => readings.push(r),
            Err(e) => warn!("Skipping malformed line {} of {}: {}", n + 1, path.display(), e),
        }
    }
    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    fn temp_store() -> (ReadingStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (ReadingStore::open(dir.path()).unwrap(), dir)
    }

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn reading(user: &str, at: &str, v1: f64) -> Reading {
        let mut r = Reading::new(user, ts(at));
        r.voltage_p1 = Some(v1);
        r
    }

    #[test]
    fn append_and_load_per_owner() {
        let (store, _dir) = temp_store();
        store
            .append_all(
                RecordKind::Raw,
                &[
                    reading("u1", "2024-06-01T08:00:00Z", 230.0),
                    reading("u2", "2024-06-01T08:00:00Z", 120.0),
                    reading("u1", "2024-06-01T09:00:00Z", 231.0),
                ],
            )
            .unwrap();
        let u1 = store.load(RecordKind::Raw, "u1").unwrap();
        assert_eq!(u1.len(), 2);
        assert!(u1.iter().all(|r| r.user_id == "u1"));
        assert_eq!(store.load(RecordKind::Raw, "u2").unwrap().len(), 1);
        assert!(store.load(RecordKind::Saved, "u1").unwrap().is_empty());
    }

    #[test]
    fn window_query_is_newest_first() {
        let (store, _dir) = temp_store();
        for at in [
            "2024-05-01T00:00:00Z",
            "2024-06-02T00:00:00Z",
            "2024-06-01T00:00:00Z",
        ] {
            store.append(RecordKind::Raw, &reading("u1", at, 230.0)).unwrap();
        }
        let window = Window::new(ts("2024-06-01T00:00:00Z"), ts("2024-06-30T00:00:00Z"));
        let found = store.in_window(RecordKind::Raw, "u1", window).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].timestamp, ts("2024-06-02T00:00:00Z"));
    }

    #[test]
    fn latest_uses_timestamp_not_file_order() {
        let (store, _dir) = temp_store();
        store.append(RecordKind::Raw, &reading("u1", "2024-06-02T00:00:00Z", 232.0)).unwrap();
        store.append(RecordKind::Raw, &reading("u1", "2024-06-01T00:00:00Z", 229.0)).unwrap();
        let latest = store.latest(RecordKind::Raw, "u1").unwrap().unwrap();
        assert_eq!(latest.voltage_p1, Some(232.0));
        assert!(store.latest(RecordKind::Raw, "nobody").unwrap().is_none());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let (store, dir) = temp_store();
        store.append(RecordKind::Raw, &reading("u1", "2024-06-01T00:00:00Z", 230.0)).unwrap();
        let path = dir.path().join("raw").join("u1.jsonl");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file).unwrap();
        assert_eq!(store.load(RecordKind::Raw, "u1").unwrap().len(), 1);
    }

    #[test]
    fn path_like_user_ids_are_rejected() {
        let (store, _dir) = temp_store();
        assert!(store.load(RecordKind::Raw, "../etc").is_err());
        assert!(store.load(RecordKind::Raw, "").is_err());
        assert!(store
            .append(RecordKind::Raw, &reading("a/b", "2024-06-01T00:00:00Z", 1.0))
            .is_err());
    }
}
