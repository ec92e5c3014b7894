//! Run-state snapshot store.
//!
//! The snapshot is the sole source of truth across restarts: if the
//! process crashes with an open position, the next start reconstructs
//! it from here before resuming the loop.

use std::fs;
use std::path::{Path, PathBuf};

use carry_core::Position;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StateResult;

/// Persisted snapshot of the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// When this snapshot was written.
    pub timestamp: DateTime<Utc>,
    /// Whether the run uses simulated fills.
    pub dry_run: bool,
    /// The open position, if any.
    pub position: Option<Position>,
}

impl RunState {
    /// A fresh idle state, as implied by an absent snapshot file.
    #[must_use]
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now,
            dry_run: true,
            position: None,
        }
    }
}

/// JSON-file snapshot store.
///
/// `save` writes to a temp path and renames over the target, so a crash
/// mid-write never leaves a corrupt snapshot behind.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last snapshot. An absent file is a fresh start, not an
    /// error.
    pub fn load(&self) -> StateResult<Option<RunState>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no snapshot on disk, fresh start");
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let state: RunState = serde_json::from_str(&content)?;
        info!(
            path = %self.path.display(),
            has_position = state.position.is_some(),
            dry_run = state.dry_run,
            "recovered snapshot"
        );
        Ok(Some(state))
    }

    /// Atomically overwrite the snapshot.
    pub fn save(&self, state: &RunState) -> StateResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;

        debug!(
            path = %self.path.display(),
            has_position = state.position.is_some(),
            "snapshot written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carry_core::{Price, Size};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_state(with_position: bool) -> RunState {
        let opened_at = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        RunState {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap(),
            dry_run: true,
            position: with_position.then(|| {
                let mut pos = Position::new(
                    "BTCUSDT",
                    Size::new(dec!(0.02)),
                    Size::new(dec!(0.02)),
                    Price::new(dec!(50000)),
                    Price::new(dec!(50010)),
                    dec!(1000),
                    opened_at,
                );
                pos.accrue_funding(Price::new(dec!(50005)), dec!(0.0001));
                pos
            }),
        }
    }

    #[test]
    fn test_missing_file_is_fresh_start() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_round_trip_with_position() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let state = sample_state(true);
        store.save(&state).unwrap();

        let loaded = store.load().unwrap().expect("snapshot should exist");
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_round_trip_without_position() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let state = sample_state(false);
        store.save(&state).unwrap();

        let loaded = store.load().unwrap().expect("snapshot should exist");
        assert_eq!(loaded, state);
        assert!(loaded.position.is_none());
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        store.save(&sample_state(true)).unwrap();
        store.save(&sample_state(false)).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.position.is_none());
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = StateStore::new(&path);

        store.save(&sample_state(true)).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_timestamps_serialize_as_iso8601() {
        let state = sample_state(true);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("2024-03-01T07:00:00Z"));
    }
}
