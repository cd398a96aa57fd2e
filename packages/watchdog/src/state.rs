//! Durable daemon state: tracked PIDs, discovery/attach
//! timestamps, and aggregate counters, serialized atomically via
//! write-to-temp + rename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedProcess {
    pub pid: i32,
    pub job_id: Option<String>,
    pub command: String,
    pub discovered_at: DateTime<Utc>,
    pub attached_at: Option<DateTime<Utc>>,
    pub last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Statistics {
    pub total_scans: u64,
    pub total_discovered: u64,
    pub total_attachments: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonState {
    pub version: u32,
    pub last_scan_at: Option<DateTime<Utc>>,
    /// Keyed by PID as a decimal string, per the JSON schema.
    pub processes: BTreeMap<String, TrackedProcess>,
    pub statistics: Statistics,
}

impl Default for DaemonState {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            last_scan_at: None,
            processes: BTreeMap::new(),
            statistics: Statistics::default(),
        }
    }
}

impl DaemonState {
    /// Loads state from `path`, pruning PIDs that no longer exist. Returns a
    /// fresh default state if the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let mut state: Self = serde_json::from_str(&raw)?;
        state.processes.retain(|_, p| fleet_wrapper::process_group::pid_exists(p.pid));
        Ok(state)
    }

    /// Writes state via write-to-temp + rename, the same atomicity pattern as
    /// every other durable write in this system.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp_path = tmp_path_for(path);
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp_path, serialized)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_of_missing_file_is_a_fresh_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let state = DaemonState::load(&path).unwrap();
        assert_eq!(state.version, SCHEMA_VERSION);
        assert!(state.processes.is_empty());
    }

    #[test]
    fn save_then_load_round_trips_modulo_pruning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = DaemonState::default();
        state.statistics.total_scans = 5;
        state.processes.insert(
            "999999999".to_string(),
            TrackedProcess {
                pid: i32::MAX - 1,
                job_id: None,
                command: "ffmpeg".to_string(),
                discovered_at: Utc::now(),
                attached_at: None,
                last_seen_at: Utc::now(),
            },
        );
        state.save(&path).unwrap();

        // the fabricated pid doesn't really exist, so load() prunes it away.
        let loaded = DaemonState::load(&path).unwrap();
        assert_eq!(loaded.statistics.total_scans, 5);
        assert!(loaded.processes.is_empty());
    }
}
