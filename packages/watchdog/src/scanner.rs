//! Process-table scan loop: enumerate, filter by the target-command
//! allowlist, then classify into newly-discovered candidates.

use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sysinfo::{Pid, System};

use crate::config::WatchdogConfig;
use crate::state::TrackedProcess;

#[derive(Debug, Clone)]
pub struct Discovery {
    pub pid: i32,
    pub command: String,
}

/// Enumerates the process table and returns candidates not already tracked,
/// not too young, and not children of a known wrapper PID.
pub fn scan(
    sys: &mut System,
    config: &WatchdogConfig,
    tracked: &BTreeMap<String, TrackedProcess>,
    known_wrapper_pids: &HashSet<i32>,
) -> Vec<Discovery> {
    sys.refresh_all();

    let now_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs();

    let mut discoveries = Vec::new();
    for (pid, process) in sys.processes() {
        let pid_i32 = pid.as_u32() as i32;
        let command = command_line(process);
        if !matches_allowlist(&command, &config.target_commands) {
            continue;
        }
        if tracked.contains_key(&pid_i32.to_string()) {
            continue;
        }
        let age_secs = now_secs.saturating_sub(process.start_time());
        if age_secs < config.min_age.as_secs() {
            continue;
        }
        if let Some(parent) = process.parent() {
            if known_wrapper_pids.contains(&(parent.as_u32() as i32)) {
                continue;
            }
        }
        discoveries.push(Discovery { pid: pid_i32, command });
    }
    discoveries
}

fn command_line(process: &sysinfo::Process) -> String {
    let cmd: Vec<String> = process.cmd().iter().map(|s| s.to_string_lossy().to_string()).collect();
    if cmd.is_empty() {
        process.name().to_string_lossy().to_string()
    } else {
        cmd.join(" ")
    }
}

fn matches_allowlist(command: &str, allowlist: &[String]) -> bool {
    allowlist.iter().any(|target| command.contains(target.as_str()))
}

/// Which currently-tracked PIDs have exited since the last scan.
pub fn vanished(sys: &System, tracked: &BTreeMap<String, TrackedProcess>) -> Vec<String> {
    tracked
        .iter()
        .filter(|(_, p)| sys.process(Pid::from_u32(p.pid as u32)).is_none())
        .map(|(key, _)| key.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_matches_substrings() {
        let allow = vec!["ffmpeg".to_string()];
        assert!(matches_allowlist("/usr/bin/ffmpeg -i in.mp4 out.mp4", &allow));
        assert!(!matches_allowlist("/usr/bin/gst-launch-1.0", &allow));
    }
}
