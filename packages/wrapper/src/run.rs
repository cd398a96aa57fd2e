//! `Run`: spawn-and-own entry point.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::cgroup::Cgroup;
use crate::error::Result;
use crate::limits::ResourceLimits;
use crate::preflight;
use crate::process_group::{self, signal_group};
use crate::timeout;
use crate::verdict::{self, RunOutcome};

pub struct RunRequest {
    pub argv: Vec<String>,
    pub working_dir: PathBuf,
    /// Stable identifier used to name the resource-limit container; creation
    /// is idempotent by this name.
    pub name: String,
    pub limits: ResourceLimits,
    pub timeout_sec: Option<u64>,
}

/// Spawns the child into its own process group, applies resource limits on a
/// best-effort basis, and waits for it to exit or for `cancel` to fire. A
/// caller-initiated cancellation signals the child's process group; a
/// timeout, if configured, does the same independently.
pub async fn run(request: RunRequest, cancel: CancellationToken) -> Result<RunOutcome> {
    preflight::check_disk_space(&request.working_dir)?;

    let started_at = Utc::now();
    let mut child = process_group::spawn_detached(&request.argv)?;
    let pid = child.id().expect("freshly spawned child has a pid") as i32;
    // setsid() in pre_exec makes the child its own session/group leader.
    let pgid = pid;

    let cgroup = if request.limits.is_empty() {
        None
    } else {
        Cgroup::create(&request.name)
    };
    let limits_applied = match &cgroup {
        Some(cg) => {
            cg.enroll(pid);
            cg.apply_limits(&request.limits);
            true
        }
        None => request.limits.is_empty(),
    };

    let timeout_task = request.timeout_sec.map(|secs| {
        tokio::spawn(timeout::watch(pgid, Duration::from_secs(secs), timeout::default_grace()))
    });

    let exit_code = tokio::select! {
        status = child.wait() => {
            status.ok().and_then(|s| s.code())
        }
        _ = cancel.cancelled() => {
            tracing::info!(pid, "run canceled by owner, signaling process group");
            signal_group(pgid, libc::SIGTERM);
            let status = child.wait().await;
            status.ok().and_then(|s| s.code())
        }
    };

    if let Some(task) = timeout_task {
        task.abort();
    }
    if let Some(cg) = cgroup {
        cg.remove();
    }

    let ended_at = Utc::now();
    Ok(verdict::derive_verdict(started_at, ended_at, exit_code, limits_applied))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_records_exit_code_of_successful_child() {
        let request = RunRequest {
            argv: vec!["/bin/sh".to_string(), "-c".to_string(), "exit 0".to_string()],
            working_dir: PathBuf::from("/tmp"),
            name: "test-run-success".to_string(),
            limits: ResourceLimits::default(),
            timeout_sec: None,
        };
        let outcome = run(request, CancellationToken::new()).await.expect("run should succeed");
        assert_eq!(outcome.exit_code, Some(0));
    }

    #[tokio::test]
    async fn run_propagates_nonzero_exit_code() {
        let request = RunRequest {
            argv: vec!["/bin/sh".to_string(), "-c".to_string(), "exit 7".to_string()],
            working_dir: PathBuf::from("/tmp"),
            name: "test-run-failure".to_string(),
            limits: ResourceLimits::default(),
            timeout_sec: None,
        };
        let outcome = run(request, CancellationToken::new()).await.expect("run should succeed");
        assert_eq!(outcome.exit_code, Some(7));
    }

    #[tokio::test]
    async fn cancellation_terminates_a_long_running_child() {
        let request = RunRequest {
            argv: vec!["/bin/sleep".to_string(), "30".to_string()],
            working_dir: PathBuf::from("/tmp"),
            name: "test-run-cancel".to_string(),
            limits: ResourceLimits::default(),
            timeout_sec: None,
        };
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel_clone.cancel();
        });
        let started = std::time::Instant::now();
        let outcome = run(request, cancel).await.expect("run should succeed");
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(outcome.exit_code.is_some());
    }
}
