//! Ties scanner, classifier, retry queue, health tracker, and state
//! persistence together into the watch daemon's three concurrent loops.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use fleet_wrapper::attach::{attach, AttachRequest};
use fleet_wrapper::limits::ResourceLimits;
use fleet_wrapper::process_group::pid_exists;
use sysinfo::System;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::classify::ErrorClass;
use crate::config::WatchdogConfig;
use crate::health::HealthTracker;
use crate::retry_queue::RetryQueue;
use crate::scanner;
use crate::state::{DaemonState, TrackedProcess};

pub struct WatchDaemon {
    config: WatchdogConfig,
    state: Arc<Mutex<DaemonState>>,
    health: Arc<Mutex<HealthTracker>>,
    retry_queue: Arc<Mutex<RetryQueue>>,
    known_wrapper_pids: Arc<Mutex<HashSet<i32>>>,
    flush_tx: mpsc::Sender<()>,
    flush_rx: Arc<Mutex<mpsc::Receiver<()>>>,
}

impl WatchDaemon {
    pub fn new(config: WatchdogConfig) -> Self {
        let state = DaemonState::load(&config.state_path).unwrap_or_default();
        let (flush_tx, flush_rx) = mpsc::channel(16);
        Self {
            health: Arc::new(Mutex::new(HealthTracker::new(Utc::now()))),
            state: Arc::new(Mutex::new(state)),
            retry_queue: Arc::new(Mutex::new(RetryQueue::new())),
            known_wrapper_pids: Arc::new(Mutex::new(HashSet::new())),
            flush_tx,
            flush_rx: Arc::new(Mutex::new(flush_rx)),
            config,
        }
    }

    pub fn spawn(&self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        vec![
            self.spawn_scan_loop(cancel.clone()),
            self.spawn_retry_loop(cancel.clone()),
            self.spawn_flush_loop(cancel),
        ]
    }

    fn spawn_scan_loop(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let config = self.config.clone();
        let state = self.state.clone();
        let health = self.health.clone();
        let retry_queue = self.retry_queue.clone();
        let known_wrapper_pids = self.known_wrapper_pids.clone();
        let flush_tx = self.flush_tx.clone();

        tokio::spawn(async move {
            let mut sys = System::new_all();
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(config.scan_interval) => {}
                    _ = cancel.cancelled() => return,
                }
                run_scan_tick(&config, &mut sys, &state, &health, &retry_queue, &known_wrapper_pids, &cancel).await;
                let _ = flush_tx.try_send(());
            }
        })
    }

    fn spawn_retry_loop(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let config = self.config.clone();
        let state = self.state.clone();
        let health = self.health.clone();
        let retry_queue = self.retry_queue.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(config.retry_tick) => {}
                    _ = cancel.cancelled() => return,
                }
                let due = retry_queue.lock().await.due(&config, Utc::now());
                for entry in due {
                    attempt_attach(&config, entry.pid, entry.command, &state, &health, &retry_queue, &cancel).await;
                }
            }
        })
    }

    fn spawn_flush_loop(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let config = self.config.clone();
        let state = self.state.clone();
        let flush_rx = self.flush_rx.clone();

        tokio::spawn(async move {
            let mut rx = flush_rx.lock().await;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(config.flush_interval) => {}
                    _ = rx.recv() => {}
                    _ = cancel.cancelled() => {
                        if let Err(err) = state.lock().await.save(&config.state_path) {
                            warn!(error = %err, "final state flush failed");
                        }
                        return;
                    }
                }
                if let Err(err) = state.lock().await.save(&config.state_path) {
                    warn!(error = %err, "state flush failed");
                }
            }
        })
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_scan_tick(
    config: &WatchdogConfig,
    sys: &mut System,
    state: &Arc<Mutex<DaemonState>>,
    health: &Arc<Mutex<HealthTracker>>,
    retry_queue: &Arc<Mutex<RetryQueue>>,
    known_wrapper_pids: &Arc<Mutex<HashSet<i32>>>,
    cancel: &CancellationToken,
) {
    let tracked_snapshot = state.lock().await.processes.clone();
    let wrapper_pids = known_wrapper_pids.lock().await.clone();

    let discoveries = scanner::scan(sys, config, &tracked_snapshot, &wrapper_pids);
    let vanished = scanner::vanished(sys, &tracked_snapshot);

    {
        let mut state = state.lock().await;
        state.last_scan_at = Some(Utc::now());
        state.statistics.total_scans += 1;
        state.statistics.total_discovered += discoveries.len() as u64;
        for key in vanished {
            state.processes.remove(&key);
        }
    }
    health.lock().await.record_scan_success(Utc::now());

    for discovery in discoveries {
        info!(pid = discovery.pid, command = %discovery.command, "newly discovered process");
        attempt_attach(config, discovery.pid, discovery.command, state, health, retry_queue, cancel).await;
    }
}

#[allow(clippy::too_many_arguments)]
async fn attempt_attach(
    config: &WatchdogConfig,
    pid: i32,
    command: String,
    state: &Arc<Mutex<DaemonState>>,
    health: &Arc<Mutex<HealthTracker>>,
    retry_queue: &Arc<Mutex<RetryQueue>>,
    cancel: &CancellationToken,
) {
    if !pid_exists(pid) {
        let error = format!("pid {pid} does not exist");
        warn!(pid, %error, class = ErrorClass::classify(&error).as_str(), "attach attempt failed");
        health.lock().await.record_attach_failure();
        retry_queue.lock().await.enqueue(config, pid, command, &error, Utc::now());
        return;
    }

    health.lock().await.record_attach_success();
    retry_queue.lock().await.remove(pid);

    let now = Utc::now();
    {
        let mut state = state.lock().await;
        state.processes.insert(
            pid.to_string(),
            TrackedProcess {
                pid,
                job_id: None,
                command: command.clone(),
                discovered_at: now,
                attached_at: Some(now),
                last_seen_at: now,
            },
        );
        state.statistics.total_attachments += 1;
    }

    let child_cancel = cancel.child_token();
    let state = state.clone();

    tokio::spawn(async move {
        let request = AttachRequest { pid, name: format!("watchdog-{pid}"), limits: ResourceLimits::default() };
        if let Err(err) = attach(request, child_cancel).await {
            warn!(pid, error = %err, "attach observation ended with an error");
        }
        state.lock().await.processes.remove(&pid.to_string());
    });
}
