//! The master's background scheduling loops.
//!
//! [`Scheduler`] owns four cooperating tasks — assignment, orphan recovery,
//! retry release, and cleanup — all driven off the same [`fleet_store::Store`]
//! and stopped together by a single [`CancellationToken`] plumbed through
//! every loop rather than scattered signal handlers.

pub mod assignment;
pub mod cleanup;
pub mod config;
pub mod metrics;
pub mod orphan;
pub mod retry;

use std::sync::Arc;

use fleet_store::Store;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use config::SchedulerConfig;
pub use metrics::{AssignmentOutcome, SchedulingMetrics, SchedulingMetricsSnapshot};

pub struct Scheduler {
    store: Arc<dyn Store>,
    config: SchedulerConfig,
    metrics: Arc<SchedulingMetrics>,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(store: Arc<dyn Store>, config: SchedulerConfig) -> Self {
        Self {
            store,
            config,
            metrics: Arc::new(SchedulingMetrics::default()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn metrics(&self) -> Arc<SchedulingMetrics> {
        self.metrics.clone()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawns all four loops and returns their join handles. Each loop runs
    /// until `shutdown_token()` is canceled, finishing its current iteration
    /// first.
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        vec![
            self.spawn_loop("assignment", self.config.assignment_tick, {
                let store = self.store.clone();
                let metrics = self.metrics.clone();
                move || {
                    let store = store.clone();
                    let metrics = metrics.clone();
                    async move {
                        if let Err(err) = assignment::run_tick(&store, &metrics).await {
                            tracing::error!(error = %err, "assignment tick failed");
                        }
                    }
                }
            }),
            self.spawn_loop("orphan_recovery", self.config.health_tick, {
                let store = self.store.clone();
                let config = self.config.clone();
                move || {
                    let store = store.clone();
                    let config = config.clone();
                    async move {
                        if let Err(err) = orphan::run_tick(&store, &config).await {
                            tracing::error!(error = %err, "orphan recovery tick failed");
                        }
                    }
                }
            }),
            self.spawn_loop("retry_release", self.config.retry_tick, {
                let store = self.store.clone();
                let config = self.config.clone();
                move || {
                    let store = store.clone();
                    let config = config.clone();
                    async move {
                        if let Err(err) = retry::run_tick(&store, &config).await {
                            tracing::error!(error = %err, "retry release tick failed");
                        }
                    }
                }
            }),
            self.spawn_loop("cleanup", self.config.cleanup_tick, {
                let store = self.store.clone();
                let config = self.config.clone();
                move || {
                    let store = store.clone();
                    let config = config.clone();
                    async move {
                        if let Err(err) = cleanup::run_tick(&store, &config).await {
                            tracing::error!(error = %err, "cleanup tick failed");
                        }
                    }
                }
            }),
        ]
    }

    fn spawn_loop<F, Fut>(&self, name: &'static str, period: std::time::Duration, mut body: F) -> JoinHandle<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        body().await;
                    }
                    _ = shutdown.cancelled() => {
                        tracing::info!(loop_name = name, "scheduler loop shutting down");
                        break;
                    }
                }
            }
        })
    }
}
