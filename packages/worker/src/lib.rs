//! Worker agent: registers with the master, advertises hardware
//! capabilities, then runs heartbeat, poll, and execute loops concurrently
//! until shut down.

pub mod capabilities;
pub mod client;
pub mod config;
pub mod error;
pub mod execute;
pub mod heartbeat;
pub mod poll;
pub mod registry;

use std::collections::BTreeMap;
use std::sync::Arc;

use fleet_proto::wire::RegisterNodeRequest;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::client::MasterClient;
use crate::config::Config;
use crate::error::Result;
use crate::registry::JobCancelRegistry;

pub struct Worker {
    pub node_id: Uuid,
    client: MasterClient,
    config: Config,
    shutdown: CancellationToken,
}

impl Worker {
    /// Detects local capabilities and registers with the master. In
    /// standalone mode, generates a local node id and never contacts it.
    pub async fn bootstrap(config: Config) -> Result<Self> {
        let client = MasterClient::new(config.master_url.clone(), config.api_key.clone());

        let node_id = if config.standalone {
            Uuid::new_v4()
        } else {
            let detected = capabilities::detect();
            let request = RegisterNodeRequest {
                name: config.node_name.clone(),
                address: config.node_address.clone(),
                node_type: config.node_type,
                cpu_threads: detected.cpu_threads,
                cpu_model: detected.cpu_model,
                has_gpu: detected.has_gpu,
                gpu_type: detected.gpu_type,
                gpu_capabilities: detected.gpu_capabilities,
                ram_total_bytes: detected.ram_total_bytes,
                labels: BTreeMap::new(),
            };
            let response = client.register_node(&request).await?;
            info!(node_id = %response.id, "registered with master");
            response.id
        };

        Ok(Self { node_id, client, config, shutdown: CancellationToken::new() })
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawns the heartbeat and poll loops. Returns immediately; callers
    /// await the returned handles (typically alongside a shutdown signal).
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        if self.config.standalone {
            return vec![];
        }

        let registry = JobCancelRegistry::new();
        let concurrency = Arc::new(Semaphore::new(self.config.max_concurrent_jobs));

        let heartbeat = tokio::spawn(heartbeat::run_loop(
            self.client.clone(),
            self.node_id,
            self.config.heartbeat_period,
            registry.clone(),
            self.shutdown.clone(),
        ));

        let poll = tokio::spawn(poll::run_loop(
            self.client.clone(),
            self.node_id,
            self.config.master_url.clone(),
            self.config.poll_period,
            concurrency,
            registry,
            self.shutdown.clone(),
        ));

        vec![heartbeat, poll]
    }
}
