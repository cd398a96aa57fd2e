//! Heartbeat loop: reports liveness on a fixed period. Transport
//! failures back off exponentially; the workload itself is never retried
//! from here.

use std::time::Duration;

use fleet_proto::JobStatus;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::MasterClient;
use crate::registry::JobCancelRegistry;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

pub async fn run_loop(
    client: MasterClient,
    node_id: Uuid,
    period: Duration,
    registry: JobCancelRegistry,
    cancel: CancellationToken,
) {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = cancel.cancelled() => return,
        }

        match client.heartbeat(node_id).await {
            Ok(response) => {
                debug!(%node_id, "heartbeat ok");
                backoff = INITIAL_BACKOFF;
                if let Some(job) = response.assigned_job {
                    if matches!(job.status, JobStatus::Canceled | JobStatus::Paused) {
                        registry.cancel(job.id);
                    }
                }
            }
            Err(err) => {
                warn!(%node_id, error = %err, backoff_secs = backoff.as_secs(), "heartbeat failed, backing off");
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = cancel.cancelled() => return,
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}
