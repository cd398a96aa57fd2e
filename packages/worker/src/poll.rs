//! Poll loop: asks the master for the next assigned job and hands it
//! to the execute loop, bounded by `max_concurrent_jobs`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::MasterClient;
use crate::execute::execute_job;
use crate::registry::JobCancelRegistry;

pub async fn run_loop(
    client: MasterClient,
    node_id: Uuid,
    master_url: String,
    period: Duration,
    concurrency: Arc<Semaphore>,
    registry: JobCancelRegistry,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = cancel.cancelled() => return,
        }

        let Ok(permit) = Arc::clone(&concurrency).try_acquire_owned() else {
            // At capacity: skip this tick, the job stays assigned for a later poll.
            continue;
        };

        match client.poll(node_id).await {
            Ok(Some(job)) => {
                info!(job_id = %job.id, sequence_number = job.sequence_number, "acquired job");
                let job_id = job.id;
                let client = client.clone();
                let master_url = master_url.clone();
                let job_cancel = cancel.child_token();
                registry.register(job_id, job_cancel.clone());
                let registry = registry.clone();
                tokio::spawn(async move {
                    execute_job(client, job, master_url, job_cancel).await;
                    registry.remove(job_id);
                    drop(permit);
                });
            }
            Ok(None) => drop(permit),
            Err(err) => {
                warn!(%node_id, error = %err, "poll failed");
                drop(permit);
            }
        }
    }
}
