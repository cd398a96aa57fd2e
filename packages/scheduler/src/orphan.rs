//! Orphan recovery loop: reclaims jobs owned by workers that have
//! stopped heartbeating.

use std::sync::Arc;

use chrono::Utc;
use fleet_proto::{FailureReason, JobStatus, NodeStatus};
use fleet_store::Store;

use crate::config::SchedulerConfig;

pub async fn run_tick(store: &Arc<dyn Store>, config: &SchedulerConfig) -> fleet_store::Result<()> {
    let now = Utc::now();
    let nodes = store.get_all_nodes().await?;

    for node in nodes {
        if node.status == NodeStatus::Offline || !node.is_stale(now, config.node_timeout) {
            continue;
        }

        tracing::warn!(node_id = %node.id, "node heartbeat stale, marking offline");
        store.update_node_status(node.id, NodeStatus::Offline).await?;

        let mut owned = store.get_jobs_in_state(JobStatus::Assigned).await?;
        owned.extend(store.get_jobs_in_state(JobStatus::Running).await?);
        owned.retain(|j| j.node_id == Some(node.id));

        for job in owned {
            if job.retry_count + 1 > job.max_retries {
                if let Err(err) = store
                    .fail_job(
                        job.id,
                        job.status,
                        JobStatus::Failed,
                        Some("worker went offline and retries are exhausted".to_string()),
                        Some(FailureReason::MaxRetriesExceeded),
                    )
                    .await
                {
                    tracing::warn!(job_id = %job.id, error = %err, "failed to mark orphaned job failed at retry ceiling");
                }
                continue;
            }

            match store
                .transition_job_state(
                    job.id,
                    job.status,
                    JobStatus::Retrying,
                    Some("worker_died".to_string()),
                )
                .await
            {
                Ok(retrying) => tracing::info!(job_id = %retrying.id, retry_count = retrying.retry_count, "job orphaned, queued for retry"),
                Err(fleet_store::StoreError::JobNotFound(_)) => {
                    // Lost the race to a user cancel or another scheduler instance; fine.
                }
                Err(other) => return Err(other),
            }
        }
    }

    Ok(())
}
