//! Retry release loop: jobs in `retrying` whose backoff timer has
//! elapsed transition back to `queued`.

use std::sync::Arc;

use chrono::Utc;
use fleet_proto::JobStatus;
use fleet_store::Store;

use crate::config::{backoff_for, SchedulerConfig};

pub async fn run_tick(store: &Arc<dyn Store>, config: &SchedulerConfig) -> fleet_store::Result<()> {
    let retrying = store.get_jobs_in_state(JobStatus::Retrying).await?;
    let now = Utc::now();

    for job in retrying {
        let Some(last_transition) = job.state_transitions.last() else {
            continue;
        };
        let elapsed = now - last_transition.timestamp;
        let backoff = chrono::Duration::from_std(backoff_for(config, job.retry_count)).unwrap_or_default();
        if elapsed < backoff {
            continue;
        }

        match store
            .transition_job_state(job.id, JobStatus::Retrying, JobStatus::Queued, None)
            .await
        {
            Ok(released) => tracing::info!(job_id = %released.id, "retry backoff elapsed, released to queue"),
            Err(fleet_store::StoreError::JobNotFound(_)) => {
                // Lost the race to another scheduler instance or a user cancel; fine.
            }
            Err(other) => return Err(other),
        }
    }

    Ok(())
}
