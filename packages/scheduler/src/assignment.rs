//! Assignment loop: matches assignable jobs to capable, available
//! workers and performs the atomic `queued|retrying -> assigned` transition.

use std::sync::Arc;

use fleet_proto::engine::scenario_wants_hardware_acceleration;
use fleet_proto::{capability_satisfied, Engine, FailureReason, Job, JobStatus, Node, NodeStatus};
use fleet_store::{Store, StoreError};

use crate::metrics::{AssignmentOutcome, SchedulingMetrics};

/// Does `node` satisfy every one of `job`'s required capability tokens?
fn node_matches_job(node: &Node, job: &Job) -> bool {
    node.status == NodeStatus::Available
        && job
            .required_capabilities
            .iter()
            .all(|cap| capability_satisfied(node, cap))
}

/// True if no node in the whole fleet advertises (or could alias-satisfy) one
/// of the job's required capabilities — the job can never be scheduled.
fn is_impossible(job: &Job, all_nodes: &[Node]) -> bool {
    job.required_capabilities
        .iter()
        .any(|cap| !all_nodes.iter().any(|n| capability_satisfied(n, cap)))
}

/// Picks the best of the candidate nodes for `job`: GPU-capable nodes win
/// when the engine/scenario wants hardware acceleration, otherwise the node
/// least recently handed a job (oldest `last_heartbeat` among candidates,
/// used here as a proxy for "least recently assigned").
fn pick_best<'a>(job: &Job, candidates: &'a [&'a Node]) -> Option<&'a Node> {
    if candidates.is_empty() {
        return None;
    }
    let wants_hw = matches!(job.engine, Engine::Auto | Engine::Ffmpeg)
        && scenario_wants_hardware_acceleration(&job.scenario);

    if wants_hw {
        if let Some(gpu_node) = candidates
            .iter()
            .filter(|n| n.has_gpu)
            .min_by_key(|n| n.last_heartbeat)
        {
            return Some(gpu_node);
        }
    }
    candidates.iter().min_by_key(|n| n.last_heartbeat).copied()
}

/// Runs one assignment-loop tick against the live store state.
pub async fn run_tick(store: &Arc<dyn Store>, metrics: &SchedulingMetrics) -> fleet_store::Result<()> {
    let nodes = store.get_all_nodes().await?;

    let mut assignable = store.get_jobs_in_state(JobStatus::Queued).await?;
    assignable.extend(store.get_jobs_in_state(JobStatus::Retrying).await?);
    assignable.sort_by_key(|j| (j.queue.rank(), j.priority.rank(), j.sequence_number));

    for job in assignable {
        let candidates: Vec<&Node> = nodes.iter().filter(|n| node_matches_job(n, &job)).collect();

        if candidates.is_empty() {
            if is_impossible(&job, &nodes) {
                match store
                    .fail_job(
                        job.id,
                        job.status,
                        JobStatus::Rejected,
                        Some("no node advertises a required capability".to_string()),
                        Some(FailureReason::ImpossibleCapabilities),
                    )
                    .await
                {
                    Ok(_) => metrics.record(AssignmentOutcome::Rejected),
                    Err(StoreError::JobNotFound(_)) => metrics.record(AssignmentOutcome::RaceLost),
                    Err(other) => return Err(other),
                }
            } else {
                metrics.record(AssignmentOutcome::NoWorker);
            }
            continue;
        }

        let Some(winner) = pick_best(&job, &candidates) else {
            metrics.record(AssignmentOutcome::NoWorker);
            continue;
        };

        match store.assign_job_to_worker(job.id, winner.id).await {
            Ok(_) => metrics.record(AssignmentOutcome::Success),
            Err(StoreError::NodeNotFound(_)) | Err(StoreError::JobNotFound(_)) => {
                metrics.record(AssignmentOutcome::RaceLost)
            }
            Err(other) => return Err(other),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_proto::{Priority, Queue};
    use std::collections::{BTreeMap, BTreeSet};
    use uuid::Uuid;

    fn node(gpu: bool, status: NodeStatus) -> Node {
        Node {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "n".into(),
            address: "addr".into(),
            node_type: fleet_proto::NodeType::Server,
            cpu_threads: 8,
            cpu_model: "x".into(),
            has_gpu: gpu,
            gpu_type: gpu.then(|| "NVIDIA RTX".to_string()),
            gpu_capabilities: if gpu {
                BTreeSet::from(["gpu_h264".to_string()])
            } else {
                BTreeSet::new()
            },
            ram_total_bytes: 1,
            labels: BTreeMap::new(),
            status,
            last_heartbeat: chrono::Utc::now(),
            registered_at: chrono::Utc::now(),
            current_job_id: None,
        }
    }

    fn job_with_caps(caps: &[&str]) -> Job {
        Job {
            id: Uuid::new_v4(),
            sequence_number: 1,
            scenario: "hevc-4k-transcode".into(),
            engine: Engine::Auto,
            confidence: 1.0,
            queue: Queue::Default,
            priority: Priority::Medium,
            parameters: BTreeMap::new(),
            required_capabilities: caps.iter().map(|s| s.to_string()).collect(),
            status: JobStatus::Queued,
            node_id: None,
            retry_count: 0,
            max_retries: 3,
            error: None,
            failure_reason: None,
            progress: 0,
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
            state_transitions: vec![],
            wrapper_enabled: false,
            wrapper_constraints: None,
        }
    }

    #[test]
    fn impossible_capability_detected_fleet_wide() {
        let nodes = vec![node(false, NodeStatus::Available)];
        let job = job_with_caps(&["nvenc_hevc"]);
        assert!(is_impossible(&job, &nodes));
    }

    #[test]
    fn gpu_preferred_for_hardware_scenario() {
        let gpu = node(true, NodeStatus::Available);
        let cpu = node(false, NodeStatus::Available);
        let job = job_with_caps(&[]);
        let candidates = vec![&cpu, &gpu];
        let winner = pick_best(&job, &candidates).unwrap();
        assert!(winner.has_gpu);
    }
}
