//! Node registration, heartbeat, and poll endpoints.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use fleet_proto::wire::{HeartbeatResponse, RegisterNodeRequest, RegisterNodeResponse};
use fleet_proto::{Job, Node, NodeStatus};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterNodeRequest>,
) -> ApiResult<Json<RegisterNodeResponse>> {
    let now = Utc::now();
    let node = Node {
        id: Uuid::new_v4(),
        tenant_id: Uuid::nil(),
        name: req.name,
        address: req.address,
        node_type: req.node_type,
        cpu_threads: req.cpu_threads,
        cpu_model: req.cpu_model,
        has_gpu: req.has_gpu,
        gpu_type: req.gpu_type,
        gpu_capabilities: req.gpu_capabilities,
        ram_total_bytes: req.ram_total_bytes,
        labels: req.labels,
        status: NodeStatus::Available,
        last_heartbeat: now,
        registered_at: now,
        current_job_id: None,
    };

    let saved = state.store.register_node(node).await?;
    Ok(Json(RegisterNodeResponse {
        id: saved.id,
        registered_at: saved.registered_at,
    }))
}

pub async fn heartbeat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<HeartbeatResponse>> {
    let node = state.store.get_node(id).await.map_err(map_node_error)?;
    state.store.update_node_heartbeat(id, node.status).await.map_err(map_node_error)?;

    let assigned_job: Option<Job> = match node.current_job_id {
        Some(job_id) => state.store.get_job(job_id).await.ok(),
        None => None,
    };

    Ok(Json(HeartbeatResponse { assigned_job }))
}

/// Atomically claims the job already assigned to this node, if any. Actual
/// dispatch happens in the scheduler's assignment loop; this endpoint just
/// lets the worker discover the outcome.
pub async fn poll(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<axum::response::Response> {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    let node = state.store.get_node(id).await.map_err(map_node_error)?;
    match node.current_job_id {
        Some(job_id) => {
            let job = state.store.get_job(job_id).await.map_err(map_node_error)?;
            if job.status.is_terminal() {
                return Ok(StatusCode::NO_CONTENT.into_response());
            }
            Ok(Json(job).into_response())
        }
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn get_all(State(state): State<AppState>) -> ApiResult<Json<Vec<Node>>> {
    Ok(Json(state.store.get_all_nodes().await?))
}

pub async fn get_one(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Node>> {
    Ok(Json(state.store.get_node(id).await.map_err(map_node_error)?))
}

fn map_node_error(err: fleet_store::StoreError) -> ApiError {
    match err {
        fleet_store::StoreError::NodeNotFound(id) => ApiError::NotFound(format!("node {id}")),
        other => ApiError::Store(other),
    }
}
