//! Job submission, progress, completion, and lifecycle endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use fleet_proto::job::is_allowed_transition;
use fleet_proto::validate::validate_submit_job;
use fleet_proto::wire::{CompleteJobRequest, ProgressUpdateRequest, SubmitJobRequest, SubmitJobResponse};
use fleet_proto::{Job, JobStatus};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub async fn submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitJobRequest>,
) -> ApiResult<Json<SubmitJobResponse>> {
    validate_submit_job(&req)?;

    let job = Job {
        id: Uuid::new_v4(),
        sequence_number: 0,
        scenario: req.scenario,
        engine: req.engine,
        confidence: req.confidence,
        queue: req.queue,
        priority: req.priority,
        parameters: req.parameters,
        required_capabilities: req.required_capabilities,
        status: JobStatus::Queued,
        node_id: None,
        retry_count: 0,
        max_retries: req.max_retries.unwrap_or(3),
        error: None,
        failure_reason: None,
        progress: 0,
        created_at: Utc::now(),
        started_at: None,
        completed_at: None,
        state_transitions: vec![],
        wrapper_enabled: req.wrapper_enabled.unwrap_or(false),
        wrapper_constraints: req.wrapper_constraints,
    };

    let saved = state.store.create_job(job).await?;
    Ok(Json(SubmitJobResponse {
        id: saved.id,
        sequence_number: saved.sequence_number,
    }))
}

pub async fn get_all(State(state): State<AppState>) -> ApiResult<Json<Vec<Job>>> {
    Ok(Json(state.store.get_all_jobs().await?))
}

pub async fn get_one(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Job>> {
    Ok(Json(state.store.get_job(id).await.map_err(map_job_error)?))
}

pub async fn progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProgressUpdateRequest>,
) -> ApiResult<impl IntoResponse> {
    let job = state.store.get_job(id).await.map_err(map_job_error)?;
    if job.status.is_terminal() {
        return Ok(StatusCode::OK);
    }

    let clamped = Job::clamp_progress(req.progress);
    if clamped < job.progress {
        // Out-of-order report that would decrease progress within this
        // running episode; ignored.
        return Ok(StatusCode::OK);
    }

    state.store.update_job_progress(id, clamped).await.map_err(map_job_error)?;
    Ok(StatusCode::OK)
}

pub async fn complete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CompleteJobRequest>,
) -> ApiResult<Json<Job>> {
    let job = state
        .store
        .complete_job(id, req.status, req.error, req.failure_reason)
        .await
        .map_err(map_job_error)?;
    Ok(Json(job))
}

async fn transition(state: &AppState, id: Uuid, to: JobStatus) -> ApiResult<Job> {
    let job = state.store.get_job(id).await.map_err(map_job_error)?;
    if !is_allowed_transition(job.status, to) {
        return Err(ApiError::Conflict(format!("cannot move job from {} to {to}", job.status)));
    }
    state.store.transition_job_state(id, job.status, to, None).await.map_err(map_job_error)
}

pub async fn cancel(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Job>> {
    // Cancel is allowed from any non-terminal state; find whichever
    // transition the FSM currently permits out of the job's live status.
    let job = state.store.get_job(id).await.map_err(map_job_error)?;
    if job.status.is_terminal() {
        return Err(ApiError::Conflict("job already in a terminal state".to_string()));
    }
    transition(&state, id, JobStatus::Canceled).await.map(Json)
}

pub async fn pause(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Job>> {
    transition(&state, id, JobStatus::Paused).await.map(Json)
}

pub async fn resume(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Job>> {
    transition(&state, id, JobStatus::Running).await.map(Json)
}

fn map_job_error(err: fleet_store::StoreError) -> ApiError {
    match err {
        fleet_store::StoreError::JobNotFound(id) => ApiError::NotFound(format!("job {id}")),
        other => ApiError::Store(other),
    }
}
