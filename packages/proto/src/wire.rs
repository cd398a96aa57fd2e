//! Request/response payloads for the master HTTP API.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::Engine;
use crate::failure::FailureReason;
use crate::job::{Job, JobStatus, Priority, Queue};
use crate::node::NodeType;

#[derive(Debug, Deserialize)]
pub struct RegisterNodeRequest {
    pub name: String,
    pub address: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub cpu_threads: u32,
    pub cpu_model: String,
    pub has_gpu: bool,
    pub gpu_type: Option<String>,
    #[serde(default)]
    pub gpu_capabilities: BTreeSet<String>,
    pub ram_total_bytes: u64,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterNodeResponse {
    pub id: Uuid,
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    pub assigned_job: Option<Job>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    pub scenario: String,
    #[serde(default)]
    pub engine: Engine,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub queue: Queue,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    #[serde(default)]
    pub max_retries: Option<i32>,
    #[serde(default)]
    pub wrapper_enabled: Option<bool>,
    #[serde(default)]
    pub wrapper_constraints: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub id: Uuid,
    pub sequence_number: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressUpdateRequest {
    pub progress: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompleteJobRequest {
    pub status: JobStatus,
    pub error: Option<String>,
    pub failure_reason: Option<FailureReason>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn new(code: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.to_string(),
            details: None,
        }
    }
}

#[derive(Debug, Serialize, Default)]
pub struct JobMetrics {
    pub active_jobs: u64,
    pub queue_length: u64,
    pub avg_duration_secs: f64,
    pub by_state: BTreeMap<String, u64>,
    pub by_queue: BTreeMap<String, u64>,
    pub by_priority: BTreeMap<String, u64>,
    pub by_engine: BTreeMap<String, u64>,
}
