//! SQL DDL and row <-> domain-type conversions.
//!
//! Columns are deliberately simple (TEXT timestamps, TEXT-encoded JSON,
//! INTEGER booleans) so the exact same DDL and queries run unmodified against
//! both the embedded SQLite backend and the networked PostgreSQL backend via
//! `sqlx::Any`.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use fleet_proto::job::Transition;
use fleet_proto::{Engine, FailureReason, Job, JobStatus, Node, NodeStatus, NodeType, Priority, Queue};
use sqlx::any::AnyRow;
use sqlx::Row;
use uuid::Uuid;

use crate::error::{Result, StoreError};

pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    node_type TEXT NOT NULL,
    cpu_threads INTEGER NOT NULL,
    cpu_model TEXT NOT NULL,
    has_gpu INTEGER NOT NULL,
    gpu_type TEXT,
    gpu_capabilities TEXT NOT NULL,
    ram_total_bytes INTEGER NOT NULL,
    labels TEXT NOT NULL,
    status TEXT NOT NULL,
    last_heartbeat TEXT NOT NULL,
    registered_at TEXT NOT NULL,
    current_job_id TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_identity ON nodes(name, address);
CREATE INDEX IF NOT EXISTS idx_nodes_status ON nodes(status);

CREATE TABLE IF NOT EXISTS job_sequence (
    id INTEGER PRIMARY KEY,
    value INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    sequence_number INTEGER NOT NULL UNIQUE,
    scenario TEXT NOT NULL,
    engine TEXT NOT NULL,
    confidence REAL NOT NULL,
    queue TEXT NOT NULL,
    priority TEXT NOT NULL,
    parameters TEXT NOT NULL,
    required_capabilities TEXT NOT NULL,
    status TEXT NOT NULL,
    node_id TEXT,
    retry_count INTEGER NOT NULL,
    max_retries INTEGER NOT NULL,
    error TEXT,
    failure_reason TEXT,
    progress INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT,
    wrapper_enabled INTEGER NOT NULL,
    wrapper_constraints TEXT
);

CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
CREATE INDEX IF NOT EXISTS idx_jobs_queue ON jobs(queue);
CREATE INDEX IF NOT EXISTS idx_jobs_priority ON jobs(priority);
CREATE INDEX IF NOT EXISTS idx_jobs_sequence ON jobs(sequence_number);

CREATE TABLE IF NOT EXISTS state_transitions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL,
    from_status TEXT NOT NULL,
    to_status TEXT NOT NULL,
    ts TEXT NOT NULL,
    reason TEXT
);

CREATE INDEX IF NOT EXISTS idx_transitions_job ON state_transitions(job_id);
"#;

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

pub fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    Ok(serde_json::from_str(raw)?)
}

pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?
        .with_timezone(&Utc))
}

pub fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn decode_err(msg: impl Into<String>) -> StoreError {
    StoreError::Database(sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        msg.into(),
    ))))
}

fn parse_enum<T: FromStr>(raw: &str, what: &'static str) -> Result<T> {
    raw.parse::<T>().map_err(|_| decode_err(format!("bad {what}: {raw}")))
}

impl FromStr for NodeType {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "server" => Ok(NodeType::Server),
            "desktop" => Ok(NodeType::Desktop),
            "laptop" => Ok(NodeType::Laptop),
            _ => Err(()),
        }
    }
}

impl FromStr for NodeStatus {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "available" => Ok(NodeStatus::Available),
            "busy" => Ok(NodeStatus::Busy),
            "offline" => Ok(NodeStatus::Offline),
            _ => Err(()),
        }
    }
}

impl FromStr for Engine {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "auto" => Ok(Engine::Auto),
            "ffmpeg" => Ok(Engine::Ffmpeg),
            "gstreamer" => Ok(Engine::Gstreamer),
            _ => Err(()),
        }
    }
}

impl FromStr for Queue {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "live" => Ok(Queue::Live),
            "default" => Ok(Queue::Default),
            "batch" => Ok(Queue::Batch),
            _ => Err(()),
        }
    }
}

impl FromStr for Priority {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(()),
        }
    }
}

impl FromStr for FailureReason {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        use FailureReason::*;
        Ok(match s {
            "platform_error" => PlatformError,
            "worker_died" => WorkerDied,
            "transient_network" => TransientNetwork,
            "rate_limit" => RateLimit,
            "resource_exhaustion" => ResourceExhaustion,
            "validation_error" => ValidationError,
            "user_error" => UserError,
            "input_error" => InputError,
            "impossible_capabilities" => ImpossibleCapabilities,
            "max_retries_exceeded" => MaxRetriesExceeded,
            "timeout" => Timeout,
            _ => RuntimeError,
        })
    }
}

pub fn node_from_row(row: &AnyRow) -> Result<Node> {
    let gpu_caps: BTreeSet<String> = from_json(row.try_get::<String, _>("gpu_capabilities")?.as_str())?;
    let labels: BTreeMap<String, String> = from_json(row.try_get::<String, _>("labels")?.as_str())?;
    let id: String = row.try_get("id")?;
    let tenant_id: String = row.try_get("tenant_id")?;
    let current_job_id: Option<String> = row.try_get("current_job_id")?;
    Ok(Node {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
        tenant_id: Uuid::parse_str(&tenant_id).unwrap_or_default(),
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        node_type: parse_enum(row.try_get::<String, _>("node_type")?.as_str(), "node_type")?,
        cpu_threads: row.try_get::<i64, _>("cpu_threads")? as u32,
        cpu_model: row.try_get("cpu_model")?,
        has_gpu: row.try_get::<i64, _>("has_gpu")? != 0,
        gpu_type: row.try_get("gpu_type")?,
        gpu_capabilities: gpu_caps,
        ram_total_bytes: row.try_get::<i64, _>("ram_total_bytes")? as u64,
        labels,
        status: parse_enum(row.try_get::<String, _>("status")?.as_str(), "status")?,
        last_heartbeat: parse_ts(row.try_get::<String, _>("last_heartbeat")?.as_str())?,
        registered_at: parse_ts(row.try_get::<String, _>("registered_at")?.as_str())?,
        current_job_id: current_job_id
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
    })
}

pub fn job_from_row(row: &AnyRow) -> Result<Job> {
    let params: BTreeMap<String, serde_json::Value> =
        from_json(row.try_get::<String, _>("parameters")?.as_str())?;
    let caps: Vec<String> = from_json(row.try_get::<String, _>("required_capabilities")?.as_str())?;
    let id: String = row.try_get("id")?;
    let node_id: Option<String> = row.try_get("node_id")?;
    let failure_reason: Option<String> = row.try_get("failure_reason")?;
    let started_at: Option<String> = row.try_get("started_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;
    let wrapper_constraints: Option<String> = row.try_get("wrapper_constraints")?;
    Ok(Job {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
        sequence_number: row.try_get("sequence_number")?,
        scenario: row.try_get("scenario")?,
        engine: parse_enum(row.try_get::<String, _>("engine")?.as_str(), "engine")?,
        confidence: row.try_get("confidence")?,
        queue: parse_enum(row.try_get::<String, _>("queue")?.as_str(), "queue")?,
        priority: parse_enum(row.try_get::<String, _>("priority")?.as_str(), "priority")?,
        parameters: params,
        required_capabilities: caps,
        status: parse_enum(row.try_get::<String, _>("status")?.as_str(), "status")?,
        node_id: node_id
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
        retry_count: row.try_get("retry_count")?,
        max_retries: row.try_get("max_retries")?,
        error: row.try_get("error")?,
        failure_reason: failure_reason
            .map(|s| parse_enum::<FailureReason>(&s, "failure_reason"))
            .transpose()?,
        progress: row.try_get("progress")?,
        created_at: parse_ts(row.try_get::<String, _>("created_at")?.as_str())?,
        started_at: started_at.map(|s| parse_ts(&s)).transpose()?,
        completed_at: completed_at.map(|s| parse_ts(&s)).transpose()?,
        state_transitions: Vec::new(),
        wrapper_enabled: row.try_get::<i64, _>("wrapper_enabled")? != 0,
        wrapper_constraints: wrapper_constraints
            .map(|s| from_json::<serde_json::Value>(&s))
            .transpose()?,
    })
}

pub fn transition_from_row(row: &AnyRow) -> Result<Transition> {
    Ok(Transition {
        from: row.try_get("from_status")?,
        to: row.try_get("to_status")?,
        timestamp: parse_ts(row.try_get::<String, _>("ts")?.as_str())?,
        reason: row.try_get("reason")?,
    })
}
