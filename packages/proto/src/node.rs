//! Worker node model.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Server,
    Desktop,
    Laptop,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Server => "server",
            NodeType::Desktop => "desktop",
            NodeType::Laptop => "laptop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Available,
    Busy,
    Offline,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Available => "available",
            NodeStatus::Busy => "busy",
            NodeStatus::Offline => "offline",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub address: String,
    pub node_type: NodeType,
    pub cpu_threads: u32,
    pub cpu_model: String,
    pub has_gpu: bool,
    pub gpu_type: Option<String>,
    pub gpu_capabilities: BTreeSet<String>,
    pub ram_total_bytes: u64,
    pub labels: BTreeMap<String, String>,
    pub status: NodeStatus,
    pub last_heartbeat: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
    pub current_job_id: Option<Uuid>,
}

impl Node {
    /// Identity key used to detect duplicate registrations.
    pub fn identity_key(name: &str, address: &str) -> String {
        format!("{name}\0{address}")
    }

    /// Whether the worker's advertised NVIDIA family can be used for
    /// hardware-accelerated `nvenc_*` aliases.
    pub fn is_nvidia_family(&self) -> bool {
        self.gpu_type
            .as_deref()
            .map(|g| {
                let g = g.to_ascii_lowercase();
                g.contains("nvidia") || g.contains("geforce") || g.contains("quadro") || g.contains("tesla")
            })
            .unwrap_or(false)
    }

    /// A node is offline once its heartbeat is older than `timeout`.
    pub fn is_stale(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        now - self.last_heartbeat > timeout
    }
}
