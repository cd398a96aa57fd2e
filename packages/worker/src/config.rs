use std::time::Duration;

use fleet_proto::NodeType;

use crate::error::{Result, WorkerError};

#[derive(Debug, Clone)]
pub struct Config {
    pub master_url: String,
    pub api_key: String,
    pub node_name: String,
    pub node_address: String,
    pub node_type: NodeType,
    pub heartbeat_period: Duration,
    pub poll_period: Duration,
    pub max_concurrent_jobs: usize,
    /// When true, the worker never registers or contacts the master; it
    /// exists for local testing of the execute/wrapper path in isolation.
    pub standalone: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let standalone = std::env::var("WORKER_STANDALONE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let master_url = std::env::var("MASTER_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());
        let api_key = if standalone {
            String::new()
        } else {
            std::env::var("MASTER_API_KEY")
                .map_err(|_| WorkerError::Config("MASTER_API_KEY must be set unless WORKER_STANDALONE=1".into()))?
        };
        let node_name = std::env::var("NODE_NAME").unwrap_or_else(|_| {
            hostname_fallback()
        });
        let node_address = std::env::var("NODE_ADDRESS").unwrap_or_else(|_| "127.0.0.1:0".to_string());
        let node_type = match std::env::var("NODE_TYPE").as_deref() {
            Ok("desktop") => NodeType::Desktop,
            Ok("laptop") => NodeType::Laptop,
            _ => NodeType::Server,
        };

        let heartbeat_period = Duration::from_secs(parse_env_u64("HEARTBEAT_PERIOD_SECS", 30));
        let poll_period = Duration::from_secs(parse_env_u64("POLL_PERIOD_SECS", 10));
        let max_concurrent_jobs = parse_env_u64("MAX_CONCURRENT_JOBS", 2) as usize;

        Ok(Self {
            master_url,
            api_key,
            node_name,
            node_address,
            node_type,
            heartbeat_period,
            poll_period,
            max_concurrent_jobs,
            standalone,
        })
    }
}

fn parse_env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn hostname_fallback() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "worker".to_string())
}
