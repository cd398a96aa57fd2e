//! Master configuration from environment.

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub db_dsn: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("MASTER_API_KEY").context("MASTER_API_KEY must be set")?;
        let db_dsn = std::env::var("DB_DSN")
            .or_else(|_| std::env::var("DB_PATH").map(|p| format!("sqlite://{p}")))
            .unwrap_or_else(|_| "sqlite://fleet.db".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        Ok(Self { api_key, db_dsn, port })
    }
}
