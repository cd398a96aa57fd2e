use anyhow::{Context, Result};

pub struct Config {
    pub master_url: String,
    pub api_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let master_url = std::env::var("MASTER_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());
        let api_key = std::env::var("MASTER_API_KEY").context("MASTER_API_KEY must be set")?;
        Ok(Self { master_url, api_key })
    }
}
