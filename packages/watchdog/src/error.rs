use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("attach failed: {0}")]
    Attach(#[from] fleet_wrapper::WrapperError),

    #[error("state file io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WatchdogError>;
