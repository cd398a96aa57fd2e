use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("master request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("master returned an error status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("wrapper error: {0}")]
    Wrapper(#[from] fleet_wrapper::WrapperError),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
