use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("node not found: {0}")]
    NodeNotFound(uuid::Uuid),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
