use thiserror::Error;

#[derive(Debug, Error)]
pub enum WrapperError {
    #[error("failed to spawn child: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("insufficient_disk: {used_pct:.1}% used on {path}")]
    InsufficientDisk { path: String, used_pct: f64 },

    #[error("pid {0} does not exist")]
    NoSuchProcess(i32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WrapperError>;
