use thiserror::Error;

/// Error taxonomy for the key-value and work-queue abstractions (§7).
#[derive(Debug, Error)]
pub enum KvError {
    #[error("key not found")]
    NotFound,
    #[error("compare-and-swap conflict")]
    Conflict,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("backend error: {0}")]
    Backend(#[from] sled::Error),
}

pub type Result<T> = std::result::Result<T, KvError>;
