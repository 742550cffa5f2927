use storj_crypto::CryptoError;
use storj_erasure::ErasureError;
use storj_kv::KvError;
use thiserror::Error;

/// Error taxonomy of §7, restricted to the subset `storj-metainfo` can
/// itself raise (authentication is out of scope per §1).
#[derive(Debug, Error)]
pub enum MetainfoError {
    #[error("bucket name must not be empty")]
    NoBucket,
    #[error("bucket not found: {0}")]
    BucketNotFound(String),
    #[error("bucket already exists: {0}")]
    BucketExists(String),
    #[error("object path must not be empty")]
    NoPath,
    #[error("object not found: {0}")]
    ObjectNotFound(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("could not gather enough shares to reconstruct segment: have {have}, need {need}")]
    InsufficientShares { have: usize, need: usize },
    #[error("could not place enough shares: placed {placed}, need {need}")]
    InsufficientPlacements { placed: usize, need: usize },
    #[error("pointer version conflict, caller should retry")]
    PointerConflict,
    #[error("segment is irreparable: only {surviving} of {required} shares remain")]
    Irreparable { surviving: usize, required: usize },
    #[error("operation timed out")]
    Timeout,
    #[error("operation cancelled")]
    Cancelled,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Erasure(#[from] ErasureError),
    #[error(transparent)]
    Kv(#[from] KvError),
    #[error("pointer is corrupt: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, MetainfoError>;
