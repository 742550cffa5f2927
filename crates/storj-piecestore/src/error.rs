use thiserror::Error;
use storj_crypto::NodeId;

use crate::PieceId;

/// Error taxonomy for piece transport (§7): `transport`/`timeout`/`cancelled`
/// are retryable by the caller with bounded back-off; the rest are not.
#[derive(Debug, Error)]
pub enum PieceError {
    #[error("piece {piece_id} not found on node {node}")]
    NotFound { node: NodeId, piece_id: PieceId },
    #[error("wrong piece length: expected {expected}, actual {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("node {0} is unknown to this transport")]
    UnknownNode(NodeId),
    #[error("transport error talking to {node}: {message}")]
    Transport { node: NodeId, message: String },
    #[error("operation timed out")]
    Timeout,
    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, PieceError>;
