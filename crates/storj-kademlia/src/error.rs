use thiserror::Error;
use storj_crypto::NodeId;

#[derive(Debug, Error)]
pub enum KademliaError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("no bootstrap nodes configured")]
    NoBootstrapNodes,
    #[error("lookup cancelled")]
    Cancelled,
    #[error("transport error talking to {node}: {message}")]
    Transport { node: NodeId, message: String },
}

pub type Result<T> = std::result::Result<T, KademliaError>;
