use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use storj_crypto::NodeId;

use crate::PieceId;
use crate::error::Result;

/// Piece upload/download/delete RPC surface (§6): "per-piece RPC ... over an
/// authenticated stream". The authenticated-stream transport itself is an
/// external collaborator (§1); this trait is the boundary the segment store
/// (§4.2) and the audit verifier (§4.6) depend on.
///
/// Implementations MUST honor the resource policy of §5: at most one
/// in-flight request per `(node_id, operation)`.
#[async_trait]
pub trait PieceClient: Send + Sync {
    /// Upload `data` as piece `piece_id` to `node`, aborting if `deadline`
    /// elapses first (§4.2 write step 4, "upload deadline = context deadline").
    async fn upload(
        &self,
        node: NodeId,
        piece_id: PieceId,
        data: Bytes,
        deadline: Duration,
    ) -> Result<()>;

    /// Download `length` bytes starting at `offset` from piece `piece_id` on
    /// `node`. Used both for segment reads (§4.2) and audit stripe challenges
    /// (§4.6), which never decrypt what they read.
    async fn download(
        &self,
        node: NodeId,
        piece_id: PieceId,
        offset: u64,
        length: u64,
    ) -> Result<Bytes>;

    /// Best-effort delete, used when a write fails to reach the success
    /// threshold and uploaded shares must be asked to self-delete (§4.2
    /// write step 6).
    async fn delete(&self, node: NodeId, piece_id: PieceId) -> Result<()>;
}
