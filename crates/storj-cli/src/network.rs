//! Durable analogue of `storj_piecestore::LocalNetwork` (§4.7): the reference
//! in-process network backs every simulated node with a `MemoryKv`, which
//! cannot survive across the separate process invocations a CLI command
//! runs as. This module mirrors its one-store-per-node shape but backs each
//! node's piece store with a `sled::Tree` instead, the same durable-adapter
//! substitution `storj-kv`'s `SledKv` makes for the pointer/bucket stores.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sled::Tree;
use storj_crypto::NodeId;
use storj_piecestore::{PieceClient, PieceError, PieceId, Result as PieceResult};

pub struct DurableNetwork {
    trees: HashMap<NodeId, Tree>,
}

impl DurableNetwork {
    /// Open (or create) one tree per node under `db`.
    pub fn open(db: &sled::Db, node_ids: &[NodeId]) -> sled::Result<Self> {
        let mut trees = HashMap::with_capacity(node_ids.len());
        for id in node_ids {
            let tree = db.open_tree(format!("piece-node-{id}"))?;
            trees.insert(*id, tree);
        }
        Ok(Self { trees })
    }

    fn tree(&self, node: NodeId) -> PieceResult<&Tree> {
        self.trees.get(&node).ok_or(PieceError::UnknownNode(node))
    }
}

#[async_trait]
impl PieceClient for DurableNetwork {
    async fn upload(&self, node: NodeId, piece_id: PieceId, data: Bytes, _deadline: Duration) -> PieceResult<()> {
        let tree = self.tree(node)?;
        tree.insert(piece_id.0, data.as_ref()).map_err(|e| PieceError::Transport {
            node,
            message: e.to_string(),
        })?;
        Ok(())
    }

    async fn download(&self, node: NodeId, piece_id: PieceId, offset: u64, length: u64) -> PieceResult<Bytes> {
        let tree = self.tree(node)?;
        let full = tree
            .get(piece_id.0)
            .map_err(|e| PieceError::Transport {
                node,
                message: e.to_string(),
            })?
            .ok_or(PieceError::NotFound { node, piece_id })?;

        let start = offset as usize;
        if start > full.len() {
            return Err(PieceError::WrongLength {
                expected: length as usize,
                actual: 0,
            });
        }
        let end = (start + length as usize).min(full.len());
        Ok(Bytes::copy_from_slice(&full[start..end]))
    }

    async fn delete(&self, node: NodeId, piece_id: PieceId) -> PieceResult<()> {
        if let Ok(tree) = self.tree(node) {
            tree.remove(piece_id.0).map_err(|e| PieceError::Transport {
                node,
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(byte: u8) -> NodeId {
        NodeId([byte; 32])
    }

    fn open_db() -> sled::Db {
        let dir = tempfile::tempdir().unwrap();
        sled::open(dir.path()).unwrap()
    }

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let db = open_db();
        let ids = [node(1), node(2)];
        let net = DurableNetwork::open(&db, &ids).unwrap();
        let piece = PieceId::generate();

        net.upload(node(1), piece, Bytes::from_static(b"hello world"), Duration::from_secs(1))
            .await
            .unwrap();
        let out = net.download(node(1), piece, 0, 11).await.unwrap();
        assert_eq!(out.as_ref(), b"hello world");
    }

    #[tokio::test]
    async fn unknown_node_is_an_error() {
        let db = open_db();
        let net = DurableNetwork::open(&db, &[node(1)]).unwrap();
        let piece = PieceId::generate();
        let result = net.upload(node(9), piece, Bytes::from_static(b"x"), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(PieceError::UnknownNode(_))));
    }
}
