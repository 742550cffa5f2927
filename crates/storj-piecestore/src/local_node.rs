//! An in-process reference storage-node network (§4.7).
//!
//! [`LocalNetwork`] hosts one [`storj_kv::KeyValueStore`] per simulated node
//! and implements [`PieceClient`] by dispatching to the addressed node's
//! store. It is the minimal concrete peer the integration tests in §8 run
//! against — not a production storage-node server.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use storj_crypto::NodeId;
use storj_kv::{KeyValueStore, MemoryKv};
use tokio::time::timeout;

use crate::PieceId;
use crate::error::{PieceError, Result};
use crate::traits::PieceClient;

/// One simulated storage node: an independent piece store plus a switch to
/// simulate it being offline (for the audit/checker scenarios of §8).
struct SimulatedNode {
    store: Arc<MemoryKv>,
    online: bool,
}

/// A fixed population of simulated storage nodes sharing one process.
pub struct LocalNetwork {
    nodes: RwLock<HashMap<NodeId, SimulatedNode>>,
}

impl Default for LocalNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_node(&self, node: NodeId) {
        self.nodes.write().entry(node).or_insert_with(|| SimulatedNode {
            store: Arc::new(MemoryKv::new()),
            online: true,
        });
    }

    /// Simulate a node going offline: uploads/downloads against it fail with
    /// [`PieceError::Transport`] until it is brought back with
    /// [`Self::set_online`].
    pub fn set_online(&self, node: NodeId, online: bool) {
        if let Some(entry) = self.nodes.write().get_mut(&node) {
            entry.online = online;
        }
    }

    pub fn is_online(&self, node: NodeId) -> bool {
        self.nodes.read().get(&node).map(|n| n.online).unwrap_or(false)
    }

    /// Replace a node's stored piece with arbitrary bytes, used by the audit
    /// tampering scenario of §8 to corrupt a share in place.
    pub async fn corrupt(&self, node: NodeId, piece_id: PieceId, data: &[u8]) -> Result<()> {
        let store = {
            let nodes = self.nodes.read();
            Arc::clone(&nodes.get(&node).ok_or(PieceError::UnknownNode(node))?.store)
        };
        store.put(&piece_id.0, data).await.map_err(|e| PieceError::Transport {
            node,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl PieceClient for LocalNetwork {
    async fn upload(
        &self,
        node: NodeId,
        piece_id: PieceId,
        data: Bytes,
        deadline: Duration,
    ) -> Result<()> {
        let store = {
            let nodes = self.nodes.read();
            let entry = nodes.get(&node).ok_or(PieceError::UnknownNode(node))?;
            if !entry.online {
                return Err(PieceError::Transport {
                    node,
                    message: "node unreachable".to_string(),
                });
            }
            Arc::clone(&entry.store)
        };

        timeout(deadline, store.put(&piece_id.0, &data))
            .await
            .map_err(|_| PieceError::Timeout)?
            .map_err(|e| PieceError::Transport {
                node,
                message: e.to_string(),
            })
    }

    async fn download(
        &self,
        node: NodeId,
        piece_id: PieceId,
        offset: u64,
        length: u64,
    ) -> Result<Bytes> {
        let store = {
            let nodes = self.nodes.read();
            let entry = nodes.get(&node).ok_or(PieceError::UnknownNode(node))?;
            if !entry.online {
                return Err(PieceError::Transport {
                    node,
                    message: "node unreachable".to_string(),
                });
            }
            Arc::clone(&entry.store)
        };

        let full = store
            .get(&piece_id.0)
            .await
            .map_err(|e| PieceError::Transport {
                node,
                message: e.to_string(),
            })?
            .ok_or(PieceError::NotFound { node, piece_id })?;

        let start = offset as usize;
        let end = (start + length as usize).min(full.len());
        if start > full.len() {
            return Err(PieceError::WrongLength {
                expected: length as usize,
                actual: 0,
            });
        }
        Ok(Bytes::copy_from_slice(&full[start..end]))
    }

    async fn delete(&self, node: NodeId, piece_id: PieceId) -> Result<()> {
        let store = {
            let nodes = self.nodes.read();
            match nodes.get(&node) {
                Some(entry) => Arc::clone(&entry.store),
                None => return Ok(()),
            }
        };
        store.delete(&piece_id.0).await.map_err(|e| PieceError::Transport {
            node,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(byte: u8) -> NodeId {
        NodeId([byte; 32])
    }

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let net = LocalNetwork::new();
        net.add_node(node(1));
        let piece = PieceId::generate();
        net.upload(node(1), piece, Bytes::from_static(b"hello"), Duration::from_secs(1))
            .await
            .unwrap();

        let out = net.download(node(1), piece, 0, 5).await.unwrap();
        assert_eq!(out.as_ref(), b"hello");
    }

    #[tokio::test]
    async fn offline_node_rejects_traffic() {
        let net = LocalNetwork::new();
        net.add_node(node(2));
        net.set_online(node(2), false);
        let piece = PieceId::generate();
        let result = net
            .upload(node(2), piece, Bytes::from_static(b"x"), Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(PieceError::Transport { .. })));
    }
}
