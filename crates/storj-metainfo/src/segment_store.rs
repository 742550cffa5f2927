//! One segment ↔ either an inline pointer or an erasure-coded fan-out
//! across storage nodes (§4.2).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use storj_crypto::NodeId;
use storj_erasure::{ErasureCode, RedundancyScheme};
use storj_kademlia::Overlay;
use storj_piecestore::{PieceClient, PieceId};

use crate::error::{MetainfoError, Result};
use crate::pointer::{PieceEntry, Pointer, RemoteSegment};

const UPLOAD_DEADLINE: Duration = Duration::from_secs(30);

pub struct SegmentStore {
    overlay: Arc<Overlay>,
    piece_client: Arc<dyn PieceClient>,
    max_inline_size: usize,
}

impl SegmentStore {
    pub fn new(overlay: Arc<Overlay>, piece_client: Arc<dyn PieceClient>, max_inline_size: usize) -> Self {
        Self {
            overlay,
            piece_client,
            max_inline_size,
        }
    }

    /// Write `plaintext` as one segment (§4.2 "Write"). `excluded` carries
    /// nodes already used elsewhere in the same object, per the write step
    /// that requests fresh candidates "honoring exclusions".
    pub async fn put(
        &self,
        plaintext: &[u8],
        scheme: RedundancyScheme,
        creation_date: i64,
        expiration_date: i64,
        metadata: Vec<u8>,
        excluded: &HashSet<NodeId>,
    ) -> Result<Pointer> {
        if plaintext.len() <= self.max_inline_size {
            return Ok(Pointer::inline(plaintext.to_vec(), creation_date, expiration_date, metadata));
        }

        scheme.validate()?;
        let code = ErasureCode::new(scheme)?;
        let shares = code.encode(plaintext)?;
        let piece_id = PieceId::generate();

        let candidates = self.overlay.choose(scheme.total, &[], excluded);
        let placed = self.upload_shares(piece_id, &shares, &candidates).await;

        if placed.len() < scheme.success_threshold {
            for entry in &placed {
                let _ = self.piece_client.delete(entry.node_id, piece_id).await;
            }
            return Err(MetainfoError::InsufficientPlacements {
                placed: placed.len(),
                need: scheme.success_threshold,
            });
        }

        let remote = RemoteSegment {
            redundancy: scheme,
            piece_id,
            pieces: placed,
        };
        Ok(Pointer::remote(remote, plaintext.len() as i64, creation_date, expiration_date, metadata))
    }

    async fn upload_shares(
        &self,
        piece_id: PieceId,
        shares: &[Vec<u8>],
        candidates: &[storj_kademlia::NodeRecord],
    ) -> Vec<PieceEntry> {
        let uploads = shares.iter().zip(candidates.iter()).enumerate().map(|(i, (share, node))| {
            let piece_client = Arc::clone(&self.piece_client);
            let data = Bytes::copy_from_slice(share);
            let node_id = node.id;
            async move {
                piece_client
                    .upload(node_id, piece_id, data, UPLOAD_DEADLINE)
                    .await
                    .ok()
                    .map(|()| PieceEntry {
                        piece_number: i as u32,
                        node_id,
                    })
            }
        });
        join_all(uploads).await.into_iter().flatten().collect()
    }

    /// Read a segment back (§4.2 "Read").
    pub async fn get(&self, pointer: &Pointer) -> Result<Vec<u8>> {
        match (&pointer.inline_segment, &pointer.remote) {
            (Some(data), _) => Ok(data.clone()),
            (None, Some(remote)) => self.get_remote(pointer.size as usize, remote).await,
            (None, None) => Err(MetainfoError::Corrupt("pointer has neither inline nor remote segment".to_string())),
        }
    }

    async fn get_remote(&self, size: usize, remote: &RemoteSegment) -> Result<Vec<u8>> {
        let scheme = remote.redundancy;
        let code = ErasureCode::new(scheme)?;
        let mut shares: Vec<Option<Vec<u8>>> = vec![None; scheme.total];

        for entry in &remote.pieces {
            if shares.iter().filter(|s| s.is_some()).count() >= scheme.required {
                break;
            }
            if let Ok(bytes) = self
                .piece_client
                .download(entry.node_id, remote.piece_id, 0, scheme.share_size as u64)
                .await
            {
                shares[entry.piece_number as usize] = Some(bytes.to_vec());
            }
        }

        let have = shares.iter().filter(|s| s.is_some()).count();
        if have < scheme.required {
            return Err(MetainfoError::InsufficientShares {
                have,
                need: scheme.required,
            });
        }
        Ok(code.decode(shares, size)?)
    }

    /// Reconstruct the shares lost from `remote` and upload them to fresh
    /// candidates (§4.2 "Repair path", steps 1-4; the caller performs the
    /// compare-and-set pointer swap of step 5).
    pub async fn repair(&self, size: usize, remote: &RemoteSegment, excluded: &HashSet<NodeId>) -> Result<RemoteSegment> {
        let scheme = remote.redundancy;
        let code = ErasureCode::new(scheme)?;

        let mut shares: Vec<Option<Vec<u8>>> = vec![None; scheme.total];
        for entry in &remote.pieces {
            if let Ok(bytes) = self
                .piece_client
                .download(entry.node_id, remote.piece_id, 0, scheme.share_size as u64)
                .await
            {
                shares[entry.piece_number as usize] = Some(bytes.to_vec());
            }
        }

        let have = shares.iter().filter(|s| s.is_some()).count();
        if have < scheme.required {
            return Err(MetainfoError::Irreparable {
                surviving: have,
                required: scheme.required,
            });
        }

        let surviving_numbers: HashSet<u32> = remote.pieces.iter().map(|p| p.piece_number).collect();
        let lost_numbers: Vec<u32> = (0..scheme.total as u32).filter(|n| !surviving_numbers.contains(n)).collect();

        // Reconstruct the full share set so every lost index is recoverable,
        // re-encoding rather than trying to isolate just the missing shards.
        let data = code.decode(shares.clone(), size)?;
        let recoded = code.encode(&data)?;

        let mut full_exclusion = excluded.clone();
        full_exclusion.extend(remote.pieces.iter().map(|p| p.node_id));
        let new_candidates = self.overlay.choose(lost_numbers.len(), &[], &full_exclusion);
        if new_candidates.len() < lost_numbers.len() {
            return Err(MetainfoError::InsufficientPlacements {
                placed: new_candidates.len(),
                need: lost_numbers.len(),
            });
        }

        let uploads = lost_numbers.iter().zip(new_candidates.iter()).map(|(&number, node)| {
            let piece_client = Arc::clone(&self.piece_client);
            let data = Bytes::copy_from_slice(&recoded[number as usize]);
            let node_id = node.id;
            let piece_id = remote.piece_id;
            async move {
                piece_client
                    .upload(node_id, piece_id, data, UPLOAD_DEADLINE)
                    .await
                    .ok()
                    .map(|()| PieceEntry {
                        piece_number: number,
                        node_id,
                    })
            }
        });
        let newly_placed: Vec<PieceEntry> = join_all(uploads).await.into_iter().flatten().collect();
        if newly_placed.len() < lost_numbers.len() {
            return Err(MetainfoError::InsufficientPlacements {
                placed: newly_placed.len(),
                need: lost_numbers.len(),
            });
        }

        let mut pieces = remote.pieces.clone();
        pieces.extend(newly_placed);
        pieces.sort_by_key(|p| p.piece_number);
        Ok(RemoteSegment {
            redundancy: scheme,
            piece_id: remote.piece_id,
            pieces,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storj_kademlia::{NoReputation, NodeRecord, RoutingTable};
    use storj_piecestore::LocalNetwork;

    fn node(byte: u8) -> NodeId {
        NodeId([byte; 32])
    }

    fn scheme(k: usize, r: usize, s: usize, n: usize, share_size: usize) -> RedundancyScheme {
        RedundancyScheme {
            required: k,
            repair_threshold: r,
            success_threshold: s,
            total: n,
            share_size,
        }
    }

    fn store_with_nodes(ids: &[NodeId]) -> (SegmentStore, Arc<LocalNetwork>) {
        let rt = Arc::new(RoutingTable::new(NodeId([0xffu8; 32]), 20, 3));
        let net = Arc::new(LocalNetwork::new());
        for (i, id) in ids.iter().enumerate() {
            rt.mark_seen(NodeRecord::new(*id, format!("node-{i}")));
            net.add_node(*id);
        }
        let overlay = Arc::new(Overlay::new(rt, Arc::new(NoReputation)));
        (SegmentStore::new(overlay, net.clone(), 32), net)
    }

    #[tokio::test]
    async fn short_plaintext_is_stored_inline() {
        let (store, _net) = store_with_nodes(&[node(1), node(2)]);
        let pointer = store
            .put(b"hello", scheme(2, 2, 2, 2, 16), 0, 0, Vec::new(), &HashSet::new())
            .await
            .unwrap();
        assert!(pointer.inline_segment.is_some());
        assert_eq!(store.get(&pointer).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn large_plaintext_round_trips_through_remote_shares() {
        let ids: Vec<NodeId> = (1..=5).map(node).collect();
        let (store, _net) = store_with_nodes(&ids);
        let data = vec![0x42u8; 200];
        let scheme = scheme(3, 4, 4, 5, 100);

        let pointer = store
            .put(&data, scheme, 0, 0, Vec::new(), &HashSet::new())
            .await
            .unwrap();
        assert!(pointer.remote.is_some());
        assert_eq!(pointer.remote.as_ref().unwrap().pieces.len(), 5);
        assert_eq!(store.get(&pointer).await.unwrap(), data);
    }

    #[tokio::test]
    async fn repair_reconstructs_lost_shares_onto_fresh_nodes() {
        // 6 known nodes: 5 hold the initial write, the 6th is the spare
        // candidate the overlay offers once a share is lost.
        let ids: Vec<NodeId> = (1..=6).map(node).collect();
        let (store, _net) = store_with_nodes(&ids);
        let data = vec![0x07u8; 200];
        let scheme = scheme(3, 4, 4, 5, 100);

        let mut excluded = HashSet::new();
        excluded.insert(ids[5]);
        let pointer = store.put(&data, scheme, 0, 0, Vec::new(), &excluded).await.unwrap();
        let mut remote = pointer.remote.unwrap();
        assert_eq!(remote.pieces.len(), 5);

        let lost_node = remote.pieces[0].node_id;
        remote.pieces.retain(|p| p.node_id != lost_node);

        let repaired = store.repair(data.len(), &remote, &HashSet::new()).await.unwrap();
        assert_eq!(repaired.pieces.len(), 5);
        assert!(repaired.pieces.iter().any(|p| p.node_id == ids[5]));

        let repaired_pointer = Pointer::remote(repaired, data.len() as i64, 0, 0, Vec::new());
        assert_eq!(store.get(&repaired_pointer).await.unwrap(), data);
    }
}
