//! Iterates REMOTE pointers, determines which listed nodes are currently
//! unavailable, and routes segments to repair or to the irreparable log
//! (§4.6 "Checker").

use std::collections::HashSet;
use std::sync::Arc;

use storj_kademlia::{Overlay, Reputation};
use storj_kv::{Direction, ListQuery};
use storj_metainfo::PointerDb;

use crate::error::Result;
use crate::irreparable::{IrreparableLog, IrreparableRecord};
use crate::repair_queue::{RepairQueue, RepairQueueEntry};

const LIST_PAGE_SIZE: usize = 256;

pub struct CheckerSummary {
    pub scanned: usize,
    pub enqueued: usize,
    pub irreparable: usize,
}

pub struct Checker {
    pointer_db: Arc<dyn PointerDb>,
    overlay: Arc<Overlay>,
    reputation: Arc<dyn Reputation>,
    repair_queue: Arc<RepairQueue>,
    irreparable: Arc<IrreparableLog>,
    limit: usize,
}

impl Checker {
    pub fn new(
        pointer_db: Arc<dyn PointerDb>,
        overlay: Arc<Overlay>,
        reputation: Arc<dyn Reputation>,
        repair_queue: Arc<RepairQueue>,
        irreparable: Arc<IrreparableLog>,
        limit: usize,
    ) -> Self {
        Self {
            pointer_db,
            overlay,
            reputation,
            repair_queue,
            irreparable,
            limit,
        }
    }

    /// Scan up to `self.limit` pointers (`0` meaning "all") and route every
    /// REMOTE one found below its repair threshold to the repair queue or
    /// the irreparable log (§4.6 "Checker" steps 1-4).
    pub async fn run_once(&self, now: i64) -> Result<CheckerSummary> {
        let mut summary = CheckerSummary {
            scanned: 0,
            enqueued: 0,
            irreparable: 0,
        };
        let mut cursor = Vec::new();

        loop {
            if self.limit != 0 && summary.scanned >= self.limit {
                break;
            }
            let page_limit = if self.limit == 0 {
                LIST_PAGE_SIZE
            } else {
                (self.limit - summary.scanned).min(LIST_PAGE_SIZE)
            };
            let query = ListQuery {
                prefix: Vec::new(),
                cursor: cursor.clone(),
                direction: Direction::After,
                limit: page_limit,
                recursive: true,
            };
            let result = self.pointer_db.list(&query).await?;
            if result.items.is_empty() {
                break;
            }

            for item in &result.items {
                if item.is_prefix() {
                    continue;
                }
                summary.scanned += 1;
                let Some(pointer) = self.pointer_db.get(&item.key).await? else {
                    continue;
                };
                let Some(remote) = pointer.remote.as_ref() else {
                    continue;
                };

                let node_ids: Vec<_> = remote.pieces.iter().map(|p| p.node_id).collect();
                let presence = self.overlay.bulk_lookup(&node_ids);
                let lost: HashSet<_> = remote
                    .pieces
                    .iter()
                    .zip(presence.iter())
                    .filter(|(entry, present)| present.is_none() || self.reputation.is_suspended(&entry.node_id))
                    .map(|(entry, _)| entry.node_id)
                    .collect();

                let scheme = remote.redundancy;
                let surviving = scheme.total - lost.len();

                if surviving <= scheme.repair_threshold && surviving >= scheme.required {
                    let lost_piece_numbers =
                        remote.pieces.iter().filter(|p| lost.contains(&p.node_id)).map(|p| p.piece_number).collect();
                    if self
                        .repair_queue
                        .enqueue(RepairQueueEntry {
                            path: item.key.clone(),
                            lost_piece_numbers,
                        })
                        .await?
                    {
                        summary.enqueued += 1;
                    }
                } else if surviving < scheme.required {
                    let lost_piece_numbers =
                        remote.pieces.iter().filter(|p| lost.contains(&p.node_id)).map(|p| p.piece_number).collect();
                    let surviving_piece_numbers =
                        remote.pieces.iter().filter(|p| !lost.contains(&p.node_id)).map(|p| p.piece_number).collect();
                    self.irreparable
                        .append(IrreparableRecord {
                            path: item.key.clone(),
                            lost_piece_numbers,
                            surviving_piece_numbers,
                            last_seen_version: pointer.version,
                            recorded_at: now,
                        })
                        .await?;
                    summary.irreparable += 1;
                }
            }

            cursor = result.items.last().unwrap().key.clone();
            if !result.more {
                break;
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storj_crypto::NodeId;
    use storj_erasure::RedundancyScheme;
    use storj_kademlia::{NoReputation, NodeRecord, RoutingTable};
    use storj_kv::MemoryKv;
    use storj_metainfo::{KvPointerDb, SegmentStore};
    use storj_piecestore::LocalNetwork;

    fn node(byte: u8) -> NodeId {
        NodeId([byte; 32])
    }

    async fn build() -> (Checker, Arc<RepairQueue>, Arc<IrreparableLog>, Arc<LocalNetwork>, Vec<NodeId>, Arc<KvPointerDb>) {
        let ids: Vec<NodeId> = (1..=5).map(node).collect();
        let rt = Arc::new(RoutingTable::new(NodeId([0xffu8; 32]), 20, 3));
        let net = Arc::new(LocalNetwork::new());
        for (i, id) in ids.iter().enumerate() {
            rt.mark_seen(NodeRecord::new(*id, format!("node-{i}")));
            net.add_node(*id);
        }
        let overlay = Arc::new(Overlay::new(rt.clone(), Arc::new(NoReputation)));
        let segment_store = Arc::new(SegmentStore::new(overlay.clone(), net.clone(), 4));

        let pointer_db = Arc::new(KvPointerDb::new(Arc::new(MemoryKv::new())));
        let scheme = RedundancyScheme {
            required: 3,
            repair_threshold: 4,
            success_threshold: 4,
            total: 5,
            share_size: 20,
        };
        let pointer = segment_store
            .put(&vec![0x22u8; 100], scheme, 0, 0, Vec::new(), &HashSet::new())
            .await
            .unwrap();
        pointer_db.put(b"bucket/obj/l", pointer).await.unwrap();

        let repair_queue = Arc::new(RepairQueue::new(Arc::new(storj_kv::MemoryQueue::new())));
        let irreparable = Arc::new(IrreparableLog::new(Arc::new(MemoryKv::new())));
        let checker = Checker::new(
            pointer_db.clone(),
            overlay,
            Arc::new(NoReputation),
            repair_queue.clone(),
            irreparable.clone(),
            0,
        );
        (checker, repair_queue, irreparable, net, ids, pointer_db)
    }

    #[tokio::test]
    async fn healthy_segment_is_left_alone() {
        let (checker, repair_queue, irreparable, _net, _ids, _db) = build().await;
        let summary = checker.run_once(1000).await.unwrap();
        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.enqueued, 0);
        assert_eq!(summary.irreparable, 0);
        assert_eq!(repair_queue.len().await.unwrap(), 0);
        assert_eq!(irreparable.list(Vec::new(), Direction::After, 0).await.unwrap().0.len(), 0);
    }

    #[tokio::test]
    async fn one_missing_node_triggers_a_repair_enqueue() {
        let (checker, repair_queue, irreparable, _net, ids, _db) = build().await;
        // Drop two of five nodes from the routing table's view: the overlay
        // no longer sees them, so bulk_lookup reports them absent.
        let rt = Arc::new(RoutingTable::new(NodeId([0xffu8; 32]), 20, 3));
        for id in &ids[2..] {
            rt.mark_seen(NodeRecord::new(*id, "kept"));
        }
        let overlay = Arc::new(Overlay::new(rt, Arc::new(NoReputation)));
        let rebuilt_checker = Checker::new(
            checker_pointer_db(&checker),
            overlay,
            Arc::new(NoReputation),
            repair_queue.clone(),
            irreparable.clone(),
            0,
        );

        let summary = rebuilt_checker.run_once(1000).await.unwrap();
        assert_eq!(summary.enqueued, 1);
        assert_eq!(repair_queue.len().await.unwrap(), 1);
    }

    fn checker_pointer_db(checker: &Checker) -> Arc<dyn PointerDb> {
        checker.pointer_db.clone()
    }
}
