use std::collections::HashMap;

use parking_lot::RwLock;
use storj_crypto::NodeId;

use crate::bucket::KBucket;
use crate::node::NodeRecord;

/// Kademlia routing table over a fixed local `NodeID` (§4.4).
///
/// Buckets are keyed by common-prefix-length with the local ID — the index
/// a standard Kademlia implementation would reach by recursively splitting
/// the single root bucket. Node data lives in one arena (`records`) so
/// buckets only ever hold `NodeId`s, never a reference into each other —
/// the redesign called for in §9 to avoid the original's pointer-heavy
/// bucket tree.
pub struct RoutingTable {
    self_id: NodeId,
    k: usize,
    failure_threshold: u32,
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<NodeId, NodeRecord>,
    buckets: HashMap<u32, KBucket>,
}

impl RoutingTable {
    pub fn new(self_id: NodeId, k: usize, failure_threshold: u32) -> Self {
        Self {
            self_id,
            k,
            failure_threshold,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn self_id(&self) -> NodeId {
        self.self_id
    }

    fn bucket_id(&self, id: NodeId) -> u32 {
        self.self_id.common_prefix_len(&id)
    }

    /// Record a successful communication with `record.id` (§4.4 "Connection
    /// bookkeeping"): move to the bucket's MRU end if already present,
    /// otherwise insert if the bucket has room, otherwise queue it in the
    /// replacement cache. Returns `true` if the node now has a live entry.
    pub fn mark_seen(&self, record: NodeRecord) -> bool {
        if record.id == self.self_id {
            return false;
        }
        let bucket_id = self.bucket_id(record.id);
        let mut inner = self.inner.write();
        let id = record.id;
        inner.records.insert(id, record);

        let bucket = inner.buckets.entry(bucket_id).or_default();
        if bucket.contains(&id) {
            bucket.touch(&id);
            return true;
        }
        if bucket.is_full(self.k) {
            bucket.add_to_replacement_cache(id, self.k);
            false
        } else {
            bucket.insert_entry(id);
            true
        }
    }

    /// Record a failed communication (§4.4): after `failure_threshold`
    /// consecutive failures the node is evicted and the oldest
    /// replacement-cache entry for that bucket is promoted.
    pub fn mark_failed(&self, id: NodeId) {
        let bucket_id = self.bucket_id(id);
        let mut inner = self.inner.write();

        let evict = match inner.records.get_mut(&id) {
            Some(record) => {
                record.consecutive_failures += 1;
                record.consecutive_failures >= self.failure_threshold
            }
            None => return,
        };

        if evict {
            if let Some(bucket) = inner.buckets.get_mut(&bucket_id) {
                bucket.evict_and_promote(&id);
            }
            inner.records.remove(&id);
        }
    }

    /// Up to `limit` known nodes closest to `target` by XOR distance,
    /// drawn only from live bucket entries (§4.4 "FindNear").
    pub fn find_near(&self, target: NodeId, limit: usize) -> Vec<NodeRecord> {
        let inner = self.inner.read();
        let mut candidates: Vec<NodeRecord> = inner
            .buckets
            .values()
            .flat_map(|b| b.entries.iter())
            .filter_map(|id| inner.records.get(id).cloned())
            .collect();
        candidates.sort_by_key(|r| target.xor_distance(&r.id));
        candidates.truncate(limit);
        candidates
    }

    pub fn get(&self, id: &NodeId) -> Option<NodeRecord> {
        self.inner.read().records.get(id).cloned()
    }

    /// Every node currently holding a live bucket entry, in no particular
    /// order. Backs the overlay cache's [`crate::overlay::Overlay::choose`].
    pub fn all(&self) -> Vec<NodeRecord> {
        let inner = self.inner.read();
        inner
            .buckets
            .values()
            .flat_map(|b| b.entries.iter())
            .filter_map(|id| inner.records.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().buckets.values().map(|b| b.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
