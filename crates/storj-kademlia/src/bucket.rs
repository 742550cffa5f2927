use std::collections::VecDeque;

use storj_crypto::NodeId;

/// One Kademlia k-bucket: up to `k` routing entries (MRU at the back) plus a
/// replacement cache of the same capacity (§4.4, "Routing table").
#[derive(Debug, Default)]
pub struct KBucket {
    pub(crate) entries: VecDeque<NodeId>,
    pub(crate) replacement_cache: VecDeque<NodeId>,
}

impl KBucket {
    pub fn is_full(&self, k: usize) -> bool {
        self.entries.len() >= k
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.entries.contains(id)
    }

    /// Move an existing entry to the MRU end.
    pub fn touch(&mut self, id: &NodeId) {
        if let Some(pos) = self.entries.iter().position(|e| e == id) {
            let entry = self.entries.remove(pos).expect("position came from iter");
            self.entries.push_back(entry);
        }
    }

    pub fn insert_entry(&mut self, id: NodeId) {
        self.entries.push_back(id);
    }

    /// Add to the replacement cache, evicting the oldest entry once the
    /// cache exceeds `k` (observed in the original's replacement-cache
    /// test: oldest-first eviction on overflow).
    pub fn add_to_replacement_cache(&mut self, id: NodeId, k: usize) {
        if self.replacement_cache.contains(&id) {
            return;
        }
        self.replacement_cache.push_back(id);
        while self.replacement_cache.len() > k {
            self.replacement_cache.pop_front();
        }
    }

    /// Evict `id` from the live entries and, if the replacement cache holds
    /// a waiting node, promote the oldest one into its place.
    pub fn evict_and_promote(&mut self, id: &NodeId) -> Option<NodeId> {
        if let Some(pos) = self.entries.iter().position(|e| e == id) {
            self.entries.remove(pos);
        }
        let promoted = self.replacement_cache.pop_front();
        if let Some(promoted) = promoted {
            self.entries.push_back(promoted);
            Some(promoted)
        } else {
            None
        }
    }
}
