//! Repair-queue entry schema layered on the opaque-bytes `storj_kv::WorkQueue`,
//! with path-based de-duplication the queue trait itself does not provide
//! (§4.6 "Checker" step 3 "enqueue ... (deduplicated)").

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use storj_kv::{KvError, WorkQueue};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairQueueEntry {
    pub path: Vec<u8>,
    pub lost_piece_numbers: Vec<u32>,
}

/// Tracks which paths currently have an entry somewhere in `queue` (enqueued
/// or leased out to a repairer) so the checker never enqueues the same
/// segment twice.
pub struct RepairQueue {
    queue: Arc<dyn WorkQueue>,
    pending: Mutex<HashSet<Vec<u8>>>,
}

impl RepairQueue {
    pub fn new(queue: Arc<dyn WorkQueue>) -> Self {
        Self {
            queue,
            pending: Mutex::new(HashSet::new()),
        }
    }

    /// Enqueue `entry` unless its path is already pending; returns whether
    /// it was newly enqueued.
    pub async fn enqueue(&self, entry: RepairQueueEntry) -> Result<bool> {
        {
            let mut pending = self.pending.lock();
            if pending.contains(&entry.path) {
                return Ok(false);
            }
            pending.insert(entry.path.clone());
        }
        let encoded = bincode::serialize(&entry).expect("RepairQueueEntry serialization cannot fail");
        self.queue.enqueue(encoded).await?;
        Ok(true)
    }

    /// Remove and return the oldest entry, clearing its pending marker. The
    /// caller (a repairer worker) is now solely responsible for it until it
    /// either commits a repair or calls [`Self::requeue`].
    pub async fn dequeue(&self) -> Result<Option<RepairQueueEntry>> {
        match self.queue.dequeue().await? {
            Some(bytes) => {
                let entry: RepairQueueEntry =
                    bincode::deserialize(&bytes).map_err(|e| KvError::InvalidArgument(e.to_string()))?;
                self.pending.lock().remove(&entry.path);
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Return `entry` to the back of the queue, re-marking its path pending
    /// (§4.6 "Repairer" step 3, "re-enqueue ... with exponential back-off").
    pub async fn requeue(&self, entry: RepairQueueEntry) -> Result<()> {
        self.pending.lock().insert(entry.path.clone());
        let encoded = bincode::serialize(&entry).expect("RepairQueueEntry serialization cannot fail");
        self.queue.enqueue(encoded).await?;
        Ok(())
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.queue.len().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storj_kv::MemoryQueue;

    fn queue() -> RepairQueue {
        RepairQueue::new(Arc::new(MemoryQueue::new()))
    }

    #[tokio::test]
    async fn duplicate_path_is_not_enqueued_twice() {
        let rq = queue();
        let entry = RepairQueueEntry {
            path: b"bucket/obj/l".to_vec(),
            lost_piece_numbers: vec![1],
        };
        assert!(rq.enqueue(entry.clone()).await.unwrap());
        assert!(!rq.enqueue(entry).await.unwrap());
        assert_eq!(rq.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn dequeue_clears_pending_marker_so_the_path_can_be_enqueued_again() {
        let rq = queue();
        let entry = RepairQueueEntry {
            path: b"bucket/obj/l".to_vec(),
            lost_piece_numbers: vec![1],
        };
        rq.enqueue(entry.clone()).await.unwrap();
        let dequeued = rq.dequeue().await.unwrap().unwrap();
        assert_eq!(dequeued.path, entry.path);
        assert!(rq.enqueue(entry).await.unwrap());
    }

    #[tokio::test]
    async fn requeue_keeps_path_marked_pending() {
        let rq = queue();
        let entry = RepairQueueEntry {
            path: b"bucket/obj/l".to_vec(),
            lost_piece_numbers: vec![1],
        };
        rq.enqueue(entry.clone()).await.unwrap();
        rq.dequeue().await.unwrap();
        rq.requeue(entry.clone()).await.unwrap();
        assert!(!rq.enqueue(entry).await.unwrap());
    }
}
