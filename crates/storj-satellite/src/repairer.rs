//! Worker pool that drains the repair queue, repairs segments via the
//! segment store, and falls back to the irreparable log on persistent
//! failure (§4.6 "Repairer").

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use backoff::backoff::Backoff as _;
use backoff::ExponentialBackoff;
use parking_lot::Mutex;
use storj_metainfo::{PointerDb, SegmentStore};
use tracing::{error, warn};

use crate::error::{Result, SatelliteError};
use crate::irreparable::{IrreparableLog, IrreparableRecord};
use crate::repair_queue::{RepairQueue, RepairQueueEntry};

pub struct RepairerConfig {
    pub max_retries: u32,
    pub worker_count: usize,
}

pub struct Repairer {
    pointer_db: Arc<dyn PointerDb>,
    segment_store: Arc<SegmentStore>,
    queue: Arc<RepairQueue>,
    irreparable: Arc<IrreparableLog>,
    leases: Mutex<HashSet<Vec<u8>>>,
    config: RepairerConfig,
}

impl Repairer {
    pub fn new(
        pointer_db: Arc<dyn PointerDb>,
        segment_store: Arc<SegmentStore>,
        queue: Arc<RepairQueue>,
        irreparable: Arc<IrreparableLog>,
        config: RepairerConfig,
    ) -> Self {
        Self {
            pointer_db,
            segment_store,
            queue,
            irreparable,
            leases: Mutex::new(HashSet::new()),
            config,
        }
    }

    /// Drain the queue with `worker_count` concurrent workers until it is
    /// empty (§4.6 "Repairer" step-by-step, run once per repairer tick).
    pub async fn drain(&self) {
        let workers = (0..self.config.worker_count.max(1)).map(|_| self.run_worker());
        futures::future::join_all(workers).await;
    }

    async fn run_worker(&self) {
        loop {
            let entry = match self.queue.dequeue().await {
                Ok(Some(entry)) => entry,
                Ok(None) => return,
                Err(err) => {
                    error!(error = %err, "repair queue dequeue failed");
                    return;
                }
            };

            if !self.leases.lock().insert(entry.path.clone()) {
                // Another worker already holds this path; hand the duplicate
                // back and let that worker finish (§5 "prevent two workers
                // repairing the same segment").
                if let Err(err) = self.queue.requeue(entry).await {
                    error!(error = %err, "failed to requeue duplicate repair entry");
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
                continue;
            }

            self.repair_with_retries(entry).await;
        }
    }

    async fn repair_with_retries(&self, entry: RepairQueueEntry) {
        let path = entry.path.clone();
        let mut attempt = 0;
        let mut backoff = ExponentialBackoff::default();

        loop {
            attempt += 1;
            match self.try_repair(&entry).await {
                Ok(()) => {
                    self.leases.lock().remove(&path);
                    return;
                }
                Err(err) => {
                    warn!(error = %err, attempt, path = ?path, "segment repair attempt failed");
                    if attempt >= self.config.max_retries.max(1) {
                        self.leases.lock().remove(&path);
                        if let Err(log_err) = self.mark_irreparable(&entry).await {
                            error!(error = %log_err, "failed to record irreparable segment");
                        }
                        return;
                    }
                    let delay = backoff.next_backoff().unwrap_or(Duration::from_secs(1));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn try_repair(&self, entry: &RepairQueueEntry) -> Result<()> {
        let pointer = self
            .pointer_db
            .get(&entry.path)
            .await?
            .ok_or_else(|| SatelliteError::PointerNotFound(entry.path.clone()))?;
        let remote = pointer.remote.clone().ok_or(SatelliteError::NotRemote)?;

        let repaired = self.segment_store.repair(pointer.size as usize, &remote, &HashSet::new()).await?;

        let mut new_pointer = pointer.clone();
        new_pointer.remote = Some(repaired);
        self.pointer_db.compare_and_set(&entry.path, pointer.version, new_pointer).await?;
        Ok(())
    }

    async fn mark_irreparable(&self, entry: &RepairQueueEntry) -> Result<()> {
        let pointer = self.pointer_db.get(&entry.path).await?;
        let (surviving_piece_numbers, last_seen_version) = match &pointer {
            Some(p) => {
                let surviving = p
                    .remote
                    .as_ref()
                    .map(|r| {
                        r.pieces
                            .iter()
                            .map(|piece| piece.piece_number)
                            .filter(|n| !entry.lost_piece_numbers.contains(n))
                            .collect()
                    })
                    .unwrap_or_default();
                (surviving, p.version)
            }
            None => (Vec::new(), 0),
        };
        self.irreparable
            .append(IrreparableRecord {
                path: entry.path.clone(),
                lost_piece_numbers: entry.lost_piece_numbers.clone(),
                surviving_piece_numbers,
                last_seen_version,
                recorded_at: now_unix(),
            })
            .await
    }
}

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}
