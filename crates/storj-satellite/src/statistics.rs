//! Per-node audit/uptime counters (§3.A "Statistics DB record"), persisted
//! through the same `storj-kv` trait as pointers under a distinct prefix so
//! no second storage engine is introduced.

use std::sync::Arc;

use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use storj_crypto::NodeId;
use storj_kv::{KeyValueStore, KvError};

use crate::error::Result;
use crate::retry;

const STATS_PREFIX: &str = "\0stats/";

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NodeStats {
    pub node_id: NodeId,
    pub audit_count: u64,
    pub audit_success_count: u64,
    pub uptime_count: u64,
    pub uptime_success_count: u64,
}

impl NodeStats {
    fn zero(node_id: NodeId) -> Self {
        Self {
            node_id,
            audit_count: 0,
            audit_success_count: 0,
            uptime_count: 0,
            uptime_success_count: 0,
        }
    }

    pub fn audit_success_ratio(&self) -> f64 {
        if self.audit_count == 0 {
            0.0
        } else {
            self.audit_success_count as f64 / self.audit_count as f64
        }
    }

    pub fn uptime_ratio(&self) -> f64 {
        if self.uptime_count == 0 {
            0.0
        } else {
            self.uptime_success_count as f64 / self.uptime_count as f64
        }
    }
}

/// One audit or uptime observation for a single node, produced by the audit
/// loop's verifier and applied by its reporter (§4.6 "Audit" step 3).
#[derive(Debug, Clone, Copy)]
pub enum StatUpdate {
    AuditSuccess(NodeId),
    AuditFailure(NodeId),
    Offline(NodeId),
}

impl StatUpdate {
    fn node_id(self) -> NodeId {
        match self {
            StatUpdate::AuditSuccess(id) | StatUpdate::AuditFailure(id) | StatUpdate::Offline(id) => id,
        }
    }
}

pub struct StatisticsDb {
    store: Arc<dyn KeyValueStore>,
}

impl StatisticsDb {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(node_id: NodeId) -> Vec<u8> {
        let mut key = STATS_PREFIX.as_bytes().to_vec();
        key.extend_from_slice(&node_id.0);
        key
    }

    pub async fn get(&self, node_id: NodeId) -> Result<NodeStats> {
        match self.store.get(&Self::key(node_id)).await? {
            Some(bytes) => bincode::deserialize(&bytes)
                .map_err(|e| KvError::InvalidArgument(e.to_string()))
                .map_err(Into::into),
            None => Ok(NodeStats::zero(node_id)),
        }
    }

    async fn put(&self, stats: &NodeStats) -> Result<()> {
        let encoded = bincode::serialize(stats).expect("NodeStats serialization cannot fail");
        self.store.put(&Self::key(stats.node_id), &encoded).await?;
        Ok(())
    }

    /// Read-modify-write a single observation. Not compare-and-set: within
    /// one batch every update targets a distinct node-key, so there is no
    /// writer contention to guard against.
    async fn apply(&self, update: StatUpdate) -> Result<()> {
        let mut stats = self.get(update.node_id()).await?;
        match update {
            StatUpdate::AuditSuccess(_) => {
                stats.audit_count += 1;
                stats.audit_success_count += 1;
                stats.uptime_count += 1;
                stats.uptime_success_count += 1;
            }
            StatUpdate::AuditFailure(_) => {
                stats.audit_count += 1;
                stats.uptime_count += 1;
                stats.uptime_success_count += 1;
            }
            StatUpdate::Offline(_) => {
                stats.uptime_count += 1;
            }
        }
        self.put(&stats).await
    }

    /// Apply every update in the batch, retrying the whole batch up to
    /// `max_retries` times on error (§4.6 "Audit" step 3).
    pub async fn apply_batch(&self, updates: &[StatUpdate], max_retries: u32) -> Result<()> {
        retry::retry_n(max_retries, ExponentialBackoff::default(), || async {
            for update in updates {
                self.apply(*update).await?;
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storj_kv::MemoryKv;

    fn node(byte: u8) -> NodeId {
        NodeId([byte; 32])
    }

    fn db() -> StatisticsDb {
        StatisticsDb::new(Arc::new(MemoryKv::new()))
    }

    #[tokio::test]
    async fn unknown_node_starts_at_zero() {
        let stats = db().get(node(1)).await.unwrap();
        assert_eq!(stats.audit_count, 0);
        assert_eq!(stats.audit_success_ratio(), 0.0);
    }

    #[tokio::test]
    async fn audit_success_and_failure_update_ratios() {
        let statistics = db();
        let id = node(2);
        statistics
            .apply_batch(&[StatUpdate::AuditSuccess(id), StatUpdate::AuditFailure(id)], 1)
            .await
            .unwrap();
        let stats = statistics.get(id).await.unwrap();
        assert_eq!(stats.audit_count, 2);
        assert_eq!(stats.audit_success_count, 1);
        assert_eq!(stats.audit_success_ratio(), 0.5);
        // Both observations imply the node responded, so uptime is unaffected.
        assert_eq!(stats.uptime_count, 2);
        assert_eq!(stats.uptime_ratio(), 1.0);
    }

    #[tokio::test]
    async fn offline_only_affects_uptime() {
        let statistics = db();
        let id = node(3);
        statistics.apply_batch(&[StatUpdate::Offline(id)], 1).await.unwrap();
        let stats = statistics.get(id).await.unwrap();
        assert_eq!(stats.audit_count, 0);
        assert_eq!(stats.uptime_count, 1);
        assert_eq!(stats.uptime_ratio(), 0.0);
    }
}
