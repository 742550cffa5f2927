//! Append-only irreparable-segment log (§3.A, §4.6 "Checker" step 4): a
//! dedicated KV prefix that is only ever appended to, never mutated, so
//! operators can page through it for manual recovery.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use storj_kv::{Direction, KeyValueStore, KvError, ListQuery};

use crate::error::Result;

const IRREPARABLE_PREFIX: &str = "\0irreparable/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrreparableRecord {
    pub path: Vec<u8>,
    pub lost_piece_numbers: Vec<u32>,
    pub surviving_piece_numbers: Vec<u32>,
    pub last_seen_version: u64,
    pub recorded_at: i64,
}

pub struct IrreparableLog {
    store: Arc<dyn KeyValueStore>,
}

impl IrreparableLog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Keyed by path then `recorded_at` so repeated failures of the same
    /// segment accumulate distinct entries instead of overwriting one
    /// another.
    fn key(path: &[u8], recorded_at: i64) -> Vec<u8> {
        let mut key = IRREPARABLE_PREFIX.as_bytes().to_vec();
        key.extend_from_slice(path);
        key.push(b'/');
        key.extend_from_slice(&recorded_at.to_be_bytes());
        key
    }

    pub async fn append(&self, record: IrreparableRecord) -> Result<()> {
        let key = Self::key(&record.path, record.recorded_at);
        let encoded = bincode::serialize(&record).expect("IrreparableRecord serialization cannot fail");
        self.store.put(&key, &encoded).await?;
        Ok(())
    }

    pub async fn list(&self, cursor: Vec<u8>, direction: Direction, limit: usize) -> Result<(Vec<IrreparableRecord>, bool)> {
        let query = ListQuery {
            prefix: IRREPARABLE_PREFIX.as_bytes().to_vec(),
            cursor,
            direction,
            limit,
            recursive: true,
        };
        let result = self.store.list(&query).await?;
        let mut records = Vec::with_capacity(result.items.len());
        for key in &result.items {
            if let Some(bytes) = self.store.get(key).await? {
                let record: IrreparableRecord =
                    bincode::deserialize(&bytes).map_err(|e| KvError::InvalidArgument(e.to_string()))?;
                records.push(record);
            }
        }
        Ok((records, result.more))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storj_kv::MemoryKv;

    fn log() -> IrreparableLog {
        IrreparableLog::new(Arc::new(MemoryKv::new()))
    }

    fn record(path: &[u8], recorded_at: i64) -> IrreparableRecord {
        IrreparableRecord {
            path: path.to_vec(),
            lost_piece_numbers: vec![2, 3],
            surviving_piece_numbers: vec![0, 1],
            last_seen_version: 1,
            recorded_at,
        }
    }

    #[tokio::test]
    async fn append_then_list_round_trips() {
        let log = log();
        log.append(record(b"bucket/a", 100)).await.unwrap();
        log.append(record(b"bucket/b", 101)).await.unwrap();

        let (records, more) = log.list(Vec::new(), Direction::After, 0).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(!more);
        assert_eq!(records[0].path, b"bucket/a");
        assert_eq!(records[1].path, b"bucket/b");
    }

    #[tokio::test]
    async fn repeated_failures_of_the_same_path_both_survive() {
        let log = log();
        log.append(record(b"bucket/a", 100)).await.unwrap();
        log.append(record(b"bucket/a", 200)).await.unwrap();

        let (records, _) = log.list(Vec::new(), Direction::After, 0).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].recorded_at, 100);
        assert_eq!(records[1].recorded_at, 200);
    }
}
