//! In-memory reference implementations, used across the workspace's test
//! suites in place of a real storage backend.

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{KvError, Result};
use crate::listing::{self, ListQuery, ListResult};
use crate::traits::{KeyValueStore, WorkQueue};

#[derive(Debug, Default)]
pub struct MemoryKv {
    data: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.lock().get(key).cloned())
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.lock().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.data.lock().remove(key);
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> Result<()> {
        let mut data = self.data.lock();
        let current = data.get(key).map(Vec::as_slice);
        if current != expected {
            return Err(KvError::Conflict);
        }
        match new {
            Some(value) => {
                data.insert(key.to_vec(), value.to_vec());
            }
            None => {
                data.remove(key);
            }
        }
        Ok(())
    }

    async fn list(&self, query: &ListQuery) -> Result<ListResult> {
        let keys: Vec<Vec<u8>> = self.data.lock().keys().cloned().collect();
        listing::list(&keys, query)
    }
}

#[derive(Debug, Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<Vec<u8>>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    async fn enqueue(&self, item: Vec<u8>) -> Result<()> {
        self.items.lock().push_back(item);
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.items.lock().pop_front())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.items.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn compare_and_swap_conflicts_on_mismatch() {
        let kv = MemoryKv::new();
        kv.put(b"k", b"v1").await.unwrap();
        let result = kv.compare_and_swap(b"k", Some(b"wrong"), Some(b"v2")).await;
        assert!(matches!(result, Err(KvError::Conflict)));
        assert_eq!(kv.get(b"k").await.unwrap(), Some(b"v1".to_vec()));
    }

    #[tokio::test]
    async fn compare_and_swap_succeeds_on_match() {
        let kv = MemoryKv::new();
        kv.put(b"k", b"v1").await.unwrap();
        kv.compare_and_swap(b"k", Some(b"v1"), Some(b"v2"))
            .await
            .unwrap();
        assert_eq!(kv.get(b"k").await.unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn queue_is_fifo() {
        let q = MemoryQueue::new();
        q.enqueue(b"a".to_vec()).await.unwrap();
        q.enqueue(b"b".to_vec()).await.unwrap();
        assert_eq!(q.dequeue().await.unwrap(), Some(b"a".to_vec()));
        assert_eq!(q.dequeue().await.unwrap(), Some(b"b".to_vec()));
        assert_eq!(q.dequeue().await.unwrap(), None);
    }
}
