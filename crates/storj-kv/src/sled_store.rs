//! A durable [`KeyValueStore`]/[`WorkQueue`] pair backed by `sled`.
//!
//! The spec treats the choice of on-disk engine as external (§1); `sled` is
//! the concrete adapter this workspace ships so the satellite binaries have
//! something durable to run against without pulling in out-of-scope gRPC
//! storage services.

use async_trait::async_trait;
use sled::Tree;

use crate::error::{KvError, Result};
use crate::listing::{self, ListQuery, ListResult};
use crate::traits::{KeyValueStore, WorkQueue};

#[derive(Clone)]
pub struct SledKv {
    tree: Tree,
}

impl SledKv {
    pub fn new(tree: Tree) -> Self {
        Self { tree }
    }
}

#[async_trait]
impl KeyValueStore for SledKv {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.tree.get(key)?.map(|ivec| ivec.to_vec()))
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.tree.insert(key, value)?;
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.tree.remove(key)?;
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> Result<()> {
        self.tree
            .compare_and_swap(key, expected, new)?
            .map_err(|_| KvError::Conflict)
    }

    async fn list(&self, query: &ListQuery) -> Result<ListResult> {
        let keys: Vec<Vec<u8>> = self
            .tree
            .iter()
            .keys()
            .filter_map(|k| k.ok())
            .map(|ivec| ivec.to_vec())
            .collect();
        listing::list(&keys, query)
    }
}

#[derive(Clone)]
pub struct SledQueue {
    tree: Tree,
}

impl SledQueue {
    pub fn new(tree: Tree) -> Self {
        Self { tree }
    }

    /// Monotonic sequence keys keep `sled`'s own key ordering as FIFO order.
    fn next_key(&self) -> Result<[u8; 8]> {
        let id = self.tree.generate_id()?;
        Ok(id.to_be_bytes())
    }
}

#[async_trait]
impl WorkQueue for SledQueue {
    async fn enqueue(&self, item: Vec<u8>) -> Result<()> {
        let key = self.next_key()?;
        self.tree.insert(key, item)?;
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<Vec<u8>>> {
        let Some(first) = self.tree.iter().next() else {
            return Ok(None);
        };
        let (key, value) = first?;
        self.tree.remove(&key)?;
        Ok(Some(value.to_vec()))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.tree.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> sled::Db {
        let dir = tempfile::tempdir().unwrap();
        sled::open(dir.path()).unwrap()
    }

    #[tokio::test]
    async fn round_trips_through_sled() {
        let db = open();
        let kv = SledKv::new(db.open_tree("pointers").unwrap());
        kv.put(b"a", b"1").await.unwrap();
        assert_eq!(kv.get(b"a").await.unwrap(), Some(b"1".to_vec()));
        kv.delete(b"a").await.unwrap();
        assert_eq!(kv.get(b"a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn queue_preserves_fifo_order() {
        let db = open();
        let queue = SledQueue::new(db.open_tree("repair_queue").unwrap());
        queue.enqueue(b"first".to_vec()).await.unwrap();
        queue.enqueue(b"second".to_vec()).await.unwrap();
        assert_eq!(queue.dequeue().await.unwrap(), Some(b"first".to_vec()));
        assert_eq!(queue.dequeue().await.unwrap(), Some(b"second".to_vec()));
    }
}
