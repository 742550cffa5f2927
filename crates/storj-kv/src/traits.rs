use async_trait::async_trait;

use crate::error::Result;
use crate::listing::{ListQuery, ListResult};

/// Ordered key-value storage (§2 dependency order, item 1).
///
/// Keys are compared bytewise throughout the core (§4.3); implementations
/// must preserve that ordering for [`KeyValueStore::list`] to behave per
/// §8 property 4.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    async fn delete(&self, key: &[u8]) -> Result<()>;

    /// Atomically replace `key`'s value, failing with [`crate::KvError::Conflict`]
    /// if the current value does not equal `expected`. `None` means "must not
    /// exist yet" / "must be absent afterwards". Backs the repair path's
    /// compare-and-set over pointer versions (§4.2 step 5, §5).
    async fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> Result<()>;

    async fn list(&self, query: &ListQuery) -> Result<ListResult>;
}

/// Durable FIFO work queue (§2 dependency order, item 1).
///
/// Used directly by the repair queue (§4.6); entries are opaque bytes so the
/// queue implementation has no knowledge of the repair-entry schema.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn enqueue(&self, item: Vec<u8>) -> Result<()>;

    /// Remove and return the oldest entry, or `None` if the queue is empty.
    async fn dequeue(&self) -> Result<Option<Vec<u8>>>;

    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
