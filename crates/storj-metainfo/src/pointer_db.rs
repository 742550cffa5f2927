//! Authoritative, durable KV mapping `path_key → pointer` (§4.3).

use std::sync::Arc;

use async_trait::async_trait;
use storj_kv::{Direction, KeyValueStore, ListQuery};

use crate::error::{MetainfoError, Result};
use crate::pointer::Pointer;

/// Listing request mirroring §4.3's four-direction cursor pagination,
/// reusing `storj-kv`'s implementation rather than re-deriving it.
pub type PointerListQuery = ListQuery;

#[derive(Debug, Clone)]
pub struct PointerListItem {
    pub key: Vec<u8>,
}

impl PointerListItem {
    /// A rolled-up directory entry always ends in `/` (§4.3 "recursive=false
    /// ... rolled up to the prefix directory entry").
    pub fn is_prefix(&self) -> bool {
        self.key.last() == Some(&b'/')
    }
}

#[derive(Debug, Clone)]
pub struct PointerListResult {
    pub items: Vec<PointerListItem>,
    pub more: bool,
}

#[async_trait]
pub trait PointerDb: Send + Sync {
    async fn get(&self, key: &[u8]) -> Result<Option<Pointer>>;

    async fn put(&self, key: &[u8], pointer: Pointer) -> Result<()>;

    async fn delete(&self, key: &[u8]) -> Result<()>;

    /// Compare-and-set against the pointer's `version` field, used by the
    /// repair path (§4.2 step 5, §4.6 repairer step 3). `expected_version`
    /// must match the currently stored pointer's version or the call fails
    /// with [`MetainfoError::PointerConflict`].
    async fn compare_and_set(&self, key: &[u8], expected_version: u64, new: Pointer) -> Result<()>;

    async fn list(&self, query: &PointerListQuery) -> Result<PointerListResult>;
}

/// The reference [`PointerDb`]: pointers are bincode-encoded values in any
/// `storj-kv` backed store (§2 dependency order: pointer db sits directly on
/// the KV abstraction, no separate storage engine).
pub struct KvPointerDb {
    store: Arc<dyn KeyValueStore>,
}

impl KvPointerDb {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PointerDb for KvPointerDb {
    async fn get(&self, key: &[u8]) -> Result<Option<Pointer>> {
        match self.store.get(key).await? {
            Some(bytes) => Ok(Some(Pointer::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &[u8], mut pointer: Pointer) -> Result<()> {
        let current = self.store.get(key).await?;
        pointer.version = match &current {
            Some(bytes) => Pointer::decode(bytes)?.version + 1,
            None => 1,
        };
        self.store.put(key, &pointer.encode()).await?;
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.store.delete(key).await?;
        Ok(())
    }

    async fn compare_and_set(&self, key: &[u8], expected_version: u64, mut new: Pointer) -> Result<()> {
        let current = self.store.get(key).await?;
        let current_encoded = match &current {
            Some(bytes) => {
                let pointer = Pointer::decode(bytes)?;
                if pointer.version != expected_version {
                    return Err(MetainfoError::PointerConflict);
                }
                Some(bytes.clone())
            }
            None => {
                if expected_version != 0 {
                    return Err(MetainfoError::PointerConflict);
                }
                None
            }
        };
        new.version = expected_version + 1;
        self.store
            .compare_and_swap(key, current_encoded.as_deref(), Some(&new.encode()))
            .await
            .map_err(|_| MetainfoError::PointerConflict)
    }

    async fn list(&self, query: &PointerListQuery) -> Result<PointerListResult> {
        let result = self.store.list(query).await?;
        let items = result.items.into_iter().map(|key| PointerListItem { key }).collect();
        Ok(PointerListResult {
            items,
            more: result.more,
        })
    }
}

/// Used internally to build default list queries; keeps callers from
/// depending on `storj_kv::Direction` directly.
pub fn forward_from(cursor: Vec<u8>) -> PointerListQuery {
    PointerListQuery {
        prefix: Vec::new(),
        cursor,
        direction: Direction::After,
        limit: 0,
        recursive: true,
    }
}
