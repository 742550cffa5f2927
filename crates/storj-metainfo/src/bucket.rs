//! Bucket namespace (§3 "Bucket", §4.5 "CreateBucket/DeleteBucket/...").
//!
//! Bucket names are stored unencrypted under a fixed root prefix; this is a
//! thin layer over `storj-kv` distinct from the pointer database so a bucket
//! listing never has to wade through segment pointers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use storj_crypto::Cipher;
use storj_kv::{Direction, KeyValueStore, ListQuery};

use crate::error::{MetainfoError, Result};

const BUCKET_PREFIX: &str = "\0buckets/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketRecord {
    pub name: String,
    pub created: i64,
    pub path_cipher: Cipher,
}

pub struct BucketStore {
    store: Arc<dyn KeyValueStore>,
}

impl BucketStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(name: &str) -> Vec<u8> {
        format!("{BUCKET_PREFIX}{name}").into_bytes()
    }

    pub async fn create(&self, name: &str, path_cipher: Cipher, created: i64) -> Result<()> {
        if name.is_empty() {
            return Err(MetainfoError::NoBucket);
        }
        if name.contains('/') {
            return Err(MetainfoError::InvalidArgument(
                "bucket names may not contain '/'".to_string(),
            ));
        }
        let key = Self::key(name);
        if self.store.get(&key).await?.is_some() {
            return Err(MetainfoError::BucketExists(name.to_string()));
        }
        let record = BucketRecord {
            name: name.to_string(),
            created,
            path_cipher,
        };
        let encoded = bincode::serialize(&record).expect("BucketRecord serialization cannot fail");
        self.store.put(&key, &encoded).await?;
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Result<BucketRecord> {
        if name.is_empty() {
            return Err(MetainfoError::NoBucket);
        }
        match self.store.get(&Self::key(name)).await? {
            Some(bytes) => {
                bincode::deserialize(&bytes).map_err(|e| MetainfoError::Corrupt(e.to_string()))
            }
            None => Err(MetainfoError::BucketNotFound(name.to_string())),
        }
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(MetainfoError::NoBucket);
        }
        let key = Self::key(name);
        if self.store.get(&key).await?.is_none() {
            return Err(MetainfoError::BucketNotFound(name.to_string()));
        }
        self.store.delete(&key).await?;
        Ok(())
    }

    pub async fn list(&self, cursor: &str, direction: Direction, limit: usize) -> Result<(Vec<String>, bool)> {
        let mut full_cursor = Vec::new();
        if !cursor.is_empty() {
            full_cursor.extend_from_slice(Self::key(cursor).as_slice());
        }
        let query = ListQuery {
            prefix: BUCKET_PREFIX.as_bytes().to_vec(),
            cursor: full_cursor,
            direction,
            limit,
            recursive: true,
        };
        let result = self.store.list(&query).await?;
        let names = result
            .items
            .into_iter()
            .map(|key| String::from_utf8_lossy(&key[BUCKET_PREFIX.len()..]).into_owned())
            .collect();
        Ok((names, result.more))
    }
}
