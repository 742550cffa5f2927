//! Object-store façade: the only public entry point into buckets, streams,
//! segments, and pointers (§4.5). The blob-oriented key scheme (§9 "two
//! pointer APIs coexist") stays behind [`crate::blob`], reached only from
//! here.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use storj_crypto::{decrypt_path, derive_content_key, encrypt_path, Cipher, Key, NodeId};
use storj_erasure::RedundancyScheme;
use storj_kv::{Direction, KeyValueStore};

use crate::blob::{self, SegmentIndex};
use crate::bucket::{BucketRecord, BucketStore};
use crate::error::{MetainfoError, Result};
use crate::pointer_db::{PointerDb, PointerListQuery};
use crate::stream_store::{StreamInfo, StreamStore};

/// Decrypted object metadata returned alongside the plaintext (§4.1 "the
/// user-visible metadata", carried through [`StreamInfo::metadata`]).
pub struct ObjectMeta {
    pub size: usize,
    pub segment_count: u32,
    pub metadata: Vec<u8>,
}

pub struct Metainfo {
    buckets: BucketStore,
    pointer_db: Arc<dyn PointerDb>,
    stream_store: Arc<StreamStore>,
    root_key: Key,
    max_inline_size: usize,
}

impl Metainfo {
    pub fn new(
        bucket_kv: Arc<dyn KeyValueStore>,
        pointer_db: Arc<dyn PointerDb>,
        stream_store: Arc<StreamStore>,
        root_key: Key,
        max_inline_size: usize,
    ) -> Self {
        Self {
            buckets: BucketStore::new(bucket_kv),
            pointer_db,
            stream_store,
            root_key,
            max_inline_size,
        }
    }

    pub async fn create_bucket(&self, name: &str, path_cipher: Cipher, created: i64) -> Result<()> {
        check_bucket_name(name)?;
        self.buckets.create(name, path_cipher, created).await
    }

    pub async fn delete_bucket(&self, name: &str) -> Result<()> {
        check_bucket_name(name)?;
        self.buckets.delete(name).await
    }

    pub async fn get_bucket(&self, name: &str) -> Result<BucketRecord> {
        check_bucket_name(name)?;
        self.buckets.get(name).await
    }

    pub async fn list_buckets(&self, cursor: &str, direction: Direction, limit: usize) -> Result<(Vec<String>, bool)> {
        self.buckets.list(cursor, direction, limit).await
    }

    /// `CreateObject` (§4.5): splits, encrypts, and places `plaintext`, then
    /// records one pointer per segment under the blob key scheme.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_object(
        &self,
        bucket: &str,
        path: &str,
        plaintext: &[u8],
        scheme: RedundancyScheme,
        creation_date: i64,
        expiration_date: i64,
        metadata: Vec<u8>,
        excluded: &HashSet<NodeId>,
    ) -> Result<()> {
        check_bucket_name(bucket)?;
        if path.is_empty() {
            return Err(MetainfoError::NoPath);
        }
        if plaintext.len() > self.max_inline_size && scheme.share_size == 0 {
            return Err(MetainfoError::InvalidArgument("redundancy scheme has a zero share size".to_string()));
        }

        let record = self.buckets.get(bucket).await?;
        let cipher = record.path_cipher;
        let encrypted_path = encrypt_path(path, cipher, &self.root_key)?;
        let content_key = derive_content_key(path, &self.root_key)?;
        let metadata_key = self.root_key.derive(format!("bucket:{bucket}").as_bytes());

        let segments = self
            .stream_store
            .put(
                plaintext,
                &content_key,
                &metadata_key,
                cipher,
                scheme,
                creation_date,
                expiration_date,
                metadata,
                excluded,
            )
            .await?;

        for (index, pointer) in segments {
            let key = blob::pointer_key(bucket, &encrypted_path, index);
            self.pointer_db.put(&key, pointer).await?;
        }
        Ok(())
    }

    /// `GetObject` (§4.5): fetches every segment pointer and reassembles the
    /// plaintext. `GetObjectStream` is the same operation under a different
    /// name in the original contract's lazy-reader form; this façade does
    /// not distinguish the two (see [`crate::stream_store`] module docs).
    pub async fn get_object(&self, bucket: &str, path: &str) -> Result<(Vec<u8>, ObjectMeta)> {
        check_bucket_name(bucket)?;
        if path.is_empty() {
            return Err(MetainfoError::NoPath);
        }

        let record = self.buckets.get(bucket).await?;
        let cipher = record.path_cipher;
        let encrypted_path = encrypt_path(path, cipher, &self.root_key)?;
        let content_key = derive_content_key(path, &self.root_key)?;
        let metadata_key = self.root_key.derive(format!("bucket:{bucket}").as_bytes());

        let last_key = blob::pointer_key(bucket, &encrypted_path, SegmentIndex::Last);
        let last_pointer = self
            .pointer_db
            .get(&last_key)
            .await?
            .ok_or_else(|| MetainfoError::ObjectNotFound(path.to_string()))?;

        let peek: StreamInfo = bincode::deserialize(&last_pointer.metadata)
            .map_err(|e| MetainfoError::Corrupt(format!("stream info: {e}")))?;

        let mut others = Vec::with_capacity(peek.segment_count.saturating_sub(1) as usize);
        for i in 0..peek.segment_count.saturating_sub(1) {
            let key = blob::pointer_key(bucket, &encrypted_path, SegmentIndex::Numbered(i as u64));
            let pointer = self
                .pointer_db
                .get(&key)
                .await?
                .ok_or_else(|| MetainfoError::ObjectNotFound(path.to_string()))?;
            others.push(pointer);
        }

        let (data, info) = self
            .stream_store
            .get(&content_key, &metadata_key, &last_pointer, &others)
            .await?;
        let meta = ObjectMeta {
            size: data.len(),
            segment_count: info.segment_count,
            metadata: info.metadata,
        };
        Ok((data, meta))
    }

    pub async fn get_object_stream(&self, bucket: &str, path: &str) -> Result<(Vec<u8>, ObjectMeta)> {
        self.get_object(bucket, path).await
    }

    /// `ListObjects` (§4.5). Object names are recovered by decrypting the
    /// path carried by every pointer whose blob key ends in the reserved
    /// `last`-segment suffix, so each object contributes exactly one entry
    /// regardless of its segment count.
    pub async fn list_objects(
        &self,
        bucket: &str,
        cursor: &str,
        direction: Direction,
        limit: usize,
        recursive: bool,
    ) -> Result<(Vec<String>, bool)> {
        check_bucket_name(bucket)?;
        let record = self.buckets.get(bucket).await?;
        let prefix = format!("{bucket}/");

        let query = PointerListQuery {
            prefix: prefix.clone().into_bytes(),
            cursor: cursor.as_bytes().to_vec(),
            direction,
            limit,
            recursive: true,
        };
        let result = self.pointer_db.list(&query).await?;

        let mut names = BTreeSet::new();
        for item in result.items {
            if !item.key.ends_with(b"/l") {
                continue;
            }
            let rest = &item.key[prefix.len()..item.key.len() - "/l".len()];
            let encrypted_path = String::from_utf8_lossy(rest).into_owned();
            let plain = decrypt_path(&encrypted_path, record.path_cipher, &self.root_key)?;
            if recursive {
                names.insert(plain);
            } else {
                let first = plain.split('/').next().unwrap_or_default().to_string();
                names.insert(first);
            }
        }
        Ok((names.into_iter().collect(), result.more))
    }

    /// `DeleteObject` (§4.5, §4.1 delete contract): removes numbered segments
    /// upward until two consecutive misses, then the last segment.
    pub async fn delete_object(&self, bucket: &str, path: &str) -> Result<()> {
        check_bucket_name(bucket)?;
        if path.is_empty() {
            return Err(MetainfoError::NoPath);
        }
        let record = self.buckets.get(bucket).await?;
        let encrypted_path = encrypt_path(path, record.path_cipher, &self.root_key)?;

        let mut consecutive_misses = 0u32;
        let mut i = 0u64;
        while consecutive_misses < 2 {
            let key = blob::pointer_key(bucket, &encrypted_path, SegmentIndex::Numbered(i));
            if self.pointer_db.get(&key).await?.is_some() {
                let _ = self.pointer_db.delete(&key).await;
                consecutive_misses = 0;
            } else {
                consecutive_misses += 1;
            }
            i += 1;
        }

        let last_key = blob::pointer_key(bucket, &encrypted_path, SegmentIndex::Last);
        if self.pointer_db.get(&last_key).await?.is_none() {
            return Err(MetainfoError::ObjectNotFound(path.to_string()));
        }
        self.pointer_db.delete(&last_key).await
    }
}

fn check_bucket_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MetainfoError::NoBucket);
    }
    if name.contains('/') {
        return Err(MetainfoError::InvalidArgument(
            "bucket names may not contain '/'".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer_db::KvPointerDb;
    use storj_kademlia::{NoReputation, NodeRecord, Overlay, RoutingTable};
    use storj_kv::MemoryKv;
    use storj_piecestore::LocalNetwork;

    fn node(byte: u8) -> NodeId {
        NodeId([byte; 32])
    }

    fn build() -> Metainfo {
        let rt = Arc::new(RoutingTable::new(NodeId([0xffu8; 32]), 20, 3));
        let net = Arc::new(LocalNetwork::new());
        for i in 1..=5u8 {
            let id = node(i);
            rt.mark_seen(NodeRecord::new(id, format!("node-{i}")));
            net.add_node(id);
        }
        let overlay = Arc::new(Overlay::new(rt, Arc::new(NoReputation)));
        let segment_store = Arc::new(crate::segment_store::SegmentStore::new(overlay, net, 16));
        let stream_store = Arc::new(StreamStore::new(segment_store, 64));
        let pointer_kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKv::new());
        let pointer_db: Arc<dyn PointerDb> = Arc::new(KvPointerDb::new(pointer_kv));
        let bucket_kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKv::new());
        Metainfo::new(bucket_kv, pointer_db, stream_store, Key::from_bytes([0x5au8; storj_crypto::KEY_SIZE]), 16)
    }

    fn scheme() -> RedundancyScheme {
        RedundancyScheme {
            required: 3,
            repair_threshold: 4,
            success_threshold: 4,
            total: 5,
            // stream store's 64-byte segment size + AEAD tag must fit in required * share_size.
            share_size: 30,
        }
    }

    #[tokio::test]
    async fn create_write_read_and_list_round_trip() {
        let metainfo = build();
        metainfo.create_bucket("photos", Cipher::AesGcm, 0).await.unwrap();

        let data = vec![0xabu8; 100];
        metainfo
            .create_object("photos", "vacation/beach.jpg", &data, scheme(), 0, 0, b"caption".to_vec(), &HashSet::new())
            .await
            .unwrap();

        let (recovered, meta) = metainfo.get_object("photos", "vacation/beach.jpg").await.unwrap();
        assert_eq!(recovered, data);
        assert_eq!(meta.metadata, b"caption");

        let (names, more) = metainfo.list_objects("photos", "", Direction::Forward, 0, true).await.unwrap();
        assert_eq!(names, vec!["vacation/beach.jpg".to_string()]);
        assert!(!more);

        let (top, _) = metainfo.list_objects("photos", "", Direction::Forward, 0, false).await.unwrap();
        assert_eq!(top, vec!["vacation".to_string()]);
    }

    #[tokio::test]
    async fn delete_object_removes_every_segment() {
        let metainfo = build();
        metainfo.create_bucket("b", Cipher::None, 0).await.unwrap();
        let data = vec![1u8; 5];
        metainfo
            .create_object("b", "small.txt", &data, scheme(), 0, 0, Vec::new(), &HashSet::new())
            .await
            .unwrap();

        metainfo.delete_object("b", "small.txt").await.unwrap();
        assert!(matches!(
            metainfo.get_object("b", "small.txt").await,
            Err(MetainfoError::ObjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn unknown_bucket_is_an_error() {
        let metainfo = build();
        assert!(matches!(
            metainfo.get_object("nope", "x").await,
            Err(MetainfoError::BucketNotFound(_))
        ));
    }
}
