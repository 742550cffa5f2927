//! Wires one `sled::Db` into the full client-side stack the commands drive:
//! bucket/pointer stores, a fixed local node population behind
//! [`DurableNetwork`], and the `storj-metainfo` façade on top.

use std::sync::Arc;

use anyhow::{Context, Result};
use storj_crypto::{Cipher, NodeId};
use storj_erasure::RedundancyScheme;
use storj_kademlia::{NoReputation, NodeRecord, Overlay, RoutingTable};
use storj_kv::{KeyValueStore, SledKv};
use storj_metainfo::{KvPointerDb, Metainfo, PointerDb, SegmentStore, StreamStore};

use crate::config::Config;
use crate::network::DurableNetwork;

/// Satellite-side identity used only to seed the routing table; an uplink
/// CLI has no long-lived node identity of its own in this reference setup.
const SELF_ID: NodeId = NodeId([0xffu8; 32]);

pub struct Workspace {
    pub metainfo: Metainfo,
    pub redundancy: RedundancyScheme,
    pub cipher: Cipher,
}

impl Workspace {
    pub fn open(config: &Config, default_dir: &std::path::Path) -> Result<Self> {
        let db_path = config.resolved_db_path(default_dir);
        std::fs::create_dir_all(&db_path)
            .with_context(|| format!("creating database directory {}", db_path.display()))?;
        let db = sled::open(&db_path).with_context(|| format!("opening database at {}", db_path.display()))?;

        let node_ids: Vec<NodeId> = (0..config.node_count.max(1) as u32)
            .map(|i| {
                let mut bytes = [0u8; 32];
                bytes[..4].copy_from_slice(&i.to_be_bytes());
                NodeId(bytes)
            })
            .collect();

        let routing_table = Arc::new(RoutingTable::new(SELF_ID, 20, 3));
        for (i, id) in node_ids.iter().enumerate() {
            routing_table.mark_seen(NodeRecord::new(*id, format!("node-{i}")));
        }
        let overlay = Arc::new(Overlay::new(routing_table, Arc::new(NoReputation)));

        let network = Arc::new(DurableNetwork::open(&db, &node_ids).context("opening piece storage trees")?);

        let segment_store = Arc::new(SegmentStore::new(overlay, network, config.max_inline_size));
        let stream_store = Arc::new(StreamStore::new(segment_store, config.segment_size));

        let pointer_kv: Arc<dyn KeyValueStore> = Arc::new(SledKv::new(
            db.open_tree("pointers").context("opening pointers tree")?,
        ));
        let pointer_db: Arc<dyn PointerDb> = Arc::new(KvPointerDb::new(pointer_kv));
        let bucket_kv: Arc<dyn KeyValueStore> =
            Arc::new(SledKv::new(db.open_tree("buckets").context("opening buckets tree")?));

        let root_key = config.root_key()?;
        let metainfo = Metainfo::new(bucket_kv, pointer_db, stream_store, root_key, config.max_inline_size);

        Ok(Self {
            metainfo,
            redundancy: config.redundancy(),
            cipher: config.cipher(),
        })
    }
}
