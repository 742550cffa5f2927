//! The persisted pointer record (§3, §6) and its canonical KV key (§6
//! "Pointer key format").

use serde::{Deserialize, Serialize};
use storj_crypto::NodeId;
use storj_erasure::RedundancyScheme;
use storj_piecestore::PieceId;

use crate::error::{MetainfoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerType {
    Inline,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceEntry {
    pub piece_number: u32,
    pub node_id: NodeId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSegment {
    pub redundancy: RedundancyScheme,
    pub piece_id: PieceId,
    pub pieces: Vec<PieceEntry>,
}

/// Tags 1-8 of §6; `version` (tag 8) is absent on pointers written before
/// versioning existed and is then treated as `0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pointer {
    pub ptype: PointerType,
    pub inline_segment: Option<Vec<u8>>,
    pub remote: Option<RemoteSegment>,
    pub creation_date: i64,
    pub expiration_date: i64,
    pub metadata: Vec<u8>,
    pub size: i64,
    #[serde(default)]
    pub version: u64,
}

impl Pointer {
    pub fn inline(data: Vec<u8>, creation_date: i64, expiration_date: i64, metadata: Vec<u8>) -> Self {
        let size = data.len() as i64;
        Self {
            ptype: PointerType::Inline,
            inline_segment: Some(data),
            remote: None,
            creation_date,
            expiration_date,
            metadata,
            size,
            version: 0,
        }
    }

    pub fn remote(
        remote: RemoteSegment,
        size: i64,
        creation_date: i64,
        expiration_date: i64,
        metadata: Vec<u8>,
    ) -> Self {
        Self {
            ptype: PointerType::Remote,
            inline_segment: None,
            remote: Some(remote),
            creation_date,
            expiration_date,
            metadata,
            size,
            version: 0,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        bincode::serialize(self).expect("Pointer serialization cannot fail")
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| MetainfoError::Corrupt(e.to_string()))
    }
}

/// Which segment a pointer key addresses (§6): a numbered interior segment,
/// or the reserved `last` suffix carrying the stream-info block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentIndex {
    Numbered(u64),
    Last,
}

impl SegmentIndex {
    fn suffix(self) -> String {
        match self {
            SegmentIndex::Numbered(i) => format!("s{i}"),
            SegmentIndex::Last => "l".to_string(),
        }
    }
}

/// `bucket_name + "/" + encrypted_path + "/" + ("s" + segment_index | "l")`
/// (§6 "Pointer key format"). `encrypted_path` is already the base64url-joined
/// encrypted path produced by `storj_crypto::path`.
pub fn pointer_key(bucket_name: &str, encrypted_path: &str, index: SegmentIndex) -> Vec<u8> {
    format!("{bucket_name}/{encrypted_path}/{}", index.suffix()).into_bytes()
}
