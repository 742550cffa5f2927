//! Content model, pointer database, bucket namespace, segment/stream
//! stores, and the object-oriented façade that sits on top of them (§3,
//! §4.1-§4.3, §4.5).

mod blob;
mod bucket;
mod error;
mod facade;
mod pointer;
mod pointer_db;
mod segment_store;
mod stream_store;

pub use bucket::{BucketRecord, BucketStore};
pub use error::{MetainfoError, Result};
pub use facade::{Metainfo, ObjectMeta};
pub use pointer::{PieceEntry, Pointer, PointerType, RemoteSegment, SegmentIndex};
pub use pointer_db::{forward_from, KvPointerDb, PointerDb, PointerListItem, PointerListQuery, PointerListResult};
pub use segment_store::SegmentStore;
pub use stream_store::{StreamInfo, StreamStore};
