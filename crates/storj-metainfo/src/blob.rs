//! Private blob-oriented key scheme retained behind the object façade
//! (§4.5, §9 "two pointer APIs coexist"). Only [`crate::facade::Metainfo`],
//! the checker, and the repairer are expected to reach for this module.

pub(crate) use crate::pointer::{pointer_key, SegmentIndex};
