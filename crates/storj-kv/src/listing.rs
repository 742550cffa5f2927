//! Shared listing algorithm used by the pointer database and the bucket
//! store (§4.3): prefix scan, optional first-level rollup, and four-way
//! cursor pagination (`After`, `Forward`, `Backward`, `Before`).

use std::collections::BTreeSet;

use crate::error::{KvError, Result};

/// Listing direction, matching the wire values of §6.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum Direction {
    /// Exclusive, forward: keys strictly greater than the cursor.
    After = 1,
    /// Inclusive, forward: keys greater than or equal to the cursor.
    Forward = 2,
    /// Inclusive, reverse: keys less than or equal to the cursor.
    Backward = 3,
    /// Exclusive, reverse: keys strictly less than the cursor.
    Before = 4,
}

impl Direction {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::After),
            2 => Ok(Self::Forward),
            3 => Ok(Self::Backward),
            4 => Ok(Self::Before),
            other => Err(KvError::InvalidArgument(format!(
                "unknown listing direction {other}"
            ))),
        }
    }

    fn is_forward(self) -> bool {
        matches!(self, Self::After | Self::Forward)
    }

    fn is_inclusive(self) -> bool {
        matches!(self, Self::Forward | Self::Backward)
    }
}

#[derive(Debug, Clone)]
pub struct ListQuery {
    pub prefix: Vec<u8>,
    /// Pagination cursor; an empty cursor means "unbounded" on the scan side
    /// implied by `direction` (start-of-range for forward, end-of-range for
    /// reverse).
    pub cursor: Vec<u8>,
    pub direction: Direction,
    /// `0` means "implementation-defined maximum" (here: unbounded).
    pub limit: usize,
    pub recursive: bool,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ListResult {
    pub items: Vec<Vec<u8>>,
    pub more: bool,
}

/// Apply [`ListQuery`] to an already key-sorted, prefix-filtered snapshot.
///
/// `keys` must be the full universe of keys the store holds; this function
/// performs the prefix match, the `recursive=false` first-level rollup, and
/// the cursor/direction/limit pagination described in §4.3.
pub fn list(keys: &[Vec<u8>], query: &ListQuery) -> Result<ListResult> {
    let matching: Vec<&[u8]> = keys
        .iter()
        .map(Vec::as_slice)
        .filter(|k| k.starts_with(query.prefix.as_slice()))
        .collect();

    let entries: Vec<Vec<u8>> = if query.recursive {
        matching.into_iter().map(|k| k.to_vec()).collect()
    } else {
        let mut rolled: BTreeSet<Vec<u8>> = BTreeSet::new();
        for key in matching {
            let rest = &key[query.prefix.len()..];
            let entry = match rest.iter().position(|&b| b == b'/') {
                Some(slash_pos) => {
                    let mut dir = query.prefix.clone();
                    dir.extend_from_slice(&rest[..=slash_pos]);
                    dir
                }
                None => key.to_vec(),
            };
            rolled.insert(entry);
        }
        rolled.into_iter().collect()
    };

    let effective_limit = if query.limit == 0 {
        entries.len()
    } else {
        query.limit
    };

    let (selected, more) = if query.direction.is_forward() {
        let start = if query.cursor.is_empty() {
            0
        } else {
            entries.partition_point(|k| {
                if query.direction.is_inclusive() {
                    k.as_slice() < query.cursor.as_slice()
                } else {
                    k.as_slice() <= query.cursor.as_slice()
                }
            })
        };
        let remaining = &entries[start..];
        let taken: Vec<Vec<u8>> = remaining.iter().take(effective_limit).cloned().collect();
        let more = remaining.len() > taken.len();
        (taken, more)
    } else {
        let end = if query.cursor.is_empty() {
            entries.len()
        } else {
            entries.partition_point(|k| {
                if query.direction.is_inclusive() {
                    k.as_slice() <= query.cursor.as_slice()
                } else {
                    k.as_slice() < query.cursor.as_slice()
                }
            })
        };
        let candidates = &entries[..end];
        let skip = candidates.len().saturating_sub(effective_limit);
        let taken: Vec<Vec<u8>> = candidates[skip..].to_vec();
        let more = skip > 0;
        (taken, more)
    };

    Ok(ListResult {
        items: selected,
        more,
    })
}
