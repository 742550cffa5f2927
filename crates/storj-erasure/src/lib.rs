//! Erasure code abstraction (§9 design note "erasure library abstraction").
//!
//! [`RedundancyScheme`] names the four thresholds from §3 (`k ≤ r ≤ s ≤ n`);
//! [`ErasureCode`] encodes a segment into `n` shares and reconstructs it from
//! any `k` of them. Reed–Solomon over GF(2^8) (`reed-solomon-erasure`) is the
//! only implementation required by the spec.

use reed_solomon_erasure::ReedSolomon;
use reed_solomon_erasure::galois_8::Field;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The `(k, r, s, n, share_size)` redundancy parameters attached to every
/// remote segment (§3). `k` source shares reconstruct a segment; a write is
/// durable once `s` shares have been placed; surviving shares `≤ r` trigger
/// repair; `n` is the total fan-out.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RedundancyScheme {
    pub required: usize,
    pub repair_threshold: usize,
    pub success_threshold: usize,
    pub total: usize,
    pub share_size: usize,
}

impl RedundancyScheme {
    /// Validate the `k ≤ r ≤ s ≤ n` invariant from §3.
    pub fn validate(&self) -> Result<(), ErasureError> {
        if !(self.required <= self.repair_threshold
            && self.repair_threshold <= self.success_threshold
            && self.success_threshold <= self.total)
        {
            return Err(ErasureError::InvalidScheme(*self));
        }
        if self.required == 0 {
            return Err(ErasureError::InvalidScheme(*self));
        }
        Ok(())
    }

    pub fn parity_shards(&self) -> usize {
        self.total - self.required
    }
}

#[derive(Debug, Error)]
pub enum ErasureError {
    #[error("redundancy scheme violates k <= r <= s <= n: {0:?}")]
    InvalidScheme(RedundancyScheme),
    #[error("reed-solomon error: {0}")]
    ReedSolomon(#[from] reed_solomon_erasure::Error),
    #[error("fewer than k={k} shares available to reconstruct (have {have})")]
    InsufficientShares { k: usize, have: usize },
    #[error("share length {actual} does not match expected share size {expected}")]
    WrongShareLength { expected: usize, actual: usize },
    #[error("segment of {len} bytes exceeds the scheme's capacity of {capacity} bytes (required * share_size)")]
    SegmentTooLarge { len: usize, capacity: usize },
}

/// Stateless Reed-Solomon codec; safe to share across threads (§5 shared-resource policy).
#[derive(Debug, Clone)]
pub struct ErasureCode {
    scheme: RedundancyScheme,
}

impl ErasureCode {
    pub fn new(scheme: RedundancyScheme) -> Result<Self, ErasureError> {
        scheme.validate()?;
        Ok(Self { scheme })
    }

    pub fn scheme(&self) -> RedundancyScheme {
        self.scheme
    }

    /// Encode `data` into exactly `n` shares, each `⌈len/k⌉` bytes long
    /// (zero-padded, §4.2 write step 3). Shares `0..k` are the source data
    /// split evenly; shares `k..n` are parity.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<Vec<u8>>, ErasureError> {
        let share_len = self.scheme.share_size;
        let capacity = self.scheme.required * share_len;
        if data.len() > capacity {
            return Err(ErasureError::SegmentTooLarge {
                len: data.len(),
                capacity,
            });
        }
        let mut shares: Vec<Vec<u8>> = Vec::with_capacity(self.scheme.total);

        for chunk_index in 0..self.scheme.required {
            let start = chunk_index * share_len;
            let mut shard = vec![0u8; share_len];
            if start < data.len() {
                let end = (start + share_len).min(data.len());
                shard[..end - start].copy_from_slice(&data[start..end]);
            }
            shares.push(shard);
        }
        for _ in 0..self.scheme.parity_shards() {
            shares.push(vec![0u8; share_len]);
        }

        let rs: ReedSolomon<Field> =
            ReedSolomon::new(self.scheme.required, self.scheme.parity_shards())?;
        rs.encode(&mut shares)?;
        Ok(shares)
    }

    /// Reconstruct the original data from any `k` consistent shares.
    ///
    /// `shares` is indexed `0..n`; missing shares are `None`. `original_len`
    /// truncates the trailing zero padding added by [`Self::encode`].
    pub fn decode(
        &self,
        mut shares: Vec<Option<Vec<u8>>>,
        original_len: usize,
    ) -> Result<Vec<u8>, ErasureError> {
        let share_len = self.scheme.share_size;
        for share in shares.iter().flatten() {
            if share.len() != share_len {
                return Err(ErasureError::WrongShareLength {
                    expected: share_len,
                    actual: share.len(),
                });
            }
        }
        let present = shares.iter().filter(|s| s.is_some()).count();
        if present < self.scheme.required {
            return Err(ErasureError::InsufficientShares {
                k: self.scheme.required,
                have: present,
            });
        }

        let rs: ReedSolomon<Field> =
            ReedSolomon::new(self.scheme.required, self.scheme.parity_shards())?;
        rs.reconstruct(&mut shares)?;

        let mut out = Vec::with_capacity(self.scheme.required * share_len);
        for shard in shares.into_iter().take(self.scheme.required) {
            out.extend_from_slice(&shard.expect("reconstruct fills every source shard; qed"));
        }
        out.truncate(original_len);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::RngCore;
    use rand::rngs::OsRng;

    fn scheme(k: usize, r: usize, s: usize, n: usize, share_size: usize) -> RedundancyScheme {
        RedundancyScheme {
            required: k,
            repair_threshold: r,
            success_threshold: s,
            total: n,
            share_size,
        }
    }

    #[test]
    fn rejects_invalid_threshold_ordering() {
        assert!(ErasureCode::new(scheme(3, 2, 4, 5, 16)).is_err());
    }

    #[test]
    fn reconstructs_after_erasing_n_minus_k_shares() {
        let code = ErasureCode::new(scheme(4, 6, 6, 8, 256)).unwrap();
        let mut data = vec![0u8; 1000];
        OsRng.fill_bytes(&mut data);

        let shares = code.encode(&data).unwrap();
        let mut available: Vec<Option<Vec<u8>>> = shares.into_iter().map(Some).collect();
        // Erase n - k shares, leaving exactly k.
        for slot in available.iter_mut().take(available.len() - 4) {
            *slot = None;
        }

        let recovered = code.decode(available, data.len()).unwrap();
        assert_eq!(recovered, data);
    }

    #[test]
    fn insufficient_shares_is_an_error() {
        let code = ErasureCode::new(scheme(4, 6, 6, 8, 64)).unwrap();
        let data = vec![1u8; 200];
        let shares = code.encode(&data).unwrap();
        let mut available: Vec<Option<Vec<u8>>> = shares.into_iter().map(Some).collect();
        for slot in available.iter_mut().take(5) {
            *slot = None;
        }
        assert!(matches!(
            code.decode(available, data.len()),
            Err(ErasureError::InsufficientShares { .. })
        ));
    }

    #[test]
    fn oversized_segment_is_rejected() {
        let code = ErasureCode::new(scheme(3, 4, 5, 6, 16)).unwrap();
        let data = vec![1u8; 3 * 16 + 1];
        assert!(matches!(
            code.encode(&data),
            Err(ErasureError::SegmentTooLarge { len: 49, capacity: 48 })
        ));
    }

    proptest! {
        #[test]
        fn prop_round_trip(len in 1usize..4000, seed in any::<u64>()) {
            use rand::SeedableRng;
            use rand::rngs::StdRng;

            let code = ErasureCode::new(scheme(3, 4, 5, 6, 512)).unwrap();
            let mut data = vec![0u8; len];
            StdRng::seed_from_u64(seed).fill_bytes(&mut data);

            let shares = code.encode(&data).unwrap();
            let mut available: Vec<Option<Vec<u8>>> = shares.into_iter().map(Some).collect();
            // Drop all but k shares deterministically.
            for slot in available.iter_mut().take(3) {
                *slot = None;
            }

            let recovered = code.decode(available, data.len()).unwrap();
            prop_assert_eq!(recovered, data);
        }
    }
}
