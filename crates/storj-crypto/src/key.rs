use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::Result;

/// Width in bytes of every derived key and of the full nonce derived alongside it.
pub const KEY_SIZE: usize = 32;
/// Width of a full (SecretBox-style) nonce before any cipher-specific truncation.
pub const NONCE_SIZE: usize = 24;
/// Width of the nonce consumed by AES-GCM, a prefix of the full nonce.
pub const AES_GCM_NONCE_SIZE: usize = 12;

type HmacSha512 = Hmac<Sha512>;

/// A symmetric key in the §3 derivation hierarchy.
///
/// Every key in the hierarchy — the root key, every per-path-component key,
/// and the content key — has the same shape, so they share one newtype.
#[derive(Clone, Eq, PartialEq)]
pub struct Key(pub [u8; KEY_SIZE]);

impl Key {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Derive a child key via `HMAC-SHA512(self, message)`, truncated to [`KEY_SIZE`].
    ///
    /// This is `DeriveKey` in the original implementation: every "`path:`"-prefixed
    /// component derivation and the final "`content`" derivation both go through it.
    pub fn derive(&self, message: &[u8]) -> Key {
        let mut mac = HmacSha512::new_from_slice(&self.0).expect("HMAC accepts any key length");
        mac.update(message);
        let full = mac.finalize().into_bytes();
        let mut out = [0u8; KEY_SIZE];
        out.copy_from_slice(&full[..KEY_SIZE]);
        Key(out)
    }

    /// Derive the full nonce for a component encrypted under this key:
    /// `HMAC-SHA512(self, "nonce")` truncated to [`NONCE_SIZE`].
    pub fn derive_nonce(&self) -> Nonce {
        let mut mac = HmacSha512::new_from_slice(&self.0).expect("HMAC accepts any key length");
        mac.update(b"nonce");
        let full = mac.finalize().into_bytes();
        let mut out = [0u8; NONCE_SIZE];
        out.copy_from_slice(&full[..NONCE_SIZE]);
        Nonce(out)
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Key").field(&"<redacted>").finish()
    }
}

/// A nonce in its full, cipher-agnostic 24-byte form.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    pub fn zero() -> Self {
        Self([0u8; NONCE_SIZE])
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }

    /// The 12-byte prefix consumed by AES-GCM.
    pub fn as_aes_gcm_bytes(&self) -> [u8; AES_GCM_NONCE_SIZE] {
        let mut out = [0u8; AES_GCM_NONCE_SIZE];
        out.copy_from_slice(&self.0[..AES_GCM_NONCE_SIZE]);
        out
    }

    /// Increment the nonce, treated as a big-endian counter, by `amount`.
    ///
    /// Used to derive `nonce_i` for segment `i` from the segment-zero nonce
    /// (§4.1 step 3); an overflow of the counter is an error rather than
    /// silent wraparound, since wraparound would eventually reuse a nonce.
    pub fn increment(&mut self, amount: u64) -> Result<()> {
        let mut carry = amount as u128;
        for byte in self.0.iter_mut().rev() {
            if carry == 0 {
                break;
            }
            let sum = *byte as u128 + (carry & 0xff);
            *byte = sum as u8;
            carry = (carry >> 8) + (sum >> 8);
        }
        if carry != 0 {
            return Err(crate::error::CryptoError::NonceOverflow);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Nonce").field(&hex::encode(self.0)).finish()
    }
}
