use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key as AesKey};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, Result};
use crate::key::{Key, Nonce};

/// Path and content encryption suites, matching the data model's `path_cipher` enum.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Cipher {
    /// Bytes pass through unmodified; used for publicly-listable buckets.
    None = 0,
    AesGcm = 1,
    /// "SecretBox" in the original; realized here with XChaCha20-Poly1305,
    /// the modern AEAD with the same 24-byte extended-nonce shape.
    SecretBox = 2,
}

impl Cipher {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::AesGcm),
            2 => Ok(Self::SecretBox),
            other => Err(CryptoError::UnknownCipher(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Encrypt `plaintext` under `(cipher, key, nonce)`.
///
/// An empty plaintext always encrypts to an empty ciphertext, matching the
/// original implementation's short-circuit (there is nothing to authenticate
/// and no reason to pay for an AEAD tag on, e.g., the empty bucket path).
pub fn encrypt(plaintext: &[u8], cipher: Cipher, key: &Key, nonce: &Nonce) -> Result<Vec<u8>> {
    if plaintext.is_empty() {
        return Ok(Vec::new());
    }
    match cipher {
        Cipher::None => Ok(plaintext.to_vec()),
        Cipher::AesGcm => {
            let aead = Aes256Gcm::new(AesKey::<Aes256Gcm>::from_slice(&key.0));
            let aes_nonce = nonce.as_aes_gcm_bytes();
            aead.encrypt(
                aes_gcm::Nonce::from_slice(&aes_nonce),
                Payload {
                    msg: plaintext,
                    aad: &[],
                },
            )
            .map_err(|_| CryptoError::Aead)
        }
        Cipher::SecretBox => {
            let aead = XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(&key.0));
            aead.encrypt(
                XNonce::from_slice(&nonce.0),
                Payload {
                    msg: plaintext,
                    aad: &[],
                },
            )
            .map_err(|_| CryptoError::Aead)
        }
    }
}

/// Decrypt `ciphertext` under `(cipher, key, nonce)`; the inverse of [`encrypt`].
pub fn decrypt(ciphertext: &[u8], cipher: Cipher, key: &Key, nonce: &Nonce) -> Result<Vec<u8>> {
    if ciphertext.is_empty() {
        return Ok(Vec::new());
    }
    match cipher {
        Cipher::None => Ok(ciphertext.to_vec()),
        Cipher::AesGcm => {
            let aead = Aes256Gcm::new(AesKey::<Aes256Gcm>::from_slice(&key.0));
            let aes_nonce = nonce.as_aes_gcm_bytes();
            aead.decrypt(
                aes_gcm::Nonce::from_slice(&aes_nonce),
                Payload {
                    msg: ciphertext,
                    aad: &[],
                },
            )
            .map_err(|_| CryptoError::Aead)
        }
        Cipher::SecretBox => {
            let aead = XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(&key.0));
            aead.decrypt(
                XNonce::from_slice(&nonce.0),
                Payload {
                    msg: ciphertext,
                    aad: &[],
                },
            )
            .map_err(|_| CryptoError::Aead)
        }
    }
}

/// Nonce width, in bytes, that [`encrypt`]/[`decrypt`] consume on the wire for `cipher`.
pub fn nonce_size(cipher: Cipher) -> usize {
    match cipher {
        Cipher::None => 0,
        Cipher::AesGcm => crate::key::AES_GCM_NONCE_SIZE,
        Cipher::SecretBox => crate::key::NONCE_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KEY_SIZE;

    fn key(byte: u8) -> Key {
        Key::from_bytes([byte; KEY_SIZE])
    }

    #[test]
    fn aes_gcm_round_trips() {
        let k = key(7);
        let nonce = k.derive_nonce();
        let data = vec![42u8; 10 * 64];
        let ct = encrypt(&data, Cipher::AesGcm, &k, &nonce).unwrap();
        let pt = decrypt(&ct, Cipher::AesGcm, &k, &nonce).unwrap();
        assert_eq!(pt, data);
    }

    #[test]
    fn secretbox_round_trips() {
        let k = key(9);
        let nonce = k.derive_nonce();
        let data = vec![7u8; 10 * 64];
        let ct = encrypt(&data, Cipher::SecretBox, &k, &nonce).unwrap();
        let pt = decrypt(&ct, Cipher::SecretBox, &k, &nonce).unwrap();
        assert_eq!(pt, data);
    }

    #[test]
    fn tampering_is_rejected() {
        let k = key(1);
        let nonce = k.derive_nonce();
        let data = vec![1u8; 256];
        let mut ct = encrypt(&data, Cipher::AesGcm, &k, &nonce).unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0xff;
        assert!(decrypt(&ct, Cipher::AesGcm, &k, &nonce).is_err());
    }

    #[test]
    fn none_cipher_is_identity() {
        let k = key(0);
        let nonce = Nonce::zero();
        let data = b"hello world".to_vec();
        let ct = encrypt(&data, Cipher::None, &k, &nonce).unwrap();
        assert_eq!(ct, data);
        assert_eq!(decrypt(&ct, Cipher::None, &k, &nonce).unwrap(), data);
    }
}
