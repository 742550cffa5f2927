//! Cryptographic primitives underlying the key derivation hierarchy of §3:
//! AEAD ciphers, HMAC-based key/nonce derivation, deterministic path
//! encryption, and node/uplink identity keypairs.

mod cipher;
mod error;
mod identity;
mod key;
mod path;

pub use cipher::{Cipher, decrypt, encrypt, nonce_size};
pub use error::{CryptoError, Result};
pub use identity::{Identity, NodeId, verify};
pub use key::{AES_GCM_NONCE_SIZE, KEY_SIZE, Key, NONCE_SIZE, Nonce};
pub use path::{
    decrypt_path, derive_content_key, derive_path_key, encrypt_path, join_path, split_path,
};
