//! Hierarchical path-and-content key derivation (§3).
//!
//! Each path component is encrypted with the key derived from every
//! component *before* it, so a satellite holding only a prefix of the key
//! hierarchy can still locate objects by encrypted path without ever
//! recovering the plaintext beyond that prefix.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::cipher::{self, Cipher};
use crate::error::{CryptoError, Result};
use crate::key::Key;

/// Split a path on `/`, keeping empty components so that `"a//b"` round-trips.
pub fn split_path(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('/').collect()
    }
}

/// Rejoin components produced by [`split_path`].
pub fn join_path(components: &[String]) -> String {
    components.join("/")
}

/// Encrypt every component of `path` under the key hierarchy rooted at `key`.
///
/// Mirrors the original `EncryptPath`: the empty path and `Cipher::None`
/// both short-circuit to the plaintext path unchanged.
pub fn encrypt_path(path: &str, cipher: Cipher, key: &Key) -> Result<String> {
    if path.is_empty() || matches!(cipher, Cipher::None) {
        return Ok(path.to_string());
    }

    let mut current_key = key.clone();
    let mut out = Vec::new();
    for component in split_path(path) {
        out.push(encrypt_component(component, cipher, &current_key)?);
        current_key = current_key.derive(format!("path:{component}").as_bytes());
    }
    Ok(join_path(&out))
}

/// Decrypt every component of `path`, the inverse of [`encrypt_path`].
pub fn decrypt_path(path: &str, cipher: Cipher, key: &Key) -> Result<String> {
    if matches!(cipher, Cipher::None) {
        return Ok(path.to_string());
    }

    let mut current_key = key.clone();
    let mut out = Vec::new();
    for component in split_path(path) {
        let plain = decrypt_component(component, cipher, &current_key)?;
        current_key = current_key.derive(format!("path:{plain}").as_bytes());
        out.push(plain);
    }
    Ok(join_path(&out))
}

/// Derive the key that applies starting at depth `depth` into `path`
/// (i.e. the key an attacker/satellite holding only a `depth`-component
/// prefix could derive). `depth == 0` returns `key` unchanged; `depth` must
/// not exceed the number of components in `path`.
pub fn derive_path_key(path: &str, key: &Key, depth: usize) -> Result<Key> {
    if path.is_empty() {
        return Ok(key.clone());
    }
    let components = split_path(path);
    if depth > components.len() {
        return Err(CryptoError::DepthTooLarge {
            depth,
            path_len: components.len(),
        });
    }

    let mut derived = key.clone();
    for component in &components[..depth] {
        derived = derived.derive(format!("path:{component}").as_bytes());
    }
    Ok(derived)
}

/// Derive the content key for an object's bytes: the path key at full depth,
/// further derived with the `"content"` label (§3).
pub fn derive_content_key(path: &str, key: &Key) -> Result<Key> {
    let components = split_path(path);
    if components.is_empty() {
        return Err(CryptoError::EmptyPath);
    }
    let derived = derive_path_key(path, key, components.len())?;
    Ok(derived.derive(b"content"))
}

fn encrypt_component(component: &str, cipher: Cipher, key: &Key) -> Result<String> {
    let derived_key = key.derive(format!("path:{component}").as_bytes());
    let nonce = derived_key.derive_nonce();
    let ciphertext = cipher::encrypt(component.as_bytes(), cipher, key, &nonce)?;

    let nonce_len = cipher::nonce_size(cipher);
    let mut wire = Vec::with_capacity(nonce_len + ciphertext.len());
    wire.extend_from_slice(&nonce.as_bytes()[..nonce_len]);
    wire.extend_from_slice(&ciphertext);

    Ok(URL_SAFE_NO_PAD.encode(wire))
}

fn decrypt_component(component: &str, cipher: Cipher, key: &Key) -> Result<String> {
    if component.is_empty() {
        return Ok(String::new());
    }

    let wire = URL_SAFE_NO_PAD.decode(component)?;
    let nonce_len = cipher::nonce_size(cipher);
    if wire.len() < nonce_len {
        return Err(CryptoError::CiphertextTooShort);
    }

    let mut nonce = crate::key::Nonce::zero();
    nonce.0[..nonce_len].copy_from_slice(&wire[..nonce_len]);
    let plaintext = cipher::decrypt(&wire[nonce_len..], cipher, key, &nonce)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Aead)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KEY_SIZE;
    use proptest::prelude::*;

    fn root_key() -> Key {
        Key::from_bytes([0x5au8; KEY_SIZE])
    }

    #[test]
    fn round_trips_fixed_paths() {
        let key = root_key();
        for path in ["", "/", "//", "fold1/fold2/fold3/file.txt", "a"] {
            for cipher in [Cipher::AesGcm, Cipher::SecretBox] {
                let enc = encrypt_path(path, cipher, &key).unwrap();
                let dec = decrypt_path(&enc, cipher, &key).unwrap();
                assert_eq!(dec, path, "cipher={cipher:?} path={path:?}");
            }
        }
    }

    #[test]
    fn unencrypted_cipher_is_identity() {
        let key = root_key();
        let path = "a/b/c";
        assert_eq!(encrypt_path(path, Cipher::None, &key).unwrap(), path);
        assert_eq!(decrypt_path(path, Cipher::None, &key).unwrap(), path);
    }

    #[test]
    fn depth_out_of_range_is_an_error() {
        let key = root_key();
        let path = "a/b/c";
        assert!(derive_path_key(path, &key, 4).is_err());
    }

    #[test]
    fn depth_truncation_round_trips() {
        let key = root_key();
        let path = "a/b/c";
        let components = split_path(path);
        for depth in 0..=components.len() {
            let suffix_plain = join_path(
                &components[depth..]
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>(),
            );
            let derived = derive_path_key(path, &key, depth).unwrap();
            let enc_suffix = encrypt_path(&suffix_plain, Cipher::AesGcm, &derived).unwrap();
            let dec_suffix = decrypt_path(&enc_suffix, Cipher::AesGcm, &derived).unwrap();
            assert_eq!(dec_suffix, suffix_plain);
        }
    }

    proptest! {
        #[test]
        fn prop_round_trip(parts in prop::collection::vec("[a-zA-Z0-9_.-]{1,12}", 0..6)) {
            let key = root_key();
            let path = parts.join("/");
            let enc = encrypt_path(&path, Cipher::AesGcm, &key).unwrap();
            let dec = decrypt_path(&enc, Cipher::AesGcm, &key).unwrap();
            prop_assert_eq!(dec, path);
        }
    }
}
