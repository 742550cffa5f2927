use thiserror::Error;

/// Errors produced by key derivation, path (de)cryption and AEAD operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("negative depth")]
    NegativeDepth,
    #[error("depth {depth} greater than path length {path_len}")]
    DepthTooLarge { depth: usize, path_len: usize },
    #[error("path is empty")]
    EmptyPath,
    #[error("unknown cipher suite {0}")]
    UnknownCipher(u8),
    #[error("base64 decoding failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("AEAD operation failed")]
    Aead,
    #[error("truncated nonce increment overflowed")]
    NonceOverflow,
    #[error("ciphertext too short to contain a nonce")]
    CiphertextTooShort,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
