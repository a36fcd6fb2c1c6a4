//! Error types for the primitive layer.

use thiserror::Error;

/// Errors raised by the signing, box and secret box primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// AEAD tag mismatch: wrong key, wrong nonce or tampered ciphertext.
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("encryption error: {0}")]
    EncryptionError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for primitive operations.
pub type Result<T> = std::result::Result<T, CoreError>;
