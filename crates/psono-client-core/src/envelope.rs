//! Ciphertext envelopes.
//!
//! A sealed value travels as a ciphertext paired with its nonce. On the wire
//! both halves are hex strings; in memory they are bytes.

use serde::{Deserialize, Serialize};

use crate::encoding;
use crate::error::Result;
use crate::nonce::Nonce;
use crate::secretbox::SecretBoxKey;

/// The wire form of an encrypted payload: `{"text": <hex>, "nonce": <hex>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexEnvelope {
    /// Hex-encoded ciphertext (includes the authentication tag).
    pub text: String,

    /// Hex-encoded 24-byte nonce.
    pub nonce: String,
}

/// A secret-box ciphertext together with the nonce it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox {
    /// The encrypted data (includes authentication tag).
    pub ciphertext: Vec<u8>,

    /// Nonce used for encryption (unique per encryption).
    pub nonce: Nonce,
}

impl SealedBox {
    /// Encrypt plaintext with the given key under a fresh nonce.
    pub fn seal(plaintext: &[u8], key: &SecretBoxKey) -> Result<Self> {
        let (ciphertext, nonce) = key.encrypt(plaintext)?;
        Ok(Self { ciphertext, nonce })
    }

    /// Decrypt with the given key.
    pub fn open(&self, key: &SecretBoxKey) -> Result<Vec<u8>> {
        key.decrypt(&self.ciphertext, &self.nonce)
    }

    /// Parse from separate hex fields, as found in server records.
    pub fn from_hex(text: &str, nonce: &str) -> Result<Self> {
        Ok(Self {
            ciphertext: encoding::decode(text)?,
            nonce: Nonce::from_hex(nonce)?,
        })
    }

    /// Parse from a `{text, nonce}` envelope.
    pub fn from_envelope(envelope: &HexEnvelope) -> Result<Self> {
        Self::from_hex(&envelope.text, &envelope.nonce)
    }

    /// Hex-encoded ciphertext.
    pub fn text_hex(&self) -> String {
        encoding::encode(&self.ciphertext)
    }

    /// Hex-encoded nonce.
    pub fn nonce_hex(&self) -> String {
        self.nonce.to_hex()
    }

    /// Convert to the `{text, nonce}` wire form.
    pub fn to_envelope(&self) -> HexEnvelope {
        HexEnvelope {
            text: self.text_hex(),
            nonce: self.nonce_hex(),
        }
    }
}
