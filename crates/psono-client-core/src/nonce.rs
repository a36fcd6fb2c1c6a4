//! 24-byte nonces shared by box and secret box.

use rand::RngCore;
use std::fmt;

use crate::encoding;
use crate::error::Result;

/// Nonce width for XSalsa20-Poly1305 (both box and secret box).
pub const NONCE_LENGTH: usize = 24;

/// A 192-bit nonce.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce(pub [u8; NONCE_LENGTH]);

impl Nonce {
    /// Generate a fresh uniformly random nonce.
    ///
    /// 192 bits is wide enough that random nonces never collide in practice,
    /// which is what keeps a long-lived key safe across many messages.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; NONCE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; NONCE_LENGTH] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        encoding::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(encoding::decode_fixed(s)?))
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", self.to_hex())
    }
}
