//! Public-key authenticated encryption ("box").
//!
//! X25519 key agreement followed by XSalsa20-Poly1305, byte-compatible with
//! NaCl's `crypto_box`. The shared key is derived inside every call; nothing is
//! cached between calls.

use crypto_box::aead::Aead;
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use rand::RngCore;
use std::fmt;

use crate::encoding;
use crate::error::{CoreError, Result};
use crate::nonce::Nonce;

/// An X25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxPublicKey(pub [u8; 32]);

impl BoxPublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
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

    fn to_crypto_box(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl fmt::Debug for BoxPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxPublicKey({}...)", &self.to_hex()[..16])
    }
}

/// An X25519 secret key. Wiped on drop.
pub struct BoxSecretKey(SecretKey);

impl BoxSecretKey {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut bytes = zeroize::Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(&mut *bytes);
        Self(SecretKey::from(*bytes))
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(SecretKey::from(bytes))
    }

    /// Derive the public key.
    pub fn public_key(&self) -> BoxPublicKey {
        BoxPublicKey(*self.0.public_key().as_bytes())
    }
}

impl fmt::Debug for BoxSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxSecretKey(public={:?})", self.public_key())
    }
}

/// Encrypt `plaintext` from `sender` to `recipient`.
pub fn box_encrypt(
    plaintext: &[u8],
    nonce: &Nonce,
    recipient: &BoxPublicKey,
    sender: &BoxSecretKey,
) -> Result<Vec<u8>> {
    let salsa_box = SalsaBox::new(&recipient.to_crypto_box(), &sender.0);
    salsa_box
        .encrypt(crypto_box::Nonce::from_slice(&nonce.0), plaintext)
        .map_err(|e| CoreError::EncryptionError(e.to_string()))
}

/// Decrypt `ciphertext` sent by `sender` to `recipient`.
pub fn box_decrypt(
    ciphertext: &[u8],
    nonce: &Nonce,
    sender: &BoxPublicKey,
    recipient: &BoxSecretKey,
) -> Result<Vec<u8>> {
    let salsa_box = SalsaBox::new(&sender.to_crypto_box(), &recipient.0);
    salsa_box
        .decrypt(crypto_box::Nonce::from_slice(&nonce.0), ciphertext)
        .map_err(|_| CoreError::DecryptionFailed)
}

/// Ephemeral key pair for a single login handshake.
///
/// Opening a box consumes the pair, so the secret half cannot be reused for
/// a second attempt.
pub struct EphemeralKeyPair {
    secret: BoxSecretKey,
    public: BoxPublicKey,
}

impl EphemeralKeyPair {
    /// Generate a fresh key pair.
    pub fn generate() -> Self {
        let secret = BoxSecretKey::generate();
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> BoxPublicKey {
        self.public
    }

    /// Decrypt a box addressed to this key pair, then discard the secret.
    pub fn open(self, ciphertext: &[u8], nonce: &Nonce, sender: &BoxPublicKey) -> Result<Vec<u8>> {
        box_decrypt(ciphertext, nonce, sender, &self.secret)
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EphemeralKeyPair({:?})", self.public)
    }
}
