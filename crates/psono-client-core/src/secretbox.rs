//! Symmetric authenticated encryption ("secret box").
//!
//! XSalsa20-Poly1305, byte-compatible with NaCl's `crypto_secretbox`. Every
//! encryption draws a fresh random nonce; callers never supply one.

use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::XSalsa20Poly1305;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::encoding;
use crate::error::{CoreError, Result};
use crate::nonce::Nonce;

/// Key width for the secret box.
pub const KEY_LENGTH: usize = 32;

/// A 256-bit secret box key.
///
/// Serializes as lowercase hex, which is how keys are nested inside encrypted
/// records. Wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretBoxKey([u8; KEY_LENGTH]);

impl SecretBoxKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LENGTH];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(encoding::decode_fixed(s)?))
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        encoding::encode(self.0)
    }

    /// Encrypt under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, Nonce)> {
        let cipher = XSalsa20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CoreError::EncryptionError(e.to_string()))?;

        let nonce = Nonce::generate();
        let ciphertext = cipher
            .encrypt(crypto_secretbox::Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| CoreError::EncryptionError(e.to_string()))?;
        Ok((ciphertext, nonce))
    }

    /// Decrypt and authenticate.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &Nonce) -> Result<Vec<u8>> {
        let cipher =
            XSalsa20Poly1305::new_from_slice(&self.0).map_err(|_| CoreError::DecryptionFailed)?;

        cipher
            .decrypt(crypto_secretbox::Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|_| CoreError::DecryptionFailed)
    }
}

impl fmt::Debug for SecretBoxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBoxKey(..)")
    }
}

impl Serialize for SecretBoxKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let hex = Zeroizing::new(self.to_hex());
        serializer.serialize_str(&hex)
    }
}

impl<'de> Deserialize<'de> for SecretBoxKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let hex = Zeroizing::new(String::deserialize(deserializer)?);
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Encrypt `plaintext` under `key`; returns the ciphertext and its fresh nonce.
pub fn secret_box_encrypt(plaintext: &[u8], key: &SecretBoxKey) -> Result<(Vec<u8>, Nonce)> {
    key.encrypt(plaintext)
}

/// Decrypt `ciphertext` under `key` and `nonce`.
pub fn secret_box_decrypt(ciphertext: &[u8], nonce: &Nonce, key: &SecretBoxKey) -> Result<Vec<u8>> {
    key.decrypt(ciphertext, nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_encrypt_decrypt() {
        let key = SecretBoxKey::generate();
        let (ciphertext, nonce) = secret_box_encrypt(b"hello, world!", &key).unwrap();
        assert_ne!(&ciphertext[..], b"hello, world!");

        let decrypted = secret_box_decrypt(&ciphertext, &nonce, &key).unwrap();
        assert_eq!(decrypted, b"hello, world!");
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let key1 = SecretBoxKey::generate();
        let key2 = SecretBoxKey::generate();
        let (ciphertext, nonce) = key1.encrypt(b"secret").unwrap();

        let err = key2.decrypt(&ciphertext, &nonce).unwrap_err();
        assert!(matches!(err, CoreError::DecryptionFailed));
    }

    #[test]
    fn test_nonces_never_repeat() {
        let key = SecretBoxKey::generate();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let (_, nonce) = key.encrypt(b"x").unwrap();
            assert!(seen.insert(nonce), "duplicate nonce {:?}", nonce);
        }
    }

    #[test]
    fn test_same_plaintext_different_ciphertext() {
        let key = SecretBoxKey::generate();
        let (a, _) = key.encrypt(b"same").unwrap();
        let (b, _) = key.encrypt(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_serde_as_hex() {
        let key = SecretBoxKey::from_bytes([0xab; KEY_LENGTH]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));

        let back: SecretBoxKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);

        assert!(serde_json::from_str::<SecretBoxKey>("\"abcd\"").is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = SecretBoxKey::from_bytes([0xcd; KEY_LENGTH]);
        assert!(!format!("{:?}", key).contains("cdcd"));
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            key_bytes in any::<[u8; 32]>(),
            plaintext in prop::collection::vec(any::<u8>(), 0..2048),
        ) {
            let key = SecretBoxKey::from_bytes(key_bytes);
            let (ciphertext, nonce) = secret_box_encrypt(&plaintext, &key).unwrap();
            prop_assert_eq!(secret_box_decrypt(&ciphertext, &nonce, &key).unwrap(), plaintext);
        }

        #[test]
        fn prop_tamper_detection(
            plaintext in prop::collection::vec(any::<u8>(), 0..512),
            flip_at in any::<prop::sample::Index>(),
            bit in 0u8..8,
            tamper_nonce in any::<bool>(),
        ) {
            let key = SecretBoxKey::generate();
            let (mut ciphertext, mut nonce) = key.encrypt(&plaintext).unwrap();

            if tamper_nonce {
                nonce.0[flip_at.index(nonce.0.len())] ^= 1 << bit;
            } else {
                let i = flip_at.index(ciphertext.len());
                ciphertext[i] ^= 1 << bit;
            }

            prop_assert!(matches!(
                key.decrypt(&ciphertext, &nonce),
                Err(CoreError::DecryptionFailed)
            ));
        }
    }
}
