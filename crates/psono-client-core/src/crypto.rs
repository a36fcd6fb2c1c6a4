//! Ed25519 signing primitives.
//!
//! The API key's signing key proves possession to the server; the server's
//! verification key authenticates the login response.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use std::fmt;

use crate::encoding;
use crate::error::{CoreError, Result};

/// Length of a detached Ed25519 signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// A 32-byte Ed25519 verification (public) key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerifyKey(pub [u8; 32]);

impl VerifyKey {
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

    /// Verify a detached signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;
        let sig = DalekSignature::from_bytes(&signature.0);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for VerifyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerifyKey({}...)", &self.to_hex()[..16])
    }
}

impl From<[u8; 32]> for VerifyKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A 64-byte detached Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; SIGNATURE_LENGTH]);

impl Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    /// Convert to hex string (128 characters).
    pub fn to_hex(&self) -> String {
        encoding::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(encoding::decode_fixed(s)?))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

/// An Ed25519 signing key.
///
/// The seed is wiped when the key is dropped.
#[derive(Clone)]
pub struct SigningKeypair {
    signing_key: SigningKey,
}

impl SigningKeypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parse a hex-encoded 32-byte seed.
    pub fn from_hex(s: &str) -> Result<Self> {
        let seed = zeroize::Zeroizing::new(encoding::decode_fixed::<32>(s)?);
        Ok(Self::from_seed(&seed))
    }

    /// The seed as hex, the form API keys are provisioned in.
    pub fn seed_hex(&self) -> zeroize::Zeroizing<String> {
        zeroize::Zeroizing::new(encoding::encode(self.signing_key.to_bytes()))
    }

    /// Get the verification key.
    pub fn verify_key(&self) -> VerifyKey {
        VerifyKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message. Deterministic: the same message always yields the
    /// same signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl fmt::Debug for SigningKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKeypair({:?})", self.verify_key())
    }
}

/// Sign `message` with `key`.
pub fn sign(message: &[u8], key: &SigningKeypair) -> Signature {
    key.sign(message)
}

/// Verify `signature` over `message` against `key`.
pub fn verify(message: &[u8], signature: &Signature, key: &VerifyKey) -> Result<()> {
    key.verify(message, signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_keypair_sign_verify() {
        let keypair = SigningKeypair::generate();
        let message = b"hello world";
        let signature = keypair.sign(message);

        keypair
            .verify_key()
            .verify(message, &signature)
            .expect("valid signature should verify");

        let tampered = b"hello worlD";
        assert!(keypair.verify_key().verify(tampered, &signature).is_err());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let keypair = SigningKeypair::from_seed(&[0x42; 32]);
        assert_eq!(keypair.sign(b"abc"), keypair.sign(b"abc"));
    }

    #[test]
    fn test_wrong_key_fails() {
        let signer = SigningKeypair::generate();
        let other = SigningKeypair::generate();
        let signature = signer.sign(b"message");

        let err = other.verify_key().verify(b"message", &signature).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSignature));
    }

    #[test]
    fn test_hex_roundtrip_and_width() {
        let keypair = SigningKeypair::generate();
        let vk = keypair.verify_key();
        assert_eq!(VerifyKey::from_hex(&vk.to_hex()).unwrap(), vk);

        let sig = keypair.sign(b"x");
        assert_eq!(sig.to_hex().len(), 128);
        assert_eq!(Signature::from_hex(&sig.to_hex()).unwrap(), sig);

        assert!(VerifyKey::from_hex("abcd").is_err());
    }

    #[test]
    fn test_seed_hex_matches_seed() {
        let seed = [0x07u8; 32];
        let a = SigningKeypair::from_seed(&seed);
        let b = SigningKeypair::from_hex(&hex::encode(seed)).unwrap();
        assert_eq!(a.verify_key(), b.verify_key());
        assert_eq!(*a.seed_hex(), hex::encode(seed));
    }

    #[test]
    fn test_debug_does_not_leak_seed() {
        let seed = [0x5au8; 32];
        let keypair = SigningKeypair::from_seed(&seed);
        let rendered = format!("{:?}", keypair);
        assert!(!rendered.contains(&hex::encode(seed)));
    }

    proptest! {
        #[test]
        fn prop_signature_integrity(
            seed in any::<[u8; 32]>(),
            message in prop::collection::vec(any::<u8>(), 1..256),
            flip_at in any::<prop::sample::Index>(),
        ) {
            let keypair = SigningKeypair::from_seed(&seed);
            let signature = sign(&message, &keypair);
            prop_assert!(verify(&message, &signature, &keypair.verify_key()).is_ok());

            // Altered message.
            let mut altered = message.clone();
            let i = flip_at.index(altered.len());
            altered[i] ^= 0x01;
            prop_assert!(verify(&altered, &signature, &keypair.verify_key()).is_err());

            // Altered signature.
            let mut bad_sig = signature;
            let j = flip_at.index(SIGNATURE_LENGTH);
            bad_sig.0[j] ^= 0x01;
            prop_assert!(verify(&message, &bad_sig, &keypair.verify_key()).is_err());

            // Altered key.
            let mut bad_key = keypair.verify_key();
            let k = flip_at.index(32);
            bad_key.0[k] ^= 0x01;
            prop_assert!(verify(&message, &signature, &bad_key).is_err());
        }
    }
}
