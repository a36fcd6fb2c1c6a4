//! # Psono Client Core
//!
//! The primitive layer: three standard constructions wrapped in strong types.
//!
//! - **Signing**: Ed25519 detached signatures ([`SigningKeypair`], [`VerifyKey`])
//! - **Box**: X25519 + XSalsa20-Poly1305 ([`box_encrypt`], [`box_decrypt`])
//! - **Secret box**: XSalsa20-Poly1305 under a random nonce ([`SecretBoxKey`])
//!
//! This crate holds no state and performs no I/O. All binary values cross the
//! boundary as lowercase hex; operations work on raw bytes.
//!
//! ## Usage
//!
//! ```rust
//! use psono_client_core::{secret_box_decrypt, secret_box_encrypt, SecretBoxKey};
//!
//! let key = SecretBoxKey::generate();
//! let (ciphertext, nonce) = secret_box_encrypt(b"hunter2", &key).unwrap();
//! assert_eq!(secret_box_decrypt(&ciphertext, &nonce, &key).unwrap(), b"hunter2");
//! ```

pub mod boxes;
pub mod crypto;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod nonce;
pub mod secretbox;

pub use boxes::{box_decrypt, box_encrypt, BoxPublicKey, BoxSecretKey, EphemeralKeyPair};
pub use crypto::{sign, verify, Signature, SigningKeypair, VerifyKey, SIGNATURE_LENGTH};
pub use envelope::{HexEnvelope, SealedBox};
pub use error::{CoreError, Result};
pub use nonce::{Nonce, NONCE_LENGTH};
pub use secretbox::{secret_box_decrypt, secret_box_encrypt, SecretBoxKey, KEY_LENGTH};
