//! Error types for the envelope store.

use std::fmt;

use psono_client_core::CoreError;
use psono_client_session::SessionError;
use thiserror::Error;

/// An encryption layer of the key chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// User secret key, wrapped under the API key's secret key.
    UserSecretKey,
    /// Datastore key, wrapped under the user secret key.
    DatastoreSecretKey,
    /// Folder/item tree, sealed under the datastore key.
    DatastoreContent,
    /// Secret payload, sealed under the item's own key.
    Secret,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::UserSecretKey => "user secret key",
            Layer::DatastoreSecretKey => "datastore secret key",
            Layer::DatastoreContent => "datastore content",
            Layer::Secret => "secret",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while reading or writing datastores and secrets.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A layer did not open under its key, or opened to something that is
    /// not a key. The data is unrecoverable with the keys at hand.
    #[error("decryption failed: {layer}")]
    DecryptionFailed { layer: Layer },

    /// The requested datastore or secret does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Session or transport failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Primitive failure while sealing.
    #[error("crypto error: {0}")]
    Crypto(#[from] CoreError),

    /// Plaintext serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A server record is missing fields or carries malformed hex.
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
