//! Error types for the session layer.

use thiserror::Error;

use crate::policy::Operation;

/// Errors that can occur during the handshake or an authenticated call.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The server's signature over the login info did not verify.
    ///
    /// Fatal: the response must be discarded. Either the configured server key
    /// is wrong or someone is in the middle.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The boxed login info could not be opened with the session key pair.
    #[error("login info decryption failed")]
    DecryptionFailed,

    /// An authenticated response did not open under the session secret key.
    ///
    /// Treated as session expiry: a new handshake is required.
    #[error("transport decryption failed: session expired or session key mismatch")]
    TransportDecryptionFailed,

    /// The API key's scope forbids the requested operation.
    #[error("{operation} denied: {reason}")]
    PolicyDenied {
        operation: Operation,
        reason: &'static str,
    },

    /// The transport could not complete the exchange.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The server answered with a non-success status.
    #[error("server returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A configuration value is missing or malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `run` was called on a handshake that already established a session.
    #[error("handshake already completed")]
    HandshakeComplete,

    /// Request body serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
