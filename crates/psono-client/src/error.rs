//! Error types for the client.

use psono_client_core::CoreError;
use psono_client_session::SessionError;
use psono_client_store::StoreError;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Handshake, transport or policy error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Datastore or secret error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Primitive error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CoreError),
}

/// How a failure should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server's login signature did not verify. Abort; do not retry.
    AuthenticationFailed,
    /// A box or secret box did not open. The data is unrecoverable with the
    /// keys at hand.
    DecryptionFailed,
    /// The session key or token is no longer valid. Log in again.
    SessionExpired,
    /// The API key's scope forbids the operation.
    PolicyDenied,
    /// No such datastore or secret.
    NotFound,
    /// Connectivity or an HTTP error status.
    Transport,
    /// The server or a record broke the protocol.
    Malformed,
    /// Missing or malformed configuration.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::AuthenticationFailed => "authentication failed",
            ErrorKind::DecryptionFailed => "decryption failed",
            ErrorKind::SessionExpired => "session expired",
            ErrorKind::PolicyDenied => "policy denied",
            ErrorKind::NotFound => "not found",
            ErrorKind::Transport => "transport error",
            ErrorKind::Malformed => "malformed data",
            ErrorKind::Config => "configuration error",
        };
        f.write_str(name)
    }
}

fn session_kind(err: &SessionError) -> ErrorKind {
    match err {
        SessionError::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
        SessionError::DecryptionFailed => ErrorKind::DecryptionFailed,
        SessionError::TransportDecryptionFailed => ErrorKind::SessionExpired,
        SessionError::HttpStatus { status: 401, .. } => ErrorKind::SessionExpired,
        SessionError::HttpStatus { status: 404, .. } => ErrorKind::NotFound,
        SessionError::PolicyDenied { .. } => ErrorKind::PolicyDenied,
        SessionError::TransportError(_) | SessionError::HttpStatus { .. } => ErrorKind::Transport,
        SessionError::InvalidConfig(_) => ErrorKind::Config,
        SessionError::MalformedResponse(_)
        | SessionError::HandshakeComplete
        | SessionError::Serialization(_) => ErrorKind::Malformed,
    }
}

impl ClientError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Session(e) | ClientError::Store(StoreError::Session(e)) => session_kind(e),
            ClientError::Store(StoreError::DecryptionFailed { .. }) => ErrorKind::DecryptionFailed,
            ClientError::Store(StoreError::NotFound(_)) => ErrorKind::NotFound,
            ClientError::Store(
                StoreError::Crypto(_) | StoreError::Serialization(_) | StoreError::MalformedRecord(_),
            ) => ErrorKind::Malformed,
            ClientError::Crypto(CoreError::DecryptionFailed) => ErrorKind::DecryptionFailed,
            ClientError::Crypto(CoreError::InvalidSignature) => ErrorKind::AuthenticationFailed,
            ClientError::Crypto(_) => ErrorKind::Malformed,
        }
    }

    /// Whether retrying with a fresh login could help.
    pub fn needs_relogin(&self) -> bool {
        self.kind() == ErrorKind::SessionExpired
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use psono_client_session::Operation;
    use psono_client_store::Layer;

    #[test]
    fn test_taxonomy() {
        let cases: Vec<(ClientError, ErrorKind)> = vec![
            (
                SessionError::AuthenticationFailed("x".into()).into(),
                ErrorKind::AuthenticationFailed,
            ),
            (SessionError::DecryptionFailed.into(), ErrorKind::DecryptionFailed),
            (
                SessionError::TransportDecryptionFailed.into(),
                ErrorKind::SessionExpired,
            ),
            (
                StoreError::Session(SessionError::TransportDecryptionFailed).into(),
                ErrorKind::SessionExpired,
            ),
            (
                SessionError::HttpStatus {
                    status: 401,
                    body: String::new(),
                }
                .into(),
                ErrorKind::SessionExpired,
            ),
            (
                SessionError::HttpStatus {
                    status: 502,
                    body: String::new(),
                }
                .into(),
                ErrorKind::Transport,
            ),
            (
                SessionError::PolicyDenied {
                    operation: Operation::WriteDatastore,
                    reason: "r",
                }
                .into(),
                ErrorKind::PolicyDenied,
            ),
            (
                StoreError::DecryptionFailed {
                    layer: Layer::Secret,
                }
                .into(),
                ErrorKind::DecryptionFailed,
            ),
            (StoreError::NotFound("x".into()).into(), ErrorKind::NotFound),
            (
                SessionError::InvalidConfig("API_KEY_ID".into()).into(),
                ErrorKind::Config,
            ),
            (
                StoreError::MalformedRecord("x".into()).into(),
                ErrorKind::Malformed,
            ),
        ];

        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{err}");
        }
    }

    #[test]
    fn test_only_expiry_needs_relogin() {
        assert!(ClientError::from(SessionError::TransportDecryptionFailed).needs_relogin());
        assert!(!ClientError::from(SessionError::DecryptionFailed).needs_relogin());
    }
}
