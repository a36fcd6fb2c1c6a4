//! Transport codec for authenticated calls.
//!
//! Request bodies go out as plaintext JSON with the bearer token attached.
//! Every response is a `{text, nonce}` envelope sealed under the session
//! secret key and is opened before it is parsed.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use psono_client_core::{HexEnvelope, SealedBox, SecretBoxKey};

use crate::error::{Result, SessionError};
use crate::messages::paths;
use crate::transport::{ApiRequest, Transport};

/// Token and transport key of one login session.
///
/// Exclusively owned by whoever drives the session. Wiped on drop.
pub struct SessionContext {
    token: String,
    session_secret_key: SecretBoxKey,
}

impl SessionContext {
    /// Create a context from the token and session key of a login.
    pub fn new(token: impl Into<String>, session_secret_key: SecretBoxKey) -> Self {
        Self {
            token: token.into(),
            session_secret_key,
        }
    }

    /// The bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Request bodies travel as plaintext JSON.
    pub fn encode<B: Serialize>(&self, body: &B) -> Result<Value> {
        Ok(serde_json::to_value(body)?)
    }

    /// Attach the bearer token.
    pub fn authorize(&self, request: ApiRequest) -> ApiRequest {
        request.authorize(self.token.as_str())
    }

    /// Open a response envelope.
    ///
    /// A failure to open means the server no longer holds this session key,
    /// so it surfaces as [`SessionError::TransportDecryptionFailed`].
    pub fn decode(&self, envelope: &HexEnvelope) -> Result<Zeroizing<Vec<u8>>> {
        let sealed = SealedBox::from_envelope(envelope)
            .map_err(|e| SessionError::MalformedResponse(format!("response envelope: {e}")))?;
        sealed
            .open(&self.session_secret_key)
            .map(Zeroizing::new)
            .map_err(|_| SessionError::TransportDecryptionFailed)
    }

    /// Open a response envelope and parse the JSON inside.
    pub fn decode_json<R: DeserializeOwned>(&self, response: Value) -> Result<R> {
        let envelope: HexEnvelope = serde_json::from_value(response).map_err(|e| {
            SessionError::MalformedResponse(format!("expected an encrypted envelope: {e}"))
        })?;
        let plaintext = self.decode(&envelope)?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| SessionError::MalformedResponse(format!("decrypted response: {e}")))
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.token.zeroize();
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionContext(..)")
    }
}

/// A transport bound to an established session.
pub struct SessionClient<T> {
    transport: T,
    context: SessionContext,
}

impl<T: Transport> SessionClient<T> {
    /// Bind `context` to `transport`.
    pub fn new(transport: T, context: SessionContext) -> Self {
        Self { transport, context }
    }

    /// The session's token and key.
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send an authenticated call and decode its response.
    pub async fn call<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R> {
        let request = self.context.authorize(request);
        debug!(method = %request.method, path = %request.path, "authenticated call");
        let response = self.transport.request(request).await?;
        self.context.decode_json(response)
    }

    /// Serialize `body` and send it as an authenticated call.
    pub async fn call_with<B: Serialize, R: DeserializeOwned>(
        &self,
        request: ApiRequest,
        body: &B,
    ) -> Result<R> {
        let body = self.context.encode(body)?;
        self.call(request.with_body(body)).await
    }

    /// End the session on the server.
    ///
    /// The context is dropped whatever the server answers.
    pub async fn logout(self) -> Result<()> {
        let Self { transport, context } = self;
        let request = context.authorize(ApiRequest::post(paths::LOGOUT));
        drop(context);
        debug!("logging out");
        transport.request(request).await.map(|_| ())
    }
}

impl<T> fmt::Debug for SessionClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClient")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
