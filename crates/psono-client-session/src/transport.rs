//! Transport abstraction for API calls.
//!
//! The transport performs a single JSON request/response exchange. It does not
//! interpret the body: encryption and decryption happen above it, in the
//! handshake and the session codec. Implementations may use HTTP or an
//! in-process fake.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// HTTP method of an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single API call.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the server base URL, e.g. `/datastore/`.
    pub path: String,
    pub body: Option<Value>,
    /// Bearer token. `None` only for the login call.
    pub token: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            token: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` and attach it.
    pub fn with_json<B: Serialize>(self, body: &B) -> Result<Self> {
        Ok(self.with_body(serde_json::to_value(body)?))
    }

    /// Attach the bearer token.
    pub fn authorize(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Whether the request carries a bearer token.
    pub fn is_authorized(&self) -> bool {
        self.token.is_some()
    }
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body", &self.body.is_some())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The request/response collaborator.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the call and return the parsed JSON response body.
    ///
    /// An empty response body is returned as `Value::Null`.
    async fn request(&self, request: ApiRequest) -> Result<Value>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn request(&self, request: ApiRequest) -> Result<Value> {
        (**self).request(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn request(&self, request: ApiRequest) -> Result<Value> {
        (**self).request(request).await
    }
}

/// A scripted in-memory transport for testing.
///
/// Responses are consumed in order. Every request is recorded.
pub mod memory {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::error::SessionError;

    type Handler = Box<dyn FnOnce(&ApiRequest) -> Result<Value> + Send>;

    /// Transport that answers from a queue of handlers.
    #[derive(Default)]
    pub struct ScriptedTransport {
        handlers: Mutex<VecDeque<Handler>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl ScriptedTransport {
        /// Create an empty transport.
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a fixed response.
        pub fn push_response(&self, response: Value) {
            self.push_handler(move |_| Ok(response));
        }

        /// Queue a handler computing the response from the request.
        pub fn push_handler<F>(&self, handler: F)
        where
            F: FnOnce(&ApiRequest) -> Result<Value> + Send + 'static,
        {
            lock(&self.handlers).push_back(Box::new(handler));
        }

        /// All requests received so far.
        pub fn requests(&self) -> Vec<ApiRequest> {
            lock(&self.requests).clone()
        }

        /// Number of queued handlers not yet consumed.
        pub fn pending(&self) -> usize {
            lock(&self.handlers).len()
        }
    }

    fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn request(&self, request: ApiRequest) -> Result<Value> {
            let handler = lock(&self.handlers).pop_front();
            lock(&self.requests).push(request.clone());
            match handler {
                Some(handler) => handler(&request),
                None => Err(SessionError::TransportError(format!(
                    "no scripted response for {} {}",
                    request.method, request.path
                ))),
            }
        }
    }
}
