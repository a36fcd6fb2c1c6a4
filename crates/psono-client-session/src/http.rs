//! HTTP transport backed by reqwest.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Result, SessionError};
use crate::transport::{ApiRequest, Method, Transport};

/// Sends API calls to a server over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for `base_url`.
    ///
    /// With `verify_tls` off, invalid certificates are accepted. Only meant
    /// for self-hosted test servers.
    pub fn new(base_url: impl Into<String>, verify_tls: bool, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| SessionError::TransportError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a transport from the client configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(
            config.server_url.clone(),
            config.verify_tls,
            config.request_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: ApiRequest) -> Result<Value> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, path = %request.path, "api request");

        let mut builder = self
            .client
            .request(to_reqwest(request.method), &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = &request.token {
            builder = builder.header(AUTHORIZATION, format!("Token {token}"));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SessionError::TransportError(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SessionError::TransportError(e.to_string()))?;

        debug!(method = %request.method, path = %request.path, status = status.as_u16(), "api response");

        if !status.is_success() {
            return Err(SessionError::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            SessionError::MalformedResponse(format!("{} {}: {e}", request.method, request.path))
        })
    }
}
