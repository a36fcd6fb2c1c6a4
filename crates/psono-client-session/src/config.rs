//! Client configuration.
//!
//! Built once at start-up and passed by reference into the handshake. Nothing
//! in the library reads the environment on its own.

use std::fmt;
use std::time::Duration;

use psono_client_core::{BoxPublicKey, SecretBoxKey, SigningKeypair, VerifyKey};

use crate::error::{Result, SessionError};

/// Default HTTP request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `https://psono.example.com/server`. No trailing slash.
    pub server_url: String,
    pub api_key_id: String,
    /// Long-lived Ed25519 key that signs the login assertion.
    pub api_key_signing_key: SigningKeypair,
    /// Long-lived symmetric key wrapping the user's secret key.
    pub api_key_secret_key: SecretBoxKey,
    /// Long-lived server key that signs the login info.
    pub server_verify_key: VerifyKey,
    /// The server's long-lived box key. Validated when present; the login
    /// response carries its own per-session box key.
    pub server_public_key: Option<BoxPublicKey>,
    /// Shown in the server's session overview.
    pub device_description: String,
    pub verify_tls: bool,
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with default device description, TLS
    /// verification on and the default timeout.
    pub fn new(
        server_url: impl Into<String>,
        api_key_id: impl Into<String>,
        api_key_signing_key: SigningKeypair,
        api_key_secret_key: SecretBoxKey,
        server_verify_key: VerifyKey,
    ) -> Self {
        Self {
            server_url: normalize_url(server_url.into()),
            api_key_id: api_key_id.into(),
            api_key_signing_key,
            api_key_secret_key,
            server_verify_key,
            server_public_key: None,
            device_description: default_device_description(None),
            verify_tls: true,
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_server_public_key(mut self, key: BoxPublicKey) -> Self {
        self.server_public_key = Some(key);
        self
    }

    pub fn with_device_description(mut self, description: impl Into<String>) -> Self {
        self.device_description = description.into();
        self
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup.
    ///
    /// Required: `API_KEY_ID`, `API_KEY_PRIVATE_KEY`, `API_KEY_SECRET_KEY`,
    /// `SERVER_URL`, `SERVER_SIGNATURE`. Optional: `SERVER_PUBLIC_KEY`,
    /// `SSL_VERIFY` (default `true`), `DEVICE_DESCRIPTION`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| SessionError::InvalidConfig(format!("{name} is not set")))
        };
        let invalid =
            |name: &str, e: &dyn fmt::Display| SessionError::InvalidConfig(format!("{name}: {e}"));

        let api_key_id = required("API_KEY_ID")?;
        let signing_key = SigningKeypair::from_hex(required("API_KEY_PRIVATE_KEY")?.trim())
            .map_err(|e| invalid("API_KEY_PRIVATE_KEY", &e))?;
        let secret_key = SecretBoxKey::from_hex(required("API_KEY_SECRET_KEY")?.trim())
            .map_err(|e| invalid("API_KEY_SECRET_KEY", &e))?;
        let server_url = required("SERVER_URL")?;
        let verify_key = VerifyKey::from_hex(required("SERVER_SIGNATURE")?.trim())
            .map_err(|e| invalid("SERVER_SIGNATURE", &e))?;

        let mut config = Self::new(server_url, api_key_id, signing_key, secret_key, verify_key);

        if let Some(hex) = lookup("SERVER_PUBLIC_KEY").filter(|v| !v.trim().is_empty()) {
            let key = BoxPublicKey::from_hex(hex.trim())
                .map_err(|e| invalid("SERVER_PUBLIC_KEY", &e))?;
            config.server_public_key = Some(key);
        }

        if let Some(value) = lookup("SSL_VERIFY") {
            config.verify_tls = parse_bool(&value).ok_or_else(|| {
                SessionError::InvalidConfig(format!("SSL_VERIFY: not a boolean: {value}"))
            })?;
        }

        config.device_description = match lookup("DEVICE_DESCRIPTION") {
            Some(description) if !description.is_empty() => description,
            _ => default_device_description(lookup("HOSTNAME")),
        };

        Ok(config)
    }

    /// Full URL for an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_url", &self.server_url)
            .field("api_key_id", &self.api_key_id)
            .field("server_verify_key", &self.server_verify_key)
            .field("device_description", &self.device_description)
            .field("verify_tls", &self.verify_tls)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

fn normalize_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn default_device_description(hostname: Option<String>) -> String {
    let hostname = hostname
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string());
    format!("Console Client {hostname}")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
