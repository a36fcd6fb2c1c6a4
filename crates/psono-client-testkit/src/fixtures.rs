//! Test fixtures and helpers.

use psono_client_core::{BoxPublicKey, BoxSecretKey, SealedBox, SecretBoxKey, SigningKeypair};
use psono_client_session::ClientConfig;

/// Base URL used by configurations pointed at the fake server.
pub const FAKE_SERVER_URL: &str = "https://psono.invalid/server";

/// All long-lived key material of one API key, its user and the server.
#[derive(Clone)]
pub struct TestAccount {
    pub api_key_id: String,
    pub api_key_signing_key: SigningKeypair,
    pub api_key_secret_key: SecretBoxKey,
    pub user_secret_key: SecretBoxKey,
    pub server_signing_key: SigningKeypair,
    pub server_public_key: BoxPublicKey,
}

impl TestAccount {
    /// Create an account with random keys.
    pub fn new() -> Self {
        Self {
            api_key_id: uuid::Uuid::new_v4().to_string(),
            api_key_signing_key: SigningKeypair::generate(),
            api_key_secret_key: SecretBoxKey::generate(),
            user_secret_key: SecretBoxKey::generate(),
            server_signing_key: SigningKeypair::generate(),
            server_public_key: BoxSecretKey::generate().public_key(),
        }
    }

    /// Create with deterministic keys derived from `seed`.
    pub fn with_seed(seed: u8) -> Self {
        Self {
            api_key_id: format!("00000000-0000-4000-8000-0000000000{seed:02x}"),
            api_key_signing_key: SigningKeypair::from_seed(&[seed; 32]),
            api_key_secret_key: SecretBoxKey::from_bytes([seed.wrapping_add(1); 32]),
            user_secret_key: SecretBoxKey::from_bytes([seed.wrapping_add(2); 32]),
            server_signing_key: SigningKeypair::from_seed(&[seed.wrapping_add(3); 32]),
            server_public_key: BoxSecretKey::from_bytes([seed.wrapping_add(4); 32]).public_key(),
        }
    }

    /// A client configuration for this account.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(
            FAKE_SERVER_URL,
            self.api_key_id.clone(),
            self.api_key_signing_key.clone(),
            self.api_key_secret_key.clone(),
            self.server_signing_key.verify_key(),
        )
        .with_server_public_key(self.server_public_key)
        .with_device_description("Console Client testkit")
    }

    /// Environment variables describing this account, as the binary reads them.
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("API_KEY_ID", self.api_key_id.clone()),
            (
                "API_KEY_PRIVATE_KEY",
                self.api_key_signing_key.seed_hex().to_string(),
            ),
            ("API_KEY_SECRET_KEY", self.api_key_secret_key.to_hex()),
            ("SERVER_URL", FAKE_SERVER_URL.to_string()),
            ("SERVER_PUBLIC_KEY", self.server_public_key.to_hex()),
            ("SERVER_SIGNATURE", self.server_signing_key.verify_key().to_hex()),
        ]
    }

    /// The user secret key wrapped under the API key's secret key.
    pub fn wrapped_user_secret_key(&self) -> SealedBox {
        wrap(&self.user_secret_key, &self.api_key_secret_key)
    }
}

impl Default for TestAccount {
    fn default() -> Self {
        Self::new()
    }
}

/// Seal `key` under `wrapping` as hex text.
pub fn wrap(key: &SecretBoxKey, wrapping: &SecretBoxKey) -> SealedBox {
    SealedBox::seal(key.to_hex().as_bytes(), wrapping).expect("secret box sealing cannot fail")
}

/// A typical application password payload.
pub fn application_password(title: &str) -> serde_json::Value {
    serde_json::json!({
        "application_password_title": title,
        "application_password_username": "MyUsername",
        "application_password_password": "MyPassword",
        "application_password_notes": "A note",
        "application_password_auto_submit": false,
        "application_password_url_filter": "www.example.com",
    })
}
