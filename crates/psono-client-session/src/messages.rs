//! Wire messages exchanged with the server.
//!
//! Every binary field (keys, nonces, signatures, ciphertext) is a lowercase
//! hex string. Authenticated responses arrive wrapped in a `{text, nonce}`
//! envelope and are only parsed into these types after decryption.

use serde::{Deserialize, Serialize};
use std::fmt;

use psono_client_core::SecretBoxKey;

use crate::policy::ApiKeyScope;

/// Endpoint paths.
pub mod paths {
    pub const LOGIN: &str = "/api-key/login/";
    pub const LOGOUT: &str = "/authentication/logout/";
    pub const DATASTORES: &str = "/datastore/";
    pub const SECRETS: &str = "/secret/";

    /// Path of a single datastore.
    pub fn datastore(id: &str) -> String {
        format!("/datastore/{id}/")
    }

    /// Path of a single secret.
    pub fn secret(id: &str) -> String {
        format!("/secret/{id}/")
    }
}

/// Body of the login request: the signed assertion text and its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// The exact JSON text that was signed.
    pub info: String,
    /// 128 hex characters.
    pub signature: String,
}

/// The server's answer to a login request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerLoginEnvelope {
    /// Boxed `ServerLoginInfo` JSON.
    pub login_info: String,
    pub login_info_nonce: String,
    /// Server signature over the decrypted login info.
    pub login_info_signature: String,
    /// The server's ephemeral box key for this session.
    pub server_session_public_key: String,
}

/// The decrypted login info.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerLoginInfo {
    /// Bearer token for every subsequent call.
    pub token: String,
    /// Transport key, valid for the lifetime of `token`.
    pub session_secret_key: SecretBoxKey,
    pub api_key_read: bool,
    pub api_key_write: bool,
    pub api_key_restrict_to_secrets: bool,
    /// Present for unrestricted keys only.
    #[serde(default)]
    pub user: Option<UserKeyMaterial>,
}

impl ServerLoginInfo {
    /// The scope granted to the API key that logged in.
    pub fn scope(&self) -> ApiKeyScope {
        ApiKeyScope {
            read: self.api_key_read,
            write: self.api_key_write,
            restrict_to_secrets: self.api_key_restrict_to_secrets,
        }
    }
}

impl fmt::Debug for ServerLoginInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerLoginInfo")
            .field("token", &"<redacted>")
            .field("api_key_read", &self.api_key_read)
            .field("api_key_write", &self.api_key_write)
            .field("api_key_restrict_to_secrets", &self.api_key_restrict_to_secrets)
            .field("user", &self.user.is_some())
            .finish()
    }
}

/// The user's secret key, wrapped under the API key's secret key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserKeyMaterial {
    pub secret_key: String,
    pub secret_key_nonce: String,
}

/// Response of `GET /datastore/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastoreList {
    pub datastores: Vec<DatastoreSummary>,
}

/// One entry of the datastore listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastoreSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

/// Response of `GET /datastore/{id}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastoreRecord {
    /// Datastore key, wrapped under the user's secret key.
    pub secret_key: String,
    pub secret_key_nonce: String,
    /// Encrypted content. Absent, null or empty for a new datastore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_nonce: Option<String>,
}

impl DatastoreRecord {
    /// Whether the datastore holds any encrypted content.
    pub fn has_data(&self) -> bool {
        self.data.as_deref().is_some_and(|d| !d.is_empty())
    }
}

/// Body of `POST /datastore/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteDatastoreRequest {
    pub datastore_id: String,
    pub data: String,
    pub data_nonce: String,
}

/// Body of `PUT /secret/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSecretRequest {
    pub data: String,
    pub data_nonce: String,
    /// Client-chosen id that also becomes the item's id in the datastore.
    pub link_id: String,
    pub parent_datastore_id: String,
    pub callback_url: String,
    pub callback_user: String,
    pub callback_pass: String,
}

/// Response of `PUT /secret/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSecretResponse {
    pub secret_id: String,
}

/// Response of `GET /secret/{id}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    pub data: String,
    pub data_nonce: String,
}
