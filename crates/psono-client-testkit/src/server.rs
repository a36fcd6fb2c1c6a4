//! An in-process Psono server.
//!
//! Implements [`Transport`] so a client can be pointed at it directly. It
//! checks the login signature, answers with boxed and signed login info, and
//! seals every authenticated response under the session key, the same way a
//! real server does. Knobs let tests forge signatures, narrow the API key's
//! scope or expire sessions.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use psono_client_core::{
    box_encrypt, encoding, BoxPublicKey, BoxSecretKey, Nonce, SealedBox, SecretBoxKey, Signature,
    SigningKeypair,
};
use psono_client_session::messages::{
    paths, CreateSecretRequest, LoginRequest, SecretRecord, WriteDatastoreRequest,
};
use psono_client_session::{ApiKeyScope, ApiRequest, Method, Result, SessionError, Transport};

use crate::fixtures::{wrap, TestAccount};

/// A datastore as the server stores it.
#[derive(Debug, Clone)]
pub struct StoredDatastore {
    pub id: String,
    pub kind: String,
    pub description: String,
    /// The server never sees this key; the fake keeps it for inspection.
    pub secret_key: SecretBoxKey,
    pub wrapped_key: SealedBox,
    pub data: Option<String>,
    pub data_nonce: Option<String>,
}

/// A secret as the server stores it.
#[derive(Debug, Clone)]
pub struct StoredSecret {
    pub id: String,
    pub link_id: String,
    pub parent_datastore_id: String,
    pub record: SecretRecord,
}

struct State {
    scope: ApiKeyScope,
    forge_signatures: bool,
    omit_user: bool,
    sessions: HashMap<String, SecretBoxKey>,
    datastores: Vec<StoredDatastore>,
    secrets: HashMap<String, StoredSecret>,
    requests: Vec<(Method, String)>,
    datastore_writes: usize,
    logouts: usize,
}

/// A fake server for one [`TestAccount`].
pub struct FakeServer {
    account: TestAccount,
    state: Mutex<State>,
}

fn status(status: u16, body: &str) -> SessionError {
    SessionError::HttpStatus {
        status,
        body: json!({ "detail": body }).to_string(),
    }
}

impl FakeServer {
    /// A server with full scope and no datastores.
    pub fn new(account: TestAccount) -> Self {
        Self {
            account,
            state: Mutex::new(State {
                scope: ApiKeyScope {
                    read: true,
                    write: true,
                    restrict_to_secrets: false,
                },
                forge_signatures: false,
                omit_user: false,
                sessions: HashMap::new(),
                datastores: Vec::new(),
                secrets: HashMap::new(),
                requests: Vec::new(),
                datastore_writes: 0,
                logouts: 0,
            }),
        }
    }

    pub fn account(&self) -> &TestAccount {
        &self.account
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    // ── Knobs ──

    /// Scope reported in future login infos and enforced on calls.
    pub fn set_scope(&self, scope: ApiKeyScope) {
        self.state().scope = scope;
    }

    /// Sign login infos with a key other than the configured server key.
    pub fn forge_signatures(&self, forge: bool) {
        self.state().forge_signatures = forge;
    }

    /// Leave the `user` block out of unrestricted login infos.
    pub fn omit_user_key_material(&self, omit: bool) {
        self.state().omit_user = omit;
    }

    /// Rotate every session key server-side. Clients holding the old key can
    /// no longer open responses.
    pub fn expire_sessions(&self) {
        for key in self.state().sessions.values_mut() {
            *key = SecretBoxKey::generate();
        }
    }

    /// Forget every token. Later calls are rejected with 401.
    pub fn revoke_sessions(&self) {
        self.state().sessions.clear();
    }

    // ── Provisioning ──

    /// Add an empty datastore of type `kind`, returning its id.
    pub fn add_datastore(&self, kind: &str) -> String {
        let key = SecretBoxKey::generate();
        let datastore = StoredDatastore {
            id: uuid::Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            description: "Default".to_string(),
            wrapped_key: wrap(&key, &self.account.user_secret_key),
            secret_key: key,
            data: None,
            data_nonce: None,
        };
        let id = datastore.id.clone();
        self.state().datastores.push(datastore);
        id
    }

    /// Add a datastore of type `kind` holding `content`.
    pub fn add_datastore_with_content(&self, kind: &str, content: &Value) -> String {
        let id = self.add_datastore(kind);
        let mut state = self.state();
        if let Some(datastore) = state.datastores.iter_mut().find(|d| d.id == id) {
            let sealed = SealedBox::seal(content.to_string().as_bytes(), &datastore.secret_key)
                .expect("secret box sealing cannot fail");
            datastore.data = Some(sealed.text_hex());
            datastore.data_nonce = Some(sealed.nonce_hex());
        }
        id
    }

    // ── Inspection ──

    pub fn datastore(&self, id: &str) -> Option<StoredDatastore> {
        self.state().datastores.iter().find(|d| d.id == id).cloned()
    }

    /// Decrypt a datastore's stored content with its key.
    pub fn datastore_content(&self, id: &str) -> Option<Value> {
        let datastore = self.datastore(id)?;
        let sealed = SealedBox::from_hex(datastore.data.as_deref()?, datastore.data_nonce.as_deref()?)
            .ok()?;
        let plaintext = sealed.open(&datastore.secret_key).ok()?;
        serde_json::from_slice(&plaintext).ok()
    }

    pub fn secret(&self, id: &str) -> Option<StoredSecret> {
        self.state().secrets.get(id).cloned()
    }

    pub fn secret_count(&self) -> usize {
        self.state().secrets.len()
    }

    pub fn datastore_writes(&self) -> usize {
        self.state().datastore_writes
    }

    pub fn logouts(&self) -> usize {
        self.state().logouts
    }

    pub fn active_sessions(&self) -> usize {
        self.state().sessions.len()
    }

    /// Method and path of every request received.
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.state().requests.clone()
    }

    // ── Handlers ──

    fn login(&self, state: &mut State, request: &ApiRequest) -> Result<Value> {
        let body: LoginRequest = parse(request)?;
        let signature =
            Signature::from_hex(&body.signature).map_err(|_| status(400, "bad signature"))?;
        self.account
            .api_key_signing_key
            .verify_key()
            .verify(body.info.as_bytes(), &signature)
            .map_err(|_| status(401, "login info signature invalid"))?;

        let info: Value =
            serde_json::from_str(&body.info).map_err(|_| status(400, "info is not JSON"))?;
        if info["api_key_id"] != self.account.api_key_id.as_str() {
            return Err(status(401, "unknown api key"));
        }
        let client_key = info["session_public_key"]
            .as_str()
            .and_then(|k| BoxPublicKey::from_hex(k).ok())
            .ok_or_else(|| status(400, "bad session_public_key"))?;

        let token = uuid::Uuid::new_v4().simple().to_string();
        let session_key = SecretBoxKey::generate();

        let mut login_info = json!({
            "token": token,
            "session_secret_key": session_key.to_hex(),
            "api_key_read": state.scope.read,
            "api_key_write": state.scope.write,
            "api_key_restrict_to_secrets": state.scope.restrict_to_secrets,
            "session_valid_till": "2099-01-01T00:00:00Z",
        });
        if !state.scope.restrict_to_secrets && !state.omit_user {
            let wrapped = self.account.wrapped_user_secret_key();
            login_info["user"] = json!({
                "secret_key": wrapped.text_hex(),
                "secret_key_nonce": wrapped.nonce_hex(),
            });
        }
        let plaintext = login_info.to_string();

        let server_session = BoxSecretKey::generate();
        let nonce = Nonce::generate();
        let ciphertext = box_encrypt(plaintext.as_bytes(), &nonce, &client_key, &server_session)
            .map_err(|_| status(500, "box failed"))?;
        let signature = if state.forge_signatures {
            SigningKeypair::generate().sign(plaintext.as_bytes())
        } else {
            self.account.server_signing_key.sign(plaintext.as_bytes())
        };

        state.sessions.insert(token, session_key);

        Ok(json!({
            "login_info": encoding::encode(&ciphertext),
            "login_info_nonce": nonce.to_hex(),
            "login_info_signature": signature.to_hex(),
            "server_session_public_key": server_session.public_key().to_hex(),
        }))
    }

    fn authenticated(&self, state: &mut State, request: &ApiRequest) -> Result<Value> {
        let token = request
            .token
            .as_deref()
            .ok_or_else(|| status(401, "Authentication credentials were not provided."))?;
        let session_key = state
            .sessions
            .get(token)
            .cloned()
            .ok_or_else(|| status(401, "Invalid token."))?;

        let scope = state.scope;
        let datastore_access = !scope.restrict_to_secrets;
        let path = request.path.as_str();

        let response = match (request.method, path) {
            (Method::Post, paths::LOGOUT) => {
                state.sessions.remove(token);
                state.logouts += 1;
                json!({})
            }
            (Method::Get, paths::DATASTORES) if datastore_access && scope.read => {
                let datastores: Vec<Value> = state
                    .datastores
                    .iter()
                    .map(|d| {
                        json!({
                            "id": d.id,
                            "type": d.kind,
                            "description": d.description,
                            "is_default": true,
                        })
                    })
                    .collect();
                json!({ "datastores": datastores })
            }
            (Method::Post, paths::DATASTORES) if datastore_access && scope.write => {
                let body: WriteDatastoreRequest = parse(request)?;
                let datastore = state
                    .datastores
                    .iter_mut()
                    .find(|d| d.id == body.datastore_id)
                    .ok_or_else(|| status(400, "datastore not found"))?;
                datastore.data = Some(body.data);
                datastore.data_nonce = Some(body.data_nonce);
                state.datastore_writes += 1;
                json!({})
            }
            (Method::Put, paths::SECRETS) if datastore_access && scope.write => {
                let body: CreateSecretRequest = parse(request)?;
                if !state
                    .datastores
                    .iter()
                    .any(|d| d.id == body.parent_datastore_id)
                {
                    return Err(status(400, "parent datastore not found"));
                }
                let id = uuid::Uuid::new_v4().to_string();
                state.secrets.insert(
                    id.clone(),
                    StoredSecret {
                        id: id.clone(),
                        link_id: body.link_id,
                        parent_datastore_id: body.parent_datastore_id,
                        record: SecretRecord {
                            data: body.data,
                            data_nonce: body.data_nonce,
                        },
                    },
                );
                json!({ "secret_id": id })
            }
            (Method::Get, _) if path.starts_with("/datastore/") && datastore_access && scope.read => {
                let id = trim_id(path, "/datastore/");
                let datastore = state
                    .datastores
                    .iter()
                    .find(|d| d.id == id)
                    .ok_or_else(|| status(404, "Not found."))?;
                let mut record = json!({
                    "secret_key": datastore.wrapped_key.text_hex(),
                    "secret_key_nonce": datastore.wrapped_key.nonce_hex(),
                });
                if let (Some(data), Some(nonce)) = (&datastore.data, &datastore.data_nonce) {
                    record["data"] = json!(data);
                    record["data_nonce"] = json!(nonce);
                }
                record
            }
            (Method::Get, _) if path.starts_with("/secret/") && scope.read => {
                let id = trim_id(path, "/secret/");
                let secret = state
                    .secrets
                    .get(id)
                    .ok_or_else(|| status(404, "Not found."))?;
                json!({
                    "data": secret.record.data,
                    "data_nonce": secret.record.data_nonce,
                })
            }
            (_, _) if is_known(path) => return Err(status(403, "Permission denied.")),
            _ => return Err(status(404, "Not found.")),
        };

        let sealed = SealedBox::seal(response.to_string().as_bytes(), &session_key)
            .map_err(|_| status(500, "seal failed"))?;
        Ok(serde_json::to_value(sealed.to_envelope())?)
    }
}

fn parse<T: serde::de::DeserializeOwned>(request: &ApiRequest) -> Result<T> {
    let body = request
        .body
        .clone()
        .ok_or_else(|| status(400, "missing body"))?;
    serde_json::from_value(body).map_err(|e| status(400, &e.to_string()))
}

fn trim_id<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.trim_start_matches(prefix).trim_end_matches('/')
}

fn is_known(path: &str) -> bool {
    path.starts_with("/datastore/") || path.starts_with("/secret/")
}

#[async_trait]
impl Transport for FakeServer {
    async fn request(&self, request: ApiRequest) -> Result<Value> {
        let mut state = self.state();
        state
            .requests
            .push((request.method, request.path.clone()));

        match (request.method, request.path.as_str()) {
            (Method::Post, paths::LOGIN) => self.login(&mut state, &request),
            _ => self.authenticated(&mut state, &request),
        }
    }
}
