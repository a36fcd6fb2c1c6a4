//! Datastore and secret operations over an established session.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

use psono_client_core::SecretBoxKey;
use psono_client_session::messages::{
    paths, CreateSecretRequest, CreateSecretResponse, DatastoreList, DatastoreRecord,
    DatastoreSummary, ServerLoginInfo,
};
use psono_client_session::{ApiRequest, SessionClient, Transport};

use crate::content::{DatastoreContent, Folder, Item};
use crate::datastore::{seal_content, OpenDatastore};
use crate::error::{Result, StoreError};
use crate::keys::{unwrap_user_secret_key, DatastoreSecretKey, UserSecretKey};
use crate::locks::DatastoreLocks;
use crate::secret::{fetch_secret, seal_secret};

/// Datastore type holding the user's passwords.
pub const PASSWORD_DATASTORE: &str = "password";

/// The envelope store: a session plus the unlocked user secret key.
pub struct EnvelopeStore<T> {
    session: SessionClient<T>,
    user_key: UserSecretKey,
    locks: DatastoreLocks,
}

impl<T: Transport> EnvelopeStore<T> {
    /// Bind an already unwrapped user key to `session`.
    pub fn new(session: SessionClient<T>, user_key: UserSecretKey) -> Self {
        Self {
            session,
            user_key,
            locks: DatastoreLocks::new(),
        }
    }

    /// Unwrap the user secret key from an unrestricted login and bind it to
    /// the session.
    pub fn unlock(
        session: SessionClient<T>,
        login_info: &ServerLoginInfo,
        api_key_secret_key: &SecretBoxKey,
    ) -> Result<Self> {
        let user_key = unwrap_user_secret_key(login_info, api_key_secret_key)?;
        debug!("user secret key unwrapped");
        Ok(Self::new(session, user_key))
    }

    /// The underlying session.
    pub fn session(&self) -> &SessionClient<T> {
        &self.session
    }

    /// Give the session back, dropping the user secret key.
    pub fn into_session(self) -> SessionClient<T> {
        self.session
    }

    /// All datastores of the account.
    pub async fn list_datastores(&self) -> Result<Vec<DatastoreSummary>> {
        let list: DatastoreList = self.session.call(ApiRequest::get(paths::DATASTORES)).await?;
        Ok(list.datastores)
    }

    /// The first datastore of type `kind`.
    pub async fn find_datastore_by_type(&self, kind: &str) -> Result<DatastoreSummary> {
        self.list_datastores()
            .await?
            .into_iter()
            .find(|d| d.kind == kind)
            .ok_or_else(|| StoreError::NotFound(format!("no datastore of type {kind:?}")))
    }

    /// Fetch a datastore, unwrap its key and decrypt its content.
    pub async fn fetch_and_unwrap_datastore(&self, datastore_id: &str) -> Result<OpenDatastore> {
        let record: DatastoreRecord = self
            .session
            .call(ApiRequest::get(paths::datastore(datastore_id)))
            .await?;
        let datastore = OpenDatastore::open(datastore_id, &record, &self.user_key)?;
        debug!(
            datastore_id,
            folders = datastore.content().folders.len(),
            "datastore unwrapped"
        );
        Ok(datastore)
    }

    /// Create a secret on the server and append its item to `folder`.
    ///
    /// The secret is sealed under a fresh key that is stored only in the
    /// returned item. Nothing reaches the server's copy of the datastore
    /// until it is persisted.
    pub async fn create_secret<'f, C: Serialize + ?Sized>(
        &self,
        folder: &'f mut Folder,
        name: &str,
        kind: &str,
        content: &C,
        datastore_id: &str,
    ) -> Result<&'f Item> {
        let (secret_key, sealed) = seal_secret(content)?;
        let link_id = Uuid::new_v4().to_string();

        let request = CreateSecretRequest {
            data: sealed.text_hex(),
            data_nonce: sealed.nonce_hex(),
            link_id: link_id.clone(),
            parent_datastore_id: datastore_id.to_string(),
            callback_url: String::new(),
            callback_user: String::new(),
            callback_pass: String::new(),
        };
        let response: CreateSecretResponse = self
            .session
            .call_with(ApiRequest::put(paths::SECRETS), &request)
            .await?;

        info!(
            secret_id = %response.secret_id,
            datastore_id,
            folder_id = %folder.id,
            "secret created"
        );
        Ok(folder.push_item(Item::secret(
            link_id,
            name,
            kind,
            response.secret_id,
            secret_key,
        )))
    }

    /// Seal `content` under `key` and write it back.
    ///
    /// Writes to the same datastore id are serialized.
    pub async fn persist_datastore(
        &self,
        datastore_id: &str,
        content: &DatastoreContent,
        key: &DatastoreSecretKey,
    ) -> Result<()> {
        let request = seal_content(datastore_id, content, key)?;

        let _guard = self.locks.acquire(datastore_id).await;
        let _: Value = self
            .session
            .call_with(ApiRequest::post(paths::DATASTORES), &request)
            .await?;
        info!(datastore_id, "datastore written");
        Ok(())
    }

    /// Write an open datastore back.
    pub async fn save(&self, datastore: &OpenDatastore) -> Result<()> {
        self.persist_datastore(datastore.id(), datastore.content(), datastore.key())
            .await
    }

    /// Fetch and open the secret an item points at.
    pub async fn read_secret<R: DeserializeOwned>(&self, item: &Item) -> Result<R> {
        let (secret_id, key) = item
            .secret_ref()
            .ok_or_else(|| StoreError::NotFound(format!("item {} holds no secret", item.id)))?;
        fetch_secret(&self.session, secret_id, key).await
    }
}

impl<T> fmt::Debug for EnvelopeStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeStore")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
