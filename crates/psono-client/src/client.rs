//! The client: login, then policy-checked datastore and secret operations.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use psono_client_core::SecretBoxKey;
use psono_client_session::messages::DatastoreSummary;
use psono_client_session::{
    login, ApiKeyScope, ClientConfig, EstablishedSession, Operation, SessionClient, SessionError,
    Transport,
};
use psono_client_store::{
    fetch_secret, unwrap_user_secret_key, EnvelopeStore, Item, OpenDatastore, PASSWORD_DATASTORE,
};

use crate::error::Result;

/// What the login unlocked.
enum Access<T> {
    /// The key is restricted to specific secrets; datastores stay locked.
    Restricted(SessionClient<T>),
    /// The user secret key is unwrapped; datastores can be opened.
    Unlocked(EnvelopeStore<T>),
}

/// A logged-in client.
pub struct Client<T> {
    scope: ApiKeyScope,
    access: Access<T>,
}

impl<T: Transport> Client<T> {
    /// Log in and, for unrestricted keys, unwrap the user secret key.
    ///
    /// A session whose user key does not unwrap is logged out before the
    /// error is returned.
    pub async fn connect(config: &ClientConfig, transport: T) -> Result<Self> {
        let EstablishedSession {
            context,
            login_info,
        } = login(config, &transport).await?;
        let scope = login_info.scope();
        let session = SessionClient::new(transport, context);

        let access = if scope.can_unlock_datastores() {
            match unwrap_user_secret_key(&login_info, &config.api_key_secret_key) {
                Ok(user_key) => Access::Unlocked(EnvelopeStore::new(session, user_key)),
                Err(err) => {
                    if let Err(logout_err) = session.logout().await {
                        warn!(error = %logout_err, "logout after failed unlock");
                    }
                    return Err(err.into());
                }
            }
        } else {
            Access::Restricted(session)
        };

        info!(
            read = scope.read,
            write = scope.write,
            restricted = scope.restrict_to_secrets,
            "logged in"
        );
        Ok(Self { scope, access })
    }

    /// The scope granted to the API key.
    pub fn scope(&self) -> ApiKeyScope {
        self.scope
    }

    /// Whether datastores were unlocked at login.
    pub fn is_unlocked(&self) -> bool {
        matches!(self.access, Access::Unlocked(_))
    }

    fn session(&self) -> &SessionClient<T> {
        match &self.access {
            Access::Restricted(session) => session,
            Access::Unlocked(store) => store.session(),
        }
    }

    fn store(&self, operation: Operation) -> Result<&EnvelopeStore<T>> {
        self.scope.check(operation)?;
        match &self.access {
            Access::Unlocked(store) => Ok(store),
            Access::Restricted(_) => Err(SessionError::PolicyDenied {
                operation,
                reason: "datastores were not unlocked at login",
            }
            .into()),
        }
    }

    /// All datastores of the account.
    pub async fn list_datastores(&self) -> Result<Vec<DatastoreSummary>> {
        let store = self.store(Operation::ReadDatastore)?;
        Ok(store.list_datastores().await?)
    }

    /// Open a datastore by id.
    pub async fn open_datastore(&self, datastore_id: &str) -> Result<OpenDatastore> {
        let store = self.store(Operation::ReadDatastore)?;
        Ok(store.fetch_and_unwrap_datastore(datastore_id).await?)
    }

    /// Open the account's first password datastore.
    pub async fn open_password_datastore(&self) -> Result<OpenDatastore> {
        let store = self.store(Operation::ReadDatastore)?;
        let summary = store.find_datastore_by_type(PASSWORD_DATASTORE).await?;
        debug!(datastore_id = %summary.id, "password datastore located");
        Ok(store.fetch_and_unwrap_datastore(&summary.id).await?)
    }

    /// Create a secret and file it under `folder_name` (created if missing).
    ///
    /// The datastore changes in memory only; call [`Client::save`] to write
    /// it back.
    pub async fn add_secret<C: Serialize + ?Sized>(
        &self,
        datastore: &mut OpenDatastore,
        folder_name: &str,
        name: &str,
        kind: &str,
        content: &C,
    ) -> Result<Item> {
        let store = self.store(Operation::CreateSecret)?;
        let datastore_id = datastore.id().to_string();
        let folder = datastore.content_mut().find_or_create_folder(folder_name);
        let item = store
            .create_secret(folder, name, kind, content, &datastore_id)
            .await?;
        Ok(item.clone())
    }

    /// Write a datastore back.
    pub async fn save(&self, datastore: &OpenDatastore) -> Result<()> {
        let store = self.store(Operation::WriteDatastore)?;
        Ok(store.save(datastore).await?)
    }

    /// Fetch secret `secret_id` and open it with `key`.
    ///
    /// Works for restricted keys too, given the item key from elsewhere.
    pub async fn read_secret<R: DeserializeOwned>(
        &self,
        secret_id: &str,
        key: &SecretBoxKey,
    ) -> Result<R> {
        self.scope.check(Operation::ReadSecret)?;
        Ok(fetch_secret(self.session(), secret_id, key).await?)
    }

    /// Fetch and open the secret an item points at.
    pub async fn read_item<R: DeserializeOwned>(&self, item: &Item) -> Result<R> {
        let (secret_id, key) = item.secret_ref().ok_or_else(|| {
            psono_client_store::StoreError::NotFound(format!("item {} holds no secret", item.id))
        })?;
        self.read_secret(secret_id, key).await
    }

    /// End the session. Key material is dropped whatever the server answers.
    pub async fn logout(self) -> Result<()> {
        let session = match self.access {
            Access::Restricted(session) => session,
            Access::Unlocked(store) => store.into_session(),
        };
        session.logout().await?;
        info!("logged out");
        Ok(())
    }
}

impl<T> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("scope", &self.scope)
            .field("unlocked", &matches!(self.access, Access::Unlocked(_)))
            .finish()
    }
}
