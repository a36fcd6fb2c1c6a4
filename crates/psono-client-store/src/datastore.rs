//! An unlocked datastore: its id, its key and its decrypted tree.

use zeroize::Zeroizing;

use psono_client_core::SealedBox;
use psono_client_session::messages::{DatastoreRecord, WriteDatastoreRequest};

use crate::content::DatastoreContent;
use crate::error::{Layer, Result, StoreError};
use crate::keys::{DatastoreSecretKey, UserSecretKey};

/// A datastore opened in memory.
#[derive(Debug, Clone)]
pub struct OpenDatastore {
    id: String,
    key: DatastoreSecretKey,
    content: DatastoreContent,
}

impl OpenDatastore {
    pub fn new(id: impl Into<String>, key: DatastoreSecretKey, content: DatastoreContent) -> Self {
        Self {
            id: id.into(),
            key,
            content,
        }
    }

    /// Unwrap the record's key and decrypt its content.
    ///
    /// A record without data is a freshly provisioned, empty datastore.
    pub fn open(id: impl Into<String>, record: &DatastoreRecord, user: &UserSecretKey) -> Result<Self> {
        let key = DatastoreSecretKey::unwrap(record, user)?;
        let content = match (&record.data, &record.data_nonce) {
            _ if !record.has_data() => DatastoreContent::new(),
            (Some(data), Some(nonce)) => decrypt_content(data, nonce, &key)?,
            (Some(_), None) => {
                return Err(StoreError::MalformedRecord(
                    "datastore data without data_nonce".into(),
                ))
            }
            (None, _) => DatastoreContent::new(),
        };
        Ok(Self::new(id, key, content))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> &DatastoreSecretKey {
        &self.key
    }

    pub fn content(&self) -> &DatastoreContent {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut DatastoreContent {
        &mut self.content
    }

    pub fn into_parts(self) -> (DatastoreSecretKey, DatastoreContent) {
        (self.key, self.content)
    }

    /// Seal the current content for writing back.
    pub fn seal(&self) -> Result<WriteDatastoreRequest> {
        seal_content(&self.id, &self.content, &self.key)
    }
}

/// Decrypt and parse a datastore's content.
pub fn decrypt_content(data: &str, nonce: &str, key: &DatastoreSecretKey) -> Result<DatastoreContent> {
    let sealed = SealedBox::from_hex(data, nonce)
        .map_err(|e| StoreError::MalformedRecord(format!("datastore data: {e}")))?;
    let plaintext = Zeroizing::new(sealed.open(key.key()).map_err(|_| {
        StoreError::DecryptionFailed {
            layer: Layer::DatastoreContent,
        }
    })?);
    serde_json::from_slice(&plaintext)
        .map_err(|e| StoreError::MalformedRecord(format!("datastore content: {e}")))
}

/// Serialize and seal `content` under the datastore key.
pub fn seal_content(
    datastore_id: &str,
    content: &DatastoreContent,
    key: &DatastoreSecretKey,
) -> Result<WriteDatastoreRequest> {
    let plaintext = Zeroizing::new(serde_json::to_vec(content)?);
    let sealed = SealedBox::seal(&plaintext, key.key())?;
    Ok(WriteDatastoreRequest {
        datastore_id: datastore_id.to_string(),
        data: sealed.text_hex(),
        data_nonce: sealed.nonce_hex(),
    })
}
