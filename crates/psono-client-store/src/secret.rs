//! Secret payloads, each sealed under its own key.

use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroizing;

use psono_client_core::{SealedBox, SecretBoxKey};
use psono_client_session::messages::{paths, SecretRecord};
use psono_client_session::{ApiRequest, SessionClient, Transport};

use crate::error::{Layer, Result, StoreError};

/// Serialize `content` and seal it under a freshly generated key.
pub fn seal_secret<C: Serialize + ?Sized>(content: &C) -> Result<(SecretBoxKey, SealedBox)> {
    let key = SecretBoxKey::generate();
    let plaintext = Zeroizing::new(serde_json::to_vec(content)?);
    let sealed = SealedBox::seal(&plaintext, &key)?;
    Ok((key, sealed))
}

/// Open a secret record with the key from its item.
pub fn open_secret<R: DeserializeOwned>(record: &SecretRecord, key: &SecretBoxKey) -> Result<R> {
    let sealed = SealedBox::from_hex(&record.data, &record.data_nonce)
        .map_err(|e| StoreError::MalformedRecord(format!("secret: {e}")))?;
    let plaintext = Zeroizing::new(
        sealed
            .open(key)
            .map_err(|_| StoreError::DecryptionFailed {
                layer: Layer::Secret,
            })?,
    );
    serde_json::from_slice(&plaintext)
        .map_err(|e| StoreError::MalformedRecord(format!("secret payload: {e}")))
}

/// Fetch secret `secret_id` and open it with `key`.
pub async fn fetch_secret<T: Transport, R: DeserializeOwned>(
    session: &SessionClient<T>,
    secret_id: &str,
    key: &SecretBoxKey,
) -> Result<R> {
    let record: SecretRecord = session.call(ApiRequest::get(paths::secret(secret_id))).await?;
    open_secret(&record, key)
}
