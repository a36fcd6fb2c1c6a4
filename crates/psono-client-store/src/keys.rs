//! The key chain above the datastore content.
//!
//! API-key secret -> user secret key -> datastore secret key. Each wrapped
//! key is sealed as the hex text of its 32 bytes.

use std::fmt;
use zeroize::Zeroizing;

use psono_client_core::{SealedBox, SecretBoxKey};
use psono_client_session::messages::{DatastoreRecord, ServerLoginInfo, UserKeyMaterial};

use crate::error::{Layer, Result, StoreError};

/// Seal `key` under `wrapping` in the hex-text form the server stores.
pub fn wrap_key(key: &SecretBoxKey, wrapping: &SecretBoxKey) -> Result<SealedBox> {
    let text = Zeroizing::new(key.to_hex());
    Ok(SealedBox::seal(text.as_bytes(), wrapping)?)
}

/// Open a wrapped key.
pub fn unwrap_key(
    text: &str,
    nonce: &str,
    wrapping: &SecretBoxKey,
    layer: Layer,
) -> Result<SecretBoxKey> {
    let sealed = SealedBox::from_hex(text, nonce)
        .map_err(|e| StoreError::MalformedRecord(format!("{layer}: {e}")))?;
    let plaintext = Zeroizing::new(
        sealed
            .open(wrapping)
            .map_err(|_| StoreError::DecryptionFailed { layer })?,
    );
    let hex = std::str::from_utf8(&plaintext).map_err(|_| StoreError::DecryptionFailed { layer })?;
    SecretBoxKey::from_hex(hex.trim()).map_err(|_| StoreError::DecryptionFailed { layer })
}

/// The user's secret key. Only ever used to unwrap datastore keys.
pub struct UserSecretKey(SecretBoxKey);

impl UserSecretKey {
    pub fn new(key: SecretBoxKey) -> Self {
        Self(key)
    }

    /// Unwrap the user key material with the API key's secret key.
    pub fn unwrap(material: &UserKeyMaterial, api_key_secret_key: &SecretBoxKey) -> Result<Self> {
        unwrap_key(
            &material.secret_key,
            &material.secret_key_nonce,
            api_key_secret_key,
            Layer::UserSecretKey,
        )
        .map(Self)
    }

    pub fn key(&self) -> &SecretBoxKey {
        &self.0
    }
}

impl fmt::Debug for UserSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserSecretKey(..)")
    }
}

/// Unwrap the user secret key carried by an unrestricted login.
pub fn unwrap_user_secret_key(
    login_info: &ServerLoginInfo,
    api_key_secret_key: &SecretBoxKey,
) -> Result<UserSecretKey> {
    let material = login_info.user.as_ref().ok_or_else(|| {
        StoreError::Session(psono_client_session::SessionError::MalformedResponse(
            "login info carries no user key material".into(),
        ))
    })?;
    UserSecretKey::unwrap(material, api_key_secret_key)
}

/// A datastore's own key. Protects the folder/item tree.
#[derive(Clone, PartialEq, Eq)]
pub struct DatastoreSecretKey(SecretBoxKey);

impl DatastoreSecretKey {
    pub fn new(key: SecretBoxKey) -> Self {
        Self(key)
    }

    /// Unwrap a datastore record's key with the user secret key.
    pub fn unwrap(record: &DatastoreRecord, user: &UserSecretKey) -> Result<Self> {
        unwrap_key(
            &record.secret_key,
            &record.secret_key_nonce,
            user.key(),
            Layer::DatastoreSecretKey,
        )
        .map(Self)
    }

    pub fn key(&self) -> &SecretBoxKey {
        &self.0
    }
}

impl fmt::Debug for DatastoreSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DatastoreSecretKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use psono_client_core::encoding;
    use psono_client_testkit::generators;

    fn material(key: &SecretBoxKey, wrapping: &SecretBoxKey) -> UserKeyMaterial {
        let sealed = wrap_key(key, wrapping).unwrap();
        UserKeyMaterial {
            secret_key: sealed.text_hex(),
            secret_key_nonce: sealed.nonce_hex(),
        }
    }

    #[test]
    fn test_unwrap_chain() {
        let api_secret = SecretBoxKey::generate();
        let user = SecretBoxKey::generate();
        let datastore = SecretBoxKey::generate();

        let user_key = UserSecretKey::unwrap(&material(&user, &api_secret), &api_secret).unwrap();
        assert_eq!(user_key.key(), &user);

        let sealed = wrap_key(&datastore, &user).unwrap();
        let record = DatastoreRecord {
            secret_key: sealed.text_hex(),
            secret_key_nonce: sealed.nonce_hex(),
            data: None,
            data_nonce: None,
        };
        let ds_key = DatastoreSecretKey::unwrap(&record, &user_key).unwrap();
        assert_eq!(ds_key.key(), &datastore);
    }

    #[test]
    fn test_wrapped_plaintext_is_hex_text() {
        let key = SecretBoxKey::generate();
        let wrapping = SecretBoxKey::generate();
        let sealed = wrap_key(&key, &wrapping).unwrap();
        assert_eq!(sealed.open(&wrapping).unwrap(), key.to_hex().into_bytes());
    }

    #[test]
    fn test_uppercase_hex_accepted() {
        let key = SecretBoxKey::generate();
        let wrapping = SecretBoxKey::generate();
        let sealed = SealedBox::seal(key.to_hex().to_uppercase().as_bytes(), &wrapping).unwrap();
        let out = unwrap_key(
            &sealed.text_hex(),
            &sealed.nonce_hex(),
            &wrapping,
            Layer::UserSecretKey,
        )
        .unwrap();
        assert_eq!(out, key);
    }

    #[test]
    fn test_wrong_wrapping_key() {
        let api_secret = SecretBoxKey::generate();
        let m = material(&SecretBoxKey::generate(), &api_secret);
        let err = UserSecretKey::unwrap(&m, &SecretBoxKey::generate()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::DecryptionFailed {
                layer: Layer::UserSecretKey
            }
        ));
    }

    #[test]
    fn test_plaintext_not_a_key() {
        let wrapping = SecretBoxKey::generate();
        let sealed = SealedBox::seal(b"definitely not a key", &wrapping).unwrap();
        let err = unwrap_key(
            &sealed.text_hex(),
            &sealed.nonce_hex(),
            &wrapping,
            Layer::DatastoreSecretKey,
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::DecryptionFailed { .. }));

        let short = SealedBox::seal(encoding::encode([1u8; 16]).as_bytes(), &wrapping).unwrap();
        assert!(unwrap_key(
            &short.text_hex(),
            &short.nonce_hex(),
            &wrapping,
            Layer::DatastoreSecretKey
        )
        .is_err());
    }

    #[test]
    fn test_malformed_hex_record() {
        let err = unwrap_key("zz", "00", &SecretBoxKey::generate(), Layer::UserSecretKey)
            .unwrap_err();
        assert!(matches!(err, StoreError::MalformedRecord(_)));
    }

    #[test]
    fn test_missing_user_material() {
        let info = ServerLoginInfo {
            token: "t".into(),
            session_secret_key: SecretBoxKey::generate(),
            api_key_read: true,
            api_key_write: true,
            api_key_restrict_to_secrets: false,
            user: None,
        };
        assert!(matches!(
            unwrap_user_secret_key(&info, &SecretBoxKey::generate()),
            Err(StoreError::Session(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_wrapped_key_opens_only_under_its_wrapping_key(
            key in generators::secret_box_key(),
            wrapping in generators::secret_box_key(),
            other in generators::secret_box_key(),
        ) {
            prop_assume!(other != wrapping);
            let user = UserSecretKey::unwrap(&material(&key, &wrapping), &wrapping).unwrap();
            prop_assert_eq!(user.key(), &key);
            prop_assert!(UserSecretKey::unwrap(&material(&key, &wrapping), &other).is_err());
        }
    }
}
