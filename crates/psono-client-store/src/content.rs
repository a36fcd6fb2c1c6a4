//! The plaintext folder/item tree of a datastore.
//!
//! Only the fields this client works with are typed. Everything else the
//! server or other clients put in the tree is kept in `extra` and written
//! back unchanged. Typed fields left empty are omitted on write, so folders
//! stored without `items` keep that shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use psono_client_core::SecretBoxKey;

/// Decrypted datastore content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatastoreContent {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub folders: Vec<Folder>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DatastoreContent {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// First folder named exactly `name`.
    pub fn find_folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }

    /// First folder named exactly `name`, appending a new empty one if there
    /// is none. Matching is case-sensitive; duplicates are not merged.
    pub fn find_or_create_folder(&mut self, name: &str) -> &mut Folder {
        let index = match self.folders.iter().position(|f| f.name == name) {
            Some(index) => index,
            None => {
                self.folders.push(Folder::new(name));
                self.folders.len() - 1
            }
        };
        &mut self.folders[index]
    }
}

/// A folder of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Folder {
    /// A new empty folder with a random id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            items: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Append `item` and return it.
    pub fn push_item(&mut self, item: Item) -> &Item {
        self.items.push(item);
        &self.items[self.items.len() - 1]
    }

    /// First item named exactly `name`.
    pub fn find_item(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.name == name)
    }
}

/// A pointer to a separately stored secret, holding the key that opens it.
///
/// The item's `secret_key` is the only durable copy of that key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Absent on entries that are not secrets, such as links to shares.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<SecretBoxKey>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    /// An item pointing at secret `secret_id`.
    pub fn secret(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<String>,
        secret_id: impl Into<String>,
        secret_key: SecretBoxKey,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            secret_id: Some(secret_id.into()),
            secret_key: Some(secret_key),
            extra: Map::new(),
        }
    }

    /// The secret id and key, if this item points at a secret.
    pub fn secret_ref(&self) -> Option<(&str, &SecretBoxKey)> {
        match (&self.secret_id, &self.secret_key) {
            (Some(id), Some(key)) => Some((id.as_str(), key)),
            _ => None,
        }
    }
}
