//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use psono_client_core::SecretBoxKey;

/// Generate a random secret box key.
pub fn secret_box_key() -> impl Strategy<Value = SecretBoxKey> {
    any::<[u8; 32]>().prop_map(SecretBoxKey::from_bytes)
}

/// Generate a folder or item name, including mixed case and spaces.
pub fn name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 _-]{0,23}"
}

/// Generate a flat secret payload of string fields.
pub fn secret_content() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z_]{1,16}", ".{0,64}", 0..8).prop_map(|fields| {
        Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect::<Map<String, Value>>(),
        )
    })
}
