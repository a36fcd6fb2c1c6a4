//! # Psono Client Store
//!
//! Nested envelope encryption for Psono datastores.
//!
//! ```text
//! API-key secret
//!   └─ user secret key          (login info, unrestricted keys only)
//!        └─ datastore key       (datastore record)
//!             └─ folder/item tree
//!                  └─ item key  (one per secret, lives only in the tree)
//!                       └─ secret payload
//! ```
//!
//! Each key protects exactly the next layer. Losing an item's key makes its
//! secret unrecoverable even with full server access.
//!
//! All network I/O goes through a [`SessionClient`](psono_client_session::SessionClient);
//! this crate only peels and applies layers.

pub mod content;
pub mod datastore;
pub mod error;
pub mod keys;
pub mod locks;
pub mod secret;
pub mod store;

pub use content::{DatastoreContent, Folder, Item};
pub use datastore::OpenDatastore;
pub use error::{Layer, Result, StoreError};
pub use keys::{unwrap_user_secret_key, wrap_key, DatastoreSecretKey, UserSecretKey};
pub use locks::DatastoreLocks;
pub use secret::{fetch_secret, open_secret, seal_secret};
pub use store::{EnvelopeStore, PASSWORD_DATASTORE};
