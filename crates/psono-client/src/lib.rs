//! # Psono Client
//!
//! A client for the Psono secret store driven by an API key.
//!
//! ## Overview
//!
//! - **Session**: a signed login over a fresh ephemeral key pair, verified
//!   against the server's long-lived signing key
//! - **Transport**: every authenticated response is sealed under the session
//!   secret key
//! - **Store**: datastores, folders, items and secrets, each layer under its
//!   own key
//!
//! ## Usage
//!
//! ```rust,no_run
//! use psono_client::{Client, ClientConfig, HttpTransport};
//!
//! async fn example() -> psono_client::Result<()> {
//!     let config = ClientConfig::from_env()?;
//!     let transport = HttpTransport::from_config(&config)?;
//!     let client = Client::connect(&config, transport).await?;
//!
//!     let mut datastore = client.open_password_datastore().await?;
//!     client
//!         .add_secret(
//!             &mut datastore,
//!             "My Folder",
//!             "My Secret",
//!             "note",
//!             &serde_json::json!({ "note_title": "My Secret", "note_notes": "..." }),
//!         )
//!         .await?;
//!     client.save(&datastore).await?;
//!     client.logout().await
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `psono_client::core` - signing, box and secret box primitives
//! - `psono_client::session` - handshake, transport and policy
//! - `psono_client::store` - datastore and secret envelopes

pub mod client;
pub mod error;

pub use psono_client_core as core;
pub use psono_client_session as session;
pub use psono_client_store as store;

pub use client::Client;
pub use error::{ClientError, ErrorKind, Result};

pub use psono_client_session::{ApiKeyScope, ClientConfig, HttpTransport, Operation, Transport};
pub use psono_client_store::{DatastoreContent, Folder, Item, OpenDatastore};
