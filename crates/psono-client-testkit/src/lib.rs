//! # Psono Client Testkit
//!
//! Testing utilities for the Psono API-key client.
//!
//! - **FakeServer**: an in-process server implementing the client's
//!   `Transport`, with knobs for forged signatures, narrowed scopes and
//!   expired sessions
//! - **Fixtures**: [`TestAccount`] key material and matching configurations
//! - **Generators**: Proptest strategies for keys, names and payloads
//!
//! ## Usage
//!
//! ```rust
//! use psono_client_testkit::{FakeServer, TestAccount};
//!
//! let account = TestAccount::new();
//! let server = FakeServer::new(account.clone());
//! let datastore_id = server.add_datastore("password");
//! let config = account.config();
//! # let _ = (datastore_id, config);
//! ```

pub mod fixtures;
pub mod generators;
pub mod server;

pub use fixtures::{application_password, wrap, TestAccount, FAKE_SERVER_URL};
pub use server::{FakeServer, StoredDatastore, StoredSecret};

#[cfg(test)]
mod tests {
    use super::*;
    use psono_client_session::{login, ApiRequest, SessionError, Transport};
    use std::sync::Arc;

    #[tokio::test]
    async fn fake_server_accepts_a_real_login() {
        let account = TestAccount::with_seed(1);
        let server = FakeServer::new(account.clone());

        let session = login(&account.config(), &server).await.unwrap();
        assert!(session.login_info.user.is_some());
        assert_eq!(server.active_sessions(), 1);
    }

    #[tokio::test]
    async fn fake_server_rejects_another_api_key() {
        let server = FakeServer::new(TestAccount::with_seed(1));
        let err = login(&TestAccount::with_seed(2).config(), &server)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::HttpStatus { status: 401, .. }));
    }

    #[tokio::test]
    async fn unauthenticated_call_is_rejected() {
        let server = Arc::new(FakeServer::new(TestAccount::new()));
        let err = server
            .request(ApiRequest::get("/datastore/"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::HttpStatus { status: 401, .. }));
    }

    #[test]
    fn env_vars_load_into_matching_config() {
        let account = TestAccount::with_seed(5);
        let vars = account.env_vars();
        let config = psono_client_session::ClientConfig::from_lookup(|name| {
            vars.iter().find(|(k, _)| *k == name).map(|(_, v)| v.clone())
        })
        .unwrap();

        assert_eq!(config.api_key_id, account.api_key_id);
        assert_eq!(
            config.api_key_signing_key.verify_key(),
            account.api_key_signing_key.verify_key()
        );
        assert_eq!(config.server_public_key, Some(account.server_public_key));
    }

    #[test]
    fn seeded_content_is_readable() {
        let server = FakeServer::new(TestAccount::new());
        let id = server.add_datastore_with_content("password", &serde_json::json!({ "folders": [] }));
        assert_eq!(
            server.datastore_content(&id),
            Some(serde_json::json!({ "folders": [] }))
        );
        assert!(server.datastore_content(&server.add_datastore("user")).is_none());
    }
}
