//! # Psono Client Session
//!
//! Establishes an authenticated session with a Psono server using an API key
//! and carries authenticated calls over it.
//!
//! ## Flow
//!
//! 1. [`Handshake`] signs a login assertion with the API key, sends it and
//!    opens the server's boxed login info with a fresh ephemeral key pair.
//! 2. The server's signature over the decrypted login info is verified
//!    against the configured server key.
//! 3. The resulting [`SessionContext`] (token + session secret key) drives the
//!    [`SessionClient`] codec for every later call.
//!
//! A successful login says nothing about what the key may do; check
//! [`ApiKeyScope`] before each operation.
//!
//! ## Transport
//!
//! [`Transport`] is the request/response seam. [`HttpTransport`] talks to a
//! real server; [`transport::memory::ScriptedTransport`] answers from a queue
//! in tests.

pub mod codec;
pub mod config;
pub mod error;
pub mod handshake;
pub mod http;
pub mod messages;
pub mod policy;
pub mod transport;

pub use codec::{SessionClient, SessionContext};
pub use config::{ClientConfig, DEFAULT_TIMEOUT};
pub use error::{Result, SessionError};
pub use handshake::{
    login, EstablishedSession, FailureReason, Handshake, HandshakeState, LoginAssertion,
    SignedAssertion,
};
pub use http::HttpTransport;
pub use messages::paths;
pub use policy::{ApiKeyScope, Operation};
pub use transport::{ApiRequest, Method, Transport};
