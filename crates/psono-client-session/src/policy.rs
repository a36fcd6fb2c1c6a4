//! API-key scope checks.
//!
//! A successful handshake says nothing about what the key may do. The server
//! reports the key's scope in the login info; callers check it before every
//! operation and abort cleanly when it is not granted.

use std::fmt;

use crate::error::{Result, SessionError};

/// An operation gated by the API key's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// List datastores or fetch one.
    ReadDatastore,
    /// Write a datastore back.
    WriteDatastore,
    /// Create a secret under a datastore.
    CreateSecret,
    /// Read a single secret by id.
    ReadSecret,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ReadDatastore => "read datastore",
            Operation::WriteDatastore => "write datastore",
            Operation::CreateSecret => "create secret",
            Operation::ReadSecret => "read secret",
        };
        f.write_str(name)
    }
}

/// The scope granted to an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiKeyScope {
    pub read: bool,
    pub write: bool,
    /// Restricted keys may only read the specific secrets bound to them.
    pub restrict_to_secrets: bool,
}

impl ApiKeyScope {
    /// Whether the scope allows `operation`.
    pub fn allows(&self, operation: Operation) -> bool {
        self.check(operation).is_ok()
    }

    /// Check `operation` against the scope.
    ///
    /// Restriction wins over the read/write flags for every datastore
    /// operation.
    pub fn check(&self, operation: Operation) -> Result<()> {
        let denied = |reason| {
            Err(SessionError::PolicyDenied {
                operation,
                reason,
            })
        };

        match operation {
            Operation::ReadDatastore | Operation::WriteDatastore | Operation::CreateSecret
                if self.restrict_to_secrets =>
            {
                denied("api key is restricted to specific secrets")
            }
            Operation::ReadDatastore | Operation::ReadSecret if !self.read => {
                denied("api key does not allow read")
            }
            Operation::WriteDatastore | Operation::CreateSecret if !self.write => {
                denied("api key does not allow write")
            }
            _ => Ok(()),
        }
    }

    /// Whether the login info carries the user's key material.
    pub fn can_unlock_datastores(&self) -> bool {
        !self.restrict_to_secrets
    }
}
