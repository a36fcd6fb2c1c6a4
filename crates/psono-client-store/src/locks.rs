//! Per-datastore write serialization.
//!
//! The server applies datastore writes last-write-wins, so two writers to the
//! same datastore in one process would silently drop each other's changes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per datastore id.
#[derive(Debug, Default)]
pub struct DatastoreLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl DatastoreLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to `datastore_id`.
    pub async fn acquire(&self, datastore_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(datastore_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}
