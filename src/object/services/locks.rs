//! Per-object serialization for load-compute-save operations.

use crate::object::domain::ObjectId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lock table keyed by object identifier.
///
/// Holding an object's guard across its load and save turns the pair into
/// one unit with respect to every other holder of the same table. Work on
/// different objects never contends. Services that share a store should
/// share one table.
#[derive(Debug, Default)]
pub struct ObjectLocks {
    table: Mutex<HashMap<ObjectId, Arc<AsyncMutex<()>>>>,
}

impl ObjectLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `id`.
    pub async fn lock(&self, id: &ObjectId) -> OwnedMutexGuard<()> {
        let entry = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody is holding or waiting on.
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(table.entry(id.clone()).or_default())
        };
        entry.lock_owned().await
    }
}
