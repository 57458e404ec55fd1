//! Activity log and affected-file bookkeeping.

use super::locks::ObjectLocks;
use super::support::find_or_not_found;
use crate::object::{
    domain::{ObjectId, TrellisObject},
    error::TrellisResult,
    ports::ObjectRepository,
};
use mockable::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Appends activity records to objects.
#[derive(Clone)]
pub struct ActivityLogService<R, C>
where
    R: ObjectRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    locks: Arc<ObjectLocks>,
}

impl<R, C> ActivityLogService<R, C>
where
    R: ObjectRepository,
    C: Clock + Send + Sync,
{
    /// Creates an activity service with its own lock table.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            repository,
            clock,
            locks: Arc::new(ObjectLocks::new()),
        }
    }

    /// Shares a lock table with other services on the same store.
    #[must_use]
    pub fn with_locks(mut self, locks: Arc<ObjectLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Appends `entry` to the object's log and returns the new log length.
    ///
    /// # Errors
    ///
    /// Returns [`crate::object::error::TrellisError::NotFound`] or
    /// repository failures.
    pub async fn append_log(&self, id: &ObjectId, entry: impl Into<String>) -> TrellisResult<usize> {
        let _guard = self.locks.lock(id).await;
        let mut object = find_or_not_found(&*self.repository, id).await?;
        let length = object.append_log(entry, &*self.clock);
        self.repository.save_object(&object).await?;
        debug!(object_id = %id, length, "appended log entry");
        Ok(length)
    }

    /// Records files touched by work on the object.
    ///
    /// Notes for paths already recorded are joined to the existing note
    /// with `"; "`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::object::error::TrellisError::NotFound`] or
    /// repository failures.
    pub async fn append_modified_files(
        &self,
        id: &ObjectId,
        files: &BTreeMap<String, String>,
    ) -> TrellisResult<TrellisObject> {
        let _guard = self.locks.lock(id).await;
        let mut object = find_or_not_found(&*self.repository, id).await?;
        object.add_affected_files(files, &*self.clock);
        self.repository.save_object(&object).await?;
        debug!(object_id = %id, files = files.len(), "recorded modified files");
        Ok(object)
    }
}
