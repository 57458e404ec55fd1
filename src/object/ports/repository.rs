//! Repository port for trellis object persistence and lookup.

use crate::object::domain::{ObjectId, ObjectKind, ObjectPriority, ObjectStatus, TrellisObject};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for object repository operations.
pub type ObjectRepositoryResult<T> = Result<T, ObjectRepositoryError>;

/// Object persistence contract.
///
/// Implementations own persisted state exclusively. Objects handed in and
/// out are value snapshots; `children_ids` is derived on read from the
/// `parent` fields of other objects.
#[async_trait]
pub trait ObjectRepository: Send + Sync {
    /// Finds an object by identifier.
    ///
    /// Returns `None` when the object does not exist.
    async fn get_object_by_id(&self, id: &ObjectId) -> ObjectRepositoryResult<Option<TrellisObject>>;

    /// Returns all objects matching `filter`, sorted by identifier.
    async fn get_objects(&self, filter: &ObjectFilter) -> ObjectRepositoryResult<Vec<TrellisObject>>;

    /// Inserts or replaces the whole object.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectRepositoryError::Persistence`] when the write fails.
    async fn save_object(&self, object: &TrellisObject) -> ObjectRepositoryResult<()>;

    /// Removes an object.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectRepositoryError::NotFound`] when the object does not
    /// exist.
    async fn delete_object(&self, id: &ObjectId) -> ObjectRepositoryResult<()>;
}

/// Errors returned by object repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ObjectRepositoryError {
    /// The object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// A stored object could not be decoded.
    #[error("corrupt object at {location}: {reason}")]
    Corrupt {
        /// Storage location of the unreadable object.
        location: String,
        /// Decoder diagnostic.
        reason: String,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ObjectRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Creates a corruption error for the given location.
    pub fn corrupt(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::Corrupt {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

/// Criteria for bulk object reads.
///
/// Unless a status is requested explicitly or `include_closed` is set,
/// terminal objects (`done`, `closed`) are excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectFilter {
    /// Restrict to one kind.
    pub kind: Option<ObjectKind>,
    /// Restrict to one status.
    pub status: Option<ObjectStatus>,
    /// Restrict to one priority.
    pub priority: Option<ObjectPriority>,
    /// Restrict to direct children of this object.
    pub parent: Option<ObjectId>,
    /// Include terminal objects when no status is requested.
    pub include_closed: bool,
}

impl ObjectFilter {
    /// Matches every object.
    #[must_use]
    pub fn all() -> Self {
        Self {
            include_closed: true,
            ..Self::default()
        }
    }

    /// Restricts to one kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: ObjectKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restricts to one status.
    #[must_use]
    pub const fn with_status(mut self, status: ObjectStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts to one priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: ObjectPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Restricts to direct children of `parent`.
    #[must_use]
    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Includes terminal objects.
    #[must_use]
    pub const fn including_closed(mut self) -> Self {
        self.include_closed = true;
        self
    }

    /// Returns whether `object` satisfies every criterion.
    #[must_use]
    pub fn matches(&self, object: &TrellisObject) -> bool {
        let status_ok = match self.status {
            Some(status) => object.status() == status,
            None => self.include_closed || !object.status().is_terminal(),
        };
        status_ok
            && self.kind.is_none_or(|kind| object.kind() == kind)
            && self.priority.is_none_or(|priority| object.priority() == priority)
            && self
                .parent
                .as_ref()
                .is_none_or(|parent| object.parent() == Some(parent))
    }
}
