//! Object creation, update, lookup, and deletion.

use super::locks::ObjectLocks;
use super::support::{ensure_prerequisites_satisfied, find_or_not_found};
use crate::object::{
    domain::{ObjectDraft, ObjectId, ObjectKind, ObjectPriority, ObjectStatus, TrellisObject},
    error::TrellisResult,
    ports::{ObjectFilter, ObjectRepository},
    validation::{validate_no_dependents, validate_object_creation},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::info;

/// Request payload for creating an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateObjectRequest {
    kind: ObjectKind,
    title: String,
    parent: Option<ObjectId>,
    status: ObjectStatus,
    priority: ObjectPriority,
    prerequisites: Vec<ObjectId>,
    body: String,
}

impl CreateObjectRequest {
    /// Creates an `open`, `medium` priority request without a parent.
    #[must_use]
    pub fn new(kind: ObjectKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            parent: None,
            status: ObjectStatus::Open,
            priority: ObjectPriority::default(),
            prerequisites: Vec::new(),
            body: String::new(),
        }
    }

    /// Sets the parent reference.
    #[must_use]
    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the initial status.
    #[must_use]
    pub const fn with_status(mut self, status: ObjectStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: ObjectPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the prerequisites.
    #[must_use]
    pub fn with_prerequisites(mut self, prerequisites: impl IntoIterator<Item = ObjectId>) -> Self {
        self.prerequisites = prerequisites.into_iter().collect();
        self
    }

    /// Sets the markdown body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    fn draft(&self, id: ObjectId) -> TrellisResult<ObjectDraft> {
        let mut draft = ObjectDraft::new(id, self.title.as_str())?
            .with_status(self.status)
            .with_priority(self.priority)
            .with_prerequisites(self.prerequisites.iter().cloned())
            .with_body(self.body.as_str());
        if let Some(parent) = &self.parent {
            draft = draft.with_parent(parent.clone());
        }
        Ok(draft)
    }
}

/// Request payload for updating an object. Unset fields are left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateObjectRequest {
    id: ObjectId,
    title: Option<String>,
    priority: Option<ObjectPriority>,
    status: Option<ObjectStatus>,
    prerequisites: Option<Vec<ObjectId>>,
    body: Option<String>,
    force: bool,
}

impl UpdateObjectRequest {
    /// Creates an update that changes nothing but the `updated` timestamp.
    #[must_use]
    pub const fn new(id: ObjectId) -> Self {
        Self {
            id,
            title: None,
            priority: None,
            status: None,
            prerequisites: None,
            body: None,
            force: false,
        }
    }

    /// Replaces the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replaces the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: ObjectPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Requests a status change.
    #[must_use]
    pub const fn with_status(mut self, status: ObjectStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Replaces the prerequisites.
    #[must_use]
    pub fn with_prerequisites(mut self, prerequisites: impl IntoIterator<Item = ObjectId>) -> Self {
        self.prerequisites = Some(prerequisites.into_iter().collect());
        self
    }

    /// Replaces the markdown body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Bypasses the status transition table and the prerequisite gate.
    #[must_use]
    pub const fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// Object CRUD service.
#[derive(Clone)]
pub struct ObjectService<R, C>
where
    R: ObjectRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    locks: Arc<ObjectLocks>,
}

impl<R, C> ObjectService<R, C>
where
    R: ObjectRepository,
    C: Clock + Send + Sync,
{
    /// Creates an object service with its own lock table.
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

    /// Creates an object with an identifier derived from its title.
    ///
    /// When the derived identifier is taken, `-2`, `-3`, and so on are
    /// appended until a free one is found.
    ///
    /// # Errors
    ///
    /// Returns an invalid-input error for a blank title, a validation
    /// failure when the parent is missing or of the wrong kind, or
    /// repository failures.
    pub async fn create_object(&self, request: CreateObjectRequest) -> TrellisResult<TrellisObject> {
        let base = ObjectId::from_title(request.kind, &request.title);
        let mut suffix = 1;
        loop {
            let id = if suffix == 1 {
                base.clone()
            } else {
                base.with_suffix(suffix)
            };
            let _guard = self.locks.lock(&id).await;
            if self.repository.get_object_by_id(&id).await?.is_some() {
                suffix += 1;
                continue;
            }
            let object = TrellisObject::new(request.draft(id)?, &*self.clock);
            validate_object_creation(&object, &*self.repository).await?;
            self.repository.save_object(&object).await?;
            info!(object_id = %object.id(), kind = %object.kind(), "created object");
            return Ok(object);
        }
    }

    /// Applies an update and re-runs creation checks before saving.
    ///
    /// Moving a task to `in-progress` through this path applies the same
    /// prerequisite gate as claiming unless the request is forced.
    ///
    /// # Errors
    ///
    /// Returns [`crate::object::error::TrellisError::NotFound`], an invalid
    /// transition, an unmet prerequisite, a validation failure, or
    /// repository failures. Nothing is written on failure.
    pub async fn update_object(&self, request: UpdateObjectRequest) -> TrellisResult<TrellisObject> {
        let _guard = self.locks.lock(&request.id).await;
        let mut object = find_or_not_found(&*self.repository, &request.id).await?;
        let clock = &*self.clock;

        if let Some(title) = request.title {
            object.rename(title, clock)?;
        }
        if let Some(priority) = request.priority {
            object.set_priority(priority, clock);
        }
        if let Some(prerequisites) = request.prerequisites {
            object.set_prerequisites(prerequisites, clock);
        }
        if let Some(body) = request.body {
            object.set_body(body, clock);
        }
        if let Some(status) = request.status {
            let starts_work = status == ObjectStatus::InProgress
                && object.kind() == ObjectKind::Task
                && object.status() != ObjectStatus::InProgress;
            if starts_work && !request.force {
                ensure_prerequisites_satisfied(&*self.repository, &object).await?;
            }
            object.change_status(status, request.force, clock)?;
        }
        object.touch(clock);

        validate_object_creation(&object, &*self.repository).await?;
        self.repository.save_object(&object).await?;
        info!(object_id = %request.id, "updated object");
        Ok(object)
    }

    /// Loads one object.
    ///
    /// # Errors
    ///
    /// Returns [`crate::object::error::TrellisError::NotFound`] or
    /// repository failures.
    pub async fn get_object(&self, id: &ObjectId) -> TrellisResult<TrellisObject> {
        find_or_not_found(&*self.repository, id).await
    }

    /// Lists objects matching `filter`, sorted by identifier.
    ///
    /// # Errors
    ///
    /// Returns repository failures.
    pub async fn list_objects(&self, filter: &ObjectFilter) -> TrellisResult<Vec<TrellisObject>> {
        Ok(self.repository.get_objects(filter).await?)
    }

    /// Deletes an object.
    ///
    /// Unless `force` is set, deletion is refused while another object names
    /// this one as parent or prerequisite.
    ///
    /// # Errors
    ///
    /// Returns [`crate::object::error::TrellisError::NotFound`], a
    /// `HAS_DEPENDENTS` validation failure, or repository failures.
    pub async fn delete_object(&self, id: &ObjectId, force: bool) -> TrellisResult<()> {
        let _guard = self.locks.lock(id).await;
        find_or_not_found(&*self.repository, id).await?;
        if !force {
            let objects = self.repository.get_objects(&ObjectFilter::all()).await?;
            validate_no_dependents(id, &objects)?;
        }
        self.repository.delete_object(id).await?;
        info!(object_id = %id, forced = force, "deleted object");
        Ok(())
    }
}
