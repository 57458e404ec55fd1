//! Trellis object aggregate root and its status and priority vocabulary.

use super::{
    ObjectDomainError, ObjectId, ObjectKind, ParseObjectPriorityError, ParseObjectStatusError,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Format-version tag written with every object.
pub const SCHEMA_VERSION: &str = "1.0";

/// Lifecycle status of a trellis object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectStatus {
    /// Not yet ready to be worked.
    Draft,
    /// Ready to be claimed.
    Open,
    /// Actively being worked.
    InProgress,
    /// Finished.
    Done,
    /// Closed without completion.
    Closed,
}

impl ObjectStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::Done => "done",
            Self::Closed => "closed",
        }
    }

    /// Returns whether the status satisfies dependents and permits pruning.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Closed)
    }

    /// Returns whether a general status update to `target` is allowed.
    ///
    /// Claim and completion have their own stricter rules on
    /// [`TrellisObject`].
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Draft, Self::Open | Self::Closed)
                | (Self::Open, Self::Draft | Self::InProgress | Self::Closed)
                | (Self::InProgress, Self::Open | Self::Done | Self::Closed)
        )
    }
}

impl fmt::Display for ObjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ObjectStatus {
    type Error = ParseObjectStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "draft" => Ok(Self::Draft),
            "open" => Ok(Self::Open),
            "in-progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseObjectStatusError(value.to_owned())),
        }
    }
}

/// Advisory priority. Ordering follows urgency: `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ObjectPriority {
    /// Can wait.
    Low,
    /// Normal urgency.
    #[default]
    Medium,
    /// Pick first.
    High,
}

impl ObjectPriority {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for ObjectPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ObjectPriority {
    type Error = ParseObjectPriorityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParseObjectPriorityError(value.to_owned())),
        }
    }
}

/// Field values for a not-yet-persisted object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDraft {
    id: ObjectId,
    title: String,
    status: ObjectStatus,
    priority: ObjectPriority,
    parent: Option<ObjectId>,
    prerequisites: Vec<ObjectId>,
    body: String,
}

impl ObjectDraft {
    /// Creates a draft with required fields; status defaults to `open`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectDomainError::EmptyTitle`] when the title is blank.
    pub fn new(id: ObjectId, title: impl Into<String>) -> Result<Self, ObjectDomainError> {
        let raw = title.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ObjectDomainError::EmptyTitle);
        }
        Ok(Self {
            id,
            title: trimmed.to_owned(),
            status: ObjectStatus::Open,
            priority: ObjectPriority::default(),
            parent: None,
            prerequisites: Vec::new(),
            body: String::new(),
        })
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

    /// Sets the parent reference.
    #[must_use]
    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the prerequisites, dropping duplicates while keeping order.
    #[must_use]
    pub fn with_prerequisites(mut self, prerequisites: impl IntoIterator<Item = ObjectId>) -> Self {
        self.prerequisites = dedup_ordered(prerequisites);
        self
    }

    /// Sets the markdown body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

/// Trellis object aggregate root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrellisObject {
    id: ObjectId,
    title: String,
    status: ObjectStatus,
    priority: ObjectPriority,
    parent: Option<ObjectId>,
    prerequisites: Vec<ObjectId>,
    children_ids: Vec<ObjectId>,
    affected_files: BTreeMap<String, String>,
    log: Vec<String>,
    schema: String,
    body: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedObjectData {
    /// Persisted identifier.
    pub id: ObjectId,
    /// Persisted kind; must agree with the identifier prefix.
    pub kind: ObjectKind,
    /// Persisted title.
    pub title: String,
    /// Persisted status.
    pub status: ObjectStatus,
    /// Persisted priority.
    pub priority: ObjectPriority,
    /// Persisted parent reference.
    pub parent: Option<ObjectId>,
    /// Persisted prerequisites in declaration order.
    pub prerequisites: Vec<ObjectId>,
    /// Persisted affected-file notes.
    pub affected_files: BTreeMap<String, String>,
    /// Persisted activity log.
    pub log: Vec<String>,
    /// Persisted format version.
    pub schema: String,
    /// Persisted markdown body.
    pub body: String,
    /// Persisted creation timestamp.
    pub created: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated: DateTime<Utc>,
}

impl TrellisObject {
    /// Creates a new object from a draft, stamping both timestamps.
    #[must_use]
    pub fn new(draft: ObjectDraft, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: draft.id,
            title: draft.title,
            status: draft.status,
            priority: draft.priority,
            parent: draft.parent,
            prerequisites: draft.prerequisites,
            children_ids: Vec::new(),
            affected_files: BTreeMap::new(),
            log: Vec::new(),
            schema: SCHEMA_VERSION.to_owned(),
            body: draft.body,
            created: timestamp,
            updated: timestamp,
        }
    }

    /// Reconstructs an object from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectDomainError::KindMismatch`] when the stored kind
    /// disagrees with the identifier prefix.
    pub fn from_persisted(data: PersistedObjectData) -> Result<Self, ObjectDomainError> {
        let expected = data.id.kind();
        if data.kind != expected {
            return Err(ObjectDomainError::KindMismatch {
                id: data.id,
                declared: data.kind,
                expected,
            });
        }
        Ok(Self {
            id: data.id,
            title: data.title,
            status: data.status,
            priority: data.priority,
            parent: data.parent,
            prerequisites: data.prerequisites,
            children_ids: Vec::new(),
            affected_files: data.affected_files,
            log: data.log,
            schema: data.schema,
            body: data.body,
            created: data.created,
            updated: data.updated,
        })
    }

    /// Returns the object identifier.
    #[must_use]
    pub const fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Returns the object kind.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.id.kind()
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> ObjectStatus {
        self.status
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> ObjectPriority {
        self.priority
    }

    /// Returns the parent reference, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&ObjectId> {
        self.parent.as_ref()
    }

    /// Returns prerequisites in declaration order.
    #[must_use]
    pub fn prerequisites(&self) -> &[ObjectId] {
        &self.prerequisites
    }

    /// Returns the derived child identifiers.
    #[must_use]
    pub fn children_ids(&self) -> &[ObjectId] {
        &self.children_ids
    }

    /// Returns affected-file notes keyed by path.
    #[must_use]
    pub const fn affected_files(&self) -> &BTreeMap<String, String> {
        &self.affected_files
    }

    /// Returns the activity log, oldest first.
    #[must_use]
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Returns the format-version tag.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Returns the markdown body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    /// Returns whether this object names `id` as parent or prerequisite.
    #[must_use]
    pub fn references(&self, id: &ObjectId) -> bool {
        self.parent.as_ref() == Some(id) || self.prerequisites.contains(id)
    }

    /// Replaces the derived child list. Used by repository adapters on read.
    #[must_use]
    pub fn with_children_ids(mut self, mut children_ids: Vec<ObjectId>) -> Self {
        children_ids.sort();
        children_ids.dedup();
        self.children_ids = children_ids;
        self
    }

    /// Checks that the object is an open task, without mutating it.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectDomainError::NotATask`] for non-task objects and
    /// [`ObjectDomainError::InvalidStatusTransition`] when the task is not
    /// `open`.
    pub fn ensure_claimable(&self) -> Result<(), ObjectDomainError> {
        self.ensure_task()?;
        if self.status != ObjectStatus::Open {
            return Err(self.invalid_transition(ObjectStatus::InProgress));
        }
        Ok(())
    }

    /// Claims an open task: `open -> in-progress`, with a log entry.
    ///
    /// Prerequisite gating happens in the lifecycle service, which has
    /// repository access.
    ///
    /// # Errors
    ///
    /// See [`Self::ensure_claimable`].
    pub fn claim(&mut self, clock: &impl Clock) -> Result<(), ObjectDomainError> {
        self.ensure_claimable()?;
        self.status = ObjectStatus::InProgress;
        self.log.push("Task claimed; status set to in-progress".to_owned());
        self.touch(clock);
        Ok(())
    }

    /// Completes an in-progress task: `in-progress -> done`.
    ///
    /// The summary becomes the completion log entry and `files_changed` is
    /// merged into the affected files.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectDomainError::NotATask`] for non-task objects and
    /// [`ObjectDomainError::InvalidStatusTransition`] unless the task is
    /// `in-progress`.
    pub fn complete(
        &mut self,
        summary: Option<&str>,
        files_changed: &BTreeMap<String, String>,
        clock: &impl Clock,
    ) -> Result<(), ObjectDomainError> {
        self.ensure_task()?;
        if self.status != ObjectStatus::InProgress {
            return Err(self.invalid_transition(ObjectStatus::Done));
        }
        self.status = ObjectStatus::Done;
        let entry = summary
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or("Task completed");
        self.log.push(entry.to_owned());
        self.merge_affected_files(files_changed);
        self.touch(clock);
        Ok(())
    }

    /// Marks a container object `done` because all of its children are
    /// terminal. Returns `false` when the object was already terminal.
    pub fn complete_from_children(&mut self, clock: &impl Clock) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = ObjectStatus::Done;
        self.log
            .push("All child objects completed; status set to done".to_owned());
        self.touch(clock);
        true
    }

    /// Changes the status through the general update path.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectDomainError::InvalidStatusTransition`] when the
    /// transition is not allowed and `force` is not set.
    pub fn change_status(
        &mut self,
        target: ObjectStatus,
        force: bool,
        clock: &impl Clock,
    ) -> Result<(), ObjectDomainError> {
        if self.status == target {
            return Ok(());
        }
        if !force && !self.status.can_transition_to(target) {
            return Err(self.invalid_transition(target));
        }
        self.status = target;
        self.touch(clock);
        Ok(())
    }

    /// Replaces the title.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectDomainError::EmptyTitle`] when the title is blank.
    pub fn rename(
        &mut self,
        title: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), ObjectDomainError> {
        let raw = title.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ObjectDomainError::EmptyTitle);
        }
        trimmed.clone_into(&mut self.title);
        self.touch(clock);
        Ok(())
    }

    /// Replaces the priority.
    pub fn set_priority(&mut self, priority: ObjectPriority, clock: &impl Clock) {
        self.priority = priority;
        self.touch(clock);
    }

    /// Replaces the prerequisites, dropping duplicates while keeping order.
    pub fn set_prerequisites(
        &mut self,
        prerequisites: impl IntoIterator<Item = ObjectId>,
        clock: &impl Clock,
    ) {
        self.prerequisites = dedup_ordered(prerequisites);
        self.touch(clock);
    }

    /// Replaces the body and bumps `updated`.
    pub fn set_body(&mut self, body: impl Into<String>, clock: &impl Clock) {
        self.body = body.into();
        self.touch(clock);
    }

    /// Replaces the body. Every other field, `updated` included, is left
    /// untouched.
    pub fn rewrite_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    /// Appends an opaque entry to the activity log and returns the new length.
    pub fn append_log(&mut self, entry: impl Into<String>, clock: &impl Clock) -> usize {
        self.log.push(entry.into());
        self.touch(clock);
        self.log.len()
    }

    /// Merges affected-file notes; notes for known paths are appended after
    /// `"; "`.
    pub fn add_affected_files(&mut self, files: &BTreeMap<String, String>, clock: &impl Clock) {
        self.merge_affected_files(files);
        self.touch(clock);
    }

    /// Updates the `updated` timestamp to the current clock time.
    pub fn touch(&mut self, clock: &impl Clock) {
        self.updated = clock.utc();
    }

    fn merge_affected_files(&mut self, files: &BTreeMap<String, String>) {
        for (path, note) in files {
            self.affected_files
                .entry(path.clone())
                .and_modify(|existing| {
                    if existing.is_empty() {
                        existing.clone_from(note);
                    } else if !note.is_empty() {
                        existing.push_str("; ");
                        existing.push_str(note);
                    }
                })
                .or_insert_with(|| note.clone());
        }
    }

    fn ensure_task(&self) -> Result<(), ObjectDomainError> {
        let kind = self.kind();
        if kind != ObjectKind::Task {
            return Err(ObjectDomainError::NotATask {
                id: self.id.clone(),
                kind,
            });
        }
        Ok(())
    }

    fn invalid_transition(&self, to: ObjectStatus) -> ObjectDomainError {
        ObjectDomainError::InvalidStatusTransition {
            id: self.id.clone(),
            from: self.status,
            to,
        }
    }
}

fn dedup_ordered(ids: impl IntoIterator<Item = ObjectId>) -> Vec<ObjectId> {
    let mut unique: Vec<ObjectId> = Vec::new();
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}
