//! Task lifecycle: claiming, completing, and pruning closed objects.

use super::locks::ObjectLocks;
use crate::config::TrellisConfig;
use super::support::{ensure_prerequisites_satisfied, find_or_not_found, is_within_scope};
use crate::object::{
    domain::{ObjectId, ObjectKind, ObjectStatus, TrellisObject},
    error::{ErrorKind, TrellisError, TrellisResult},
    ports::{ObjectFilter, ObjectRepository, ObjectRepositoryError},
};
use chrono::TimeDelta;
use mockable::Clock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Request payload for claiming a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimTaskRequest {
    task_id: Option<ObjectId>,
    scope: Option<ObjectId>,
    force: bool,
}

impl ClaimTaskRequest {
    /// Claims a specific task.
    #[must_use]
    pub fn for_task(task_id: ObjectId) -> Self {
        Self {
            task_id: Some(task_id),
            ..Self::default()
        }
    }

    /// Claims the most urgent task whose prerequisites are satisfied.
    #[must_use]
    pub fn next_available() -> Self {
        Self::default()
    }

    /// Restricts automatic selection to `scope` and its descendants.
    #[must_use]
    pub fn within(mut self, scope: ObjectId) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Skips the prerequisite gate. The task must still be `open`.
    #[must_use]
    pub const fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// Request payload for completing a claimed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteTaskRequest {
    task_id: ObjectId,
    summary: Option<String>,
    files_changed: BTreeMap<String, String>,
}

impl CompleteTaskRequest {
    /// Creates a completion request.
    #[must_use]
    pub const fn new(task_id: ObjectId) -> Self {
        Self {
            task_id,
            summary: None,
            files_changed: BTreeMap::new(),
        }
    }

    /// Sets the summary recorded as the completion log entry.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Sets files touched by the work, keyed by path with a short note.
    #[must_use]
    pub fn with_files_changed(
        mut self,
        files_changed: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.files_changed = files_changed.into_iter().collect();
        self
    }
}

/// Request payload for pruning terminal objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneClosedRequest {
    older_than: Option<TimeDelta>,
    scope: Option<ObjectId>,
}

impl PruneClosedRequest {
    /// Prunes every eligible terminal object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only prunes objects last updated at least `age` ago.
    #[must_use]
    pub const fn older_than(mut self, age: TimeDelta) -> Self {
        self.older_than = Some(age);
        self
    }

    /// Only prunes `scope` and its descendants.
    #[must_use]
    pub fn within(mut self, scope: ObjectId) -> Self {
        self.scope = Some(scope);
        self
    }
}

/// A deletion that failed during pruning.
#[derive(Debug, Clone)]
pub struct PruneFailure {
    /// Object that could not be deleted.
    pub id: ObjectId,
    /// Repository failure.
    pub error: ObjectRepositoryError,
}

/// Outcome of a prune run.
#[derive(Debug, Clone, Default)]
pub struct PruneSummary {
    /// Deleted objects, in deletion order.
    pub deleted: Vec<ObjectId>,
    /// Deletions that failed; earlier successes are kept.
    pub failed: Vec<PruneFailure>,
    /// Terminal candidates kept because something still references them or
    /// they were reopened during the run.
    pub retained: Vec<ObjectId>,
}

/// Task lifecycle orchestration service.
#[derive(Clone)]
pub struct TaskLifecycleService<R, C>
where
    R: ObjectRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    locks: Arc<ObjectLocks>,
    auto_complete_parents: bool,
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: ObjectRepository,
    C: Clock + Send + Sync,
{
    /// Creates a lifecycle service with its own lock table.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            repository,
            clock,
            locks: Arc::new(ObjectLocks::new()),
            auto_complete_parents: true,
        }
    }

    /// Creates a lifecycle service honouring the store configuration.
    #[must_use]
    pub fn from_config(repository: Arc<R>, clock: Arc<C>, config: &TrellisConfig) -> Self {
        Self::new(repository, clock).with_auto_complete_parents(config.auto_complete_parents)
    }

    /// Shares a lock table with other services on the same store.
    #[must_use]
    pub fn with_locks(mut self, locks: Arc<ObjectLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Enables or disables marking finished ancestors `done` on completion.
    #[must_use]
    pub const fn with_auto_complete_parents(mut self, enabled: bool) -> Self {
        self.auto_complete_parents = enabled;
        self
    }

    /// Claims a task, moving it from `open` to `in-progress`.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::NotFound`] for unknown tasks, an invalid
    /// transition when the object is not an open task, an unmet prerequisite
    /// naming the first blocker, [`TrellisError::NoAvailableTask`] when
    /// automatic selection finds nothing, or repository failures.
    pub async fn claim_task(&self, request: ClaimTaskRequest) -> TrellisResult<TrellisObject> {
        match request.task_id {
            Some(ref task_id) => self.claim_specific(task_id, request.force).await,
            None => {
                self.claim_next_available(request.scope.as_ref(), request.force)
                    .await
            }
        }
    }

    /// Completes a claimed task, moving it from `in-progress` to `done`.
    ///
    /// Ancestor auto-completion runs after the task is saved and is best
    /// effort: a failure there is logged and the completed task is still
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::NotFound`] for unknown tasks, an invalid
    /// transition unless the task is `in-progress`, or repository failures.
    pub async fn complete_task(&self, request: CompleteTaskRequest) -> TrellisResult<TrellisObject> {
        let task = {
            let _guard = self.locks.lock(&request.task_id).await;
            let mut task = find_or_not_found(&*self.repository, &request.task_id).await?;
            task.complete(
                request.summary.as_deref(),
                &request.files_changed,
                &*self.clock,
            )?;
            self.repository.save_object(&task).await?;
            task
        };
        info!(object_id = %task.id(), "completed task");

        let ancestors = if self.auto_complete_parents {
            self.complete_finished_ancestors(&task).await
        } else {
            Ok(())
        };
        if let Err(error) = ancestors {
            warn!(object_id = %task.id(), %error, "failed to complete finished ancestors");
        }
        Ok(task)
    }

    /// Deletes terminal objects that nothing else references.
    ///
    /// Deletion runs in passes: removing closed tasks can free their closed
    /// feature for the next pass. A failed deletion is recorded and the run
    /// continues; the failed object keeps protecting whatever it references.
    ///
    /// References are checked again under the target's lock just before
    /// deletion, so an object created mid-run that points at the target keeps
    /// it. Creation does not take the target's lock, so a reference written
    /// between that check and the delete can still end up dangling.
    ///
    /// # Errors
    ///
    /// Returns repository failures from the initial listing only.
    pub async fn prune_closed(&self, request: PruneClosedRequest) -> TrellisResult<PruneSummary> {
        let objects = self.repository.get_objects(&ObjectFilter::all()).await?;
        let by_id: HashMap<&ObjectId, &TrellisObject> =
            objects.iter().map(|object| (object.id(), object)).collect();
        let cutoff = request.older_than.map(|age| self.clock.utc() - age);

        let mut candidates: BTreeSet<ObjectId> = objects
            .iter()
            .filter(|object| object.status().is_terminal())
            .filter(|object| cutoff.is_none_or(|limit| object.updated() <= limit))
            .filter(|object| {
                request
                    .scope
                    .as_ref()
                    .is_none_or(|scope| is_within_scope(object, scope, &by_id))
            })
            .map(|object| object.id().clone())
            .collect();
        let mut remaining: Vec<&TrellisObject> = objects.iter().collect();
        let mut summary = PruneSummary::default();

        loop {
            let eligible: Vec<ObjectId> = candidates
                .iter()
                .filter(|id| {
                    !remaining
                        .iter()
                        .any(|object| object.id() != *id && object.references(id))
                })
                .cloned()
                .collect();
            if eligible.is_empty() {
                break;
            }
            for id in eligible {
                candidates.remove(&id);
                match self.prune_one(&id).await {
                    Ok(PruneStep::Deleted) => {
                        remaining.retain(|object| object.id() != &id);
                        summary.deleted.push(id);
                    }
                    Ok(PruneStep::Vanished) => {
                        remaining.retain(|object| object.id() != &id);
                    }
                    Ok(PruneStep::Retained) => summary.retained.push(id),
                    Err(error) => {
                        warn!(object_id = %id, %error, "failed to prune object");
                        summary.failed.push(PruneFailure { id, error });
                    }
                }
            }
        }

        summary.retained.extend(candidates);
        info!(
            deleted = summary.deleted.len(),
            failed = summary.failed.len(),
            retained = summary.retained.len(),
            "pruned closed objects"
        );
        Ok(summary)
    }

    async fn claim_specific(&self, task_id: &ObjectId, force: bool) -> TrellisResult<TrellisObject> {
        let _guard = self.locks.lock(task_id).await;
        let mut task = find_or_not_found(&*self.repository, task_id).await?;
        task.ensure_claimable()?;
        if !force {
            ensure_prerequisites_satisfied(&*self.repository, &task).await?;
        }
        task.claim(&*self.clock)?;
        self.repository.save_object(&task).await?;
        info!(object_id = %task_id, forced = force, "claimed task");
        Ok(task)
    }

    async fn claim_next_available(
        &self,
        scope: Option<&ObjectId>,
        force: bool,
    ) -> TrellisResult<TrellisObject> {
        let objects = self
            .repository
            .get_objects(
                &ObjectFilter::all()
                    .with_kind(ObjectKind::Task)
                    .with_status(ObjectStatus::Open),
            )
            .await?;
        let everything = if scope.is_some() || !force {
            self.repository.get_objects(&ObjectFilter::all()).await?
        } else {
            Vec::new()
        };
        let by_id: HashMap<&ObjectId, &TrellisObject> =
            everything.iter().map(|object| (object.id(), object)).collect();

        let mut candidates: Vec<&TrellisObject> = objects
            .iter()
            .filter(|task| scope.is_none_or(|scope_id| is_within_scope(task, scope_id, &by_id)))
            .filter(|task| {
                force
                    || task.prerequisites().iter().all(|prerequisite| {
                        by_id
                            .get(prerequisite)
                            .is_some_and(|found| found.status().is_terminal())
                    })
            })
            .collect();
        candidates.sort_by(|left, right| {
            right
                .priority()
                .cmp(&left.priority())
                .then_with(|| left.created().cmp(&right.created()))
                .then_with(|| left.id().cmp(right.id()))
        });

        for candidate in candidates {
            match self.claim_specific(candidate.id(), force).await {
                Ok(task) => return Ok(task),
                Err(err) if is_lost_race(&err) => {
                    debug!(object_id = %candidate.id(), %err, "candidate no longer claimable");
                }
                Err(err) => return Err(err),
            }
        }
        Err(TrellisError::NoAvailableTask)
    }

    async fn prune_one(&self, id: &ObjectId) -> Result<PruneStep, ObjectRepositoryError> {
        let _guard = self.locks.lock(id).await;
        match self.repository.get_object_by_id(id).await? {
            None => Ok(PruneStep::Vanished),
            Some(current) if !current.status().is_terminal() => Ok(PruneStep::Retained),
            Some(_) => {
                let objects = self.repository.get_objects(&ObjectFilter::all()).await?;
                if objects
                    .iter()
                    .any(|object| object.id() != id && object.references(id))
                {
                    debug!(object_id = %id, "object gained a reference during pruning");
                    return Ok(PruneStep::Retained);
                }
                self.repository.delete_object(id).await?;
                debug!(object_id = %id, "pruned object");
                Ok(PruneStep::Deleted)
            }
        }
    }

    async fn complete_finished_ancestors(&self, task: &TrellisObject) -> TrellisResult<()> {
        let mut next = task.parent().cloned();
        while let Some(parent_id) = next {
            let _guard = self.locks.lock(&parent_id).await;
            let Some(mut parent) = self.repository.get_object_by_id(&parent_id).await? else {
                break;
            };
            let children = self
                .repository
                .get_objects(&ObjectFilter::all().with_parent(parent_id.clone()))
                .await?;
            let finished = !children.is_empty()
                && children.iter().all(|child| child.status().is_terminal());
            if !finished || !parent.complete_from_children(&*self.clock) {
                break;
            }
            self.repository.save_object(&parent).await?;
            info!(object_id = %parent_id, "completed parent after its last child finished");
            next = parent.parent().cloned();
        }
        Ok(())
    }
}

enum PruneStep {
    Deleted,
    Vanished,
    Retained,
}

fn is_lost_race(err: &TrellisError) -> bool {
    matches!(
        err.kind(),
        ErrorKind::NotFound | ErrorKind::InvalidTransition | ErrorKind::UnmetPrerequisite
    )
}
