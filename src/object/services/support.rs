//! Helpers shared by the object services.

use crate::object::{
    domain::{ObjectDomainError, ObjectId, ObjectStatus, TrellisObject},
    error::{TrellisError, TrellisResult},
    ports::ObjectRepository,
};
use std::collections::HashMap;

/// Loads an object or reports it as not found.
pub(super) async fn find_or_not_found<R>(repository: &R, id: &ObjectId) -> TrellisResult<TrellisObject>
where
    R: ObjectRepository + ?Sized,
{
    repository
        .get_object_by_id(id)
        .await?
        .ok_or_else(|| TrellisError::NotFound(id.clone()))
}

/// Checks prerequisites left to right and reports the first one that is
/// missing or not yet terminal.
pub(super) async fn ensure_prerequisites_satisfied<R>(
    repository: &R,
    task: &TrellisObject,
) -> TrellisResult<()>
where
    R: ObjectRepository + ?Sized,
{
    for prerequisite in task.prerequisites() {
        let status = repository
            .get_object_by_id(prerequisite)
            .await?
            .map(|found| found.status());
        if !status.is_some_and(ObjectStatus::is_terminal) {
            return Err(ObjectDomainError::UnmetPrerequisite {
                task: task.id().clone(),
                prerequisite: prerequisite.clone(),
                status,
            }
            .into());
        }
    }
    Ok(())
}

/// Returns whether `object` is `scope` or descends from it via `parent`.
pub(super) fn is_within_scope(
    object: &TrellisObject,
    scope: &ObjectId,
    by_id: &HashMap<&ObjectId, &TrellisObject>,
) -> bool {
    let mut current = Some(object);
    // Bounded walk: a corrupt store could hold a parent loop.
    for _ in 0..=by_id.len() {
        let Some(node) = current else {
            return false;
        };
        if node.id() == scope {
            return true;
        }
        current = node.parent().and_then(|parent| by_id.get(parent).copied());
    }
    false
}
