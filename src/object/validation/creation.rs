//! Repository-backed checks run before an object is persisted.

use super::rules::{PARENT_FIELD, validate_parent_type};
use crate::object::{
    domain::{ObjectId, TrellisObject},
    error::{TrellisResult, ValidationError, ValidationErrorKind},
    ports::ObjectRepository,
};
use tracing::debug;

/// Checks that the referenced parent exists and returns it.
///
/// An absent or empty identifier passes without touching the repository.
/// A malformed identifier cannot name a stored object and is reported as a
/// missing parent.
///
/// # Errors
///
/// Returns [`ValidationErrorKind::ParentNotFound`] carrying the `parent`
/// field, or the repository failure unchanged.
pub async fn validate_parent_exists<R>(
    parent_id: Option<&str>,
    repository: &R,
) -> TrellisResult<Option<TrellisObject>>
where
    R: ObjectRepository + ?Sized,
{
    let Some(raw) = parent_id.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    let parent = match ObjectId::new(raw) {
        Ok(id) => repository.get_object_by_id(&id).await?,
        Err(_) => None,
    };
    parent.map(Some).ok_or_else(|| {
        ValidationError::new(
            ValidationErrorKind::ParentNotFound,
            format!("parent object with id '{raw}' not found"),
        )
        .with_field(PARENT_FIELD)
        .into()
    })
}

/// Runs the ordered pre-persist checks for `candidate`, stopping at the
/// first failure: parent existence, then parent/child kind compatibility.
///
/// # Errors
///
/// Returns the first [`ValidationError`] or a repository failure.
pub async fn validate_object_creation<R>(candidate: &TrellisObject, repository: &R) -> TrellisResult<()>
where
    R: ObjectRepository + ?Sized,
{
    let parent_id = candidate.parent().map(ObjectId::as_str);
    let parent = validate_parent_exists(parent_id, repository).await?;
    validate_parent_type(candidate.kind(), parent.as_ref())?;
    debug!(object_id = %candidate.id(), "object passed creation checks");
    Ok(())
}
