//! Pure structural rules that need no repository access.

use crate::object::{
    domain::{ObjectId, ObjectKind, TrellisObject},
    error::{ValidationError, ValidationErrorKind},
};

/// Field name reported for parent violations.
pub const PARENT_FIELD: &str = "parent";

/// Checks that `parent` may contain an object of `kind`.
///
/// Projects never have a parent; epics require a project; features require
/// an epic when they have a parent, and tasks a feature. Features and tasks
/// may also stand alone.
///
/// # Errors
///
/// Returns [`ValidationErrorKind::InvalidParentType`] when the hierarchy is
/// violated.
pub fn validate_parent_type(
    kind: ObjectKind,
    parent: Option<&TrellisObject>,
) -> Result<(), ValidationError> {
    match (parent, kind.parent_kind()) {
        (None, _) if kind.allows_standalone() => Ok(()),
        (None, Some(expected)) => Err(invalid_parent_type(format!(
            "a {kind} must have a {expected} parent"
        ))),
        (Some(parent), None) => Err(invalid_parent_type(format!(
            "a {kind} cannot have a parent, but {} was given",
            parent.id()
        ))),
        (Some(parent), Some(expected)) if parent.kind() != expected => {
            Err(invalid_parent_type(format!(
                "a {kind} must have a {expected} parent, but {} is a {}",
                parent.id(),
                parent.kind()
            )))
        }
        _ => Ok(()),
    }
}

/// Checks that no object in `objects` other than `id` itself references it
/// as parent or prerequisite.
///
/// # Errors
///
/// Returns [`ValidationErrorKind::HasDependents`] naming the dependents.
pub fn validate_no_dependents(
    id: &ObjectId,
    objects: &[TrellisObject],
) -> Result<(), ValidationError> {
    let dependents: Vec<&str> = objects
        .iter()
        .filter(|object| object.id() != id && object.references(id))
        .map(|object| object.id().as_str())
        .collect();
    if dependents.is_empty() {
        return Ok(());
    }
    Err(ValidationError::new(
        ValidationErrorKind::HasDependents,
        format!(
            "object {id} is still referenced by {}; delete with force to override",
            dependents.join(", ")
        ),
    ))
}

fn invalid_parent_type(message: String) -> ValidationError {
    ValidationError::new(ValidationErrorKind::InvalidParentType, message).with_field(PARENT_FIELD)
}
