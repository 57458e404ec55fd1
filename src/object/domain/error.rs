//! Error types for trellis object domain rules and parsing.

use super::{ObjectId, ObjectKind, ObjectStatus};
use thiserror::Error;

/// Errors returned while constructing or transitioning trellis objects.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ObjectDomainError {
    /// The identifier does not follow the `P-`/`E-`/`F-`/`T-` convention.
    #[error("invalid object identifier '{0}', expected a P-, E-, F-, or T- prefix")]
    InvalidObjectId(String),

    /// The persisted kind disagrees with the identifier prefix.
    #[error("object {id} is declared as {declared} but its prefix denotes {expected}")]
    KindMismatch {
        /// Object identifier.
        id: ObjectId,
        /// Kind stored alongside the object.
        declared: ObjectKind,
        /// Kind implied by the identifier prefix.
        expected: ObjectKind,
    },

    /// The object title is empty after trimming.
    #[error("object title must not be empty")]
    EmptyTitle,

    /// The requested status change is not permitted.
    #[error("invalid status transition for {id}: {from} -> {to}")]
    InvalidStatusTransition {
        /// Object identifier.
        id: ObjectId,
        /// Current status.
        from: ObjectStatus,
        /// Requested status.
        to: ObjectStatus,
    },

    /// Lifecycle operations only apply to task objects.
    #[error("object {id} is a {kind}, only tasks can be claimed or completed")]
    NotATask {
        /// Object identifier.
        id: ObjectId,
        /// Actual kind.
        kind: ObjectKind,
    },

    /// A prerequisite blocks the claim.
    #[error("{}", describe_unmet(.task, .prerequisite, .status))]
    UnmetPrerequisite {
        /// Task being claimed.
        task: ObjectId,
        /// First blocking prerequisite in declaration order.
        prerequisite: ObjectId,
        /// Status of the prerequisite, or `None` when it does not exist.
        status: Option<ObjectStatus>,
    },
}

fn describe_unmet(
    task: &ObjectId,
    prerequisite: &ObjectId,
    status: &Option<ObjectStatus>,
) -> String {
    match status {
        Some(current) => format!(
            "task {task} is blocked by prerequisite {prerequisite} (status: {current})"
        ),
        None => format!("task {task} is blocked by missing prerequisite {prerequisite}"),
    }
}

/// Error returned while parsing object kinds from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown object kind: {0}")]
pub struct ParseObjectKindError(pub String);

/// Error returned while parsing object statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown object status: {0}")]
pub struct ParseObjectStatusError(pub String);

/// Error returned while parsing object priorities from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown object priority: {0}")]
pub struct ParseObjectPriorityError(pub String);
