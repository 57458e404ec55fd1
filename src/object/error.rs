//! Service-level error types for trellis object operations.
//!
//! Every failure carries a structured [`ErrorKind`] so callers can branch
//! without matching on message text; the `Display` form is the
//! human-readable message.

use crate::object::{
    domain::{ObjectDomainError, ObjectId},
    ports::ObjectRepositoryError,
};
use std::fmt;
use thiserror::Error;

/// Result type for object service operations.
pub type TrellisResult<T> = Result<T, TrellisError>;

/// Stable discriminator for [`TrellisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An object identifier did not resolve.
    NotFound,
    /// A structural rule rejected a create, update, or delete.
    ValidationFailure,
    /// A lifecycle rule rejected a status change.
    InvalidTransition,
    /// A claim is blocked by a prerequisite.
    UnmetPrerequisite,
    /// A body pattern failed to compile.
    InvalidPattern,
    /// A body pattern matched more than once without permission.
    MultipleMatches,
    /// The object has no body to rewrite.
    NoContent,
    /// No task is currently eligible to be claimed.
    NoAvailableTask,
    /// Caller input is malformed.
    InvalidInput,
    /// The repository failed.
    StorageFailure,
}

impl ErrorKind {
    /// Returns the stable literal for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::ValidationFailure => "VALIDATION_FAILURE",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::UnmetPrerequisite => "UNMET_PREREQUISITE",
            Self::InvalidPattern => "INVALID_PATTERN",
            Self::MultipleMatches => "MULTIPLE_MATCHES",
            Self::NoContent => "NO_CONTENT",
            Self::NoAvailableTask => "NO_AVAILABLE_TASK",
            Self::InvalidInput => "INVALID_INPUT",
            Self::StorageFailure => "STORAGE_FAILURE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural rule violated by a validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    /// The referenced parent does not exist.
    ParentNotFound,
    /// The parent's kind cannot contain the candidate's kind.
    InvalidParentType,
    /// Other objects still reference the object being deleted.
    HasDependents,
}

impl ValidationErrorKind {
    /// Returns the stable literal for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ParentNotFound => "PARENT_NOT_FOUND",
            Self::InvalidParentType => "INVALID_PARENT_TYPE",
            Self::HasDependents => "HAS_DEPENDENTS",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed validation check.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    kind: ValidationErrorKind,
    field: Option<String>,
    message: String,
}

impl ValidationError {
    /// Creates a validation error.
    #[must_use]
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            message: message.into(),
        }
    }

    /// Names the offending field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Returns the violated rule.
    #[must_use]
    pub const fn kind(&self) -> ValidationErrorKind {
        self.kind
    }

    /// Returns the offending field, if known.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors returned by object services.
#[derive(Debug, Error)]
pub enum TrellisError {
    /// No object exists with the given identifier.
    #[error("object {0} not found")]
    NotFound(ObjectId),

    /// A validation check failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A domain rule failed.
    #[error(transparent)]
    Domain(#[from] ObjectDomainError),

    /// The body pattern could not be compiled.
    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Pattern as supplied.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// The body pattern matched more than once.
    #[error(
        "pattern '{pattern}' matched {count} times; set allow_multiple_occurrences to replace every match or make the pattern more specific"
    )]
    MultipleMatches {
        /// Exact number of matches in the body.
        count: usize,
        /// Pattern as supplied.
        pattern: String,
    },

    /// The object has an empty body.
    #[error("object {0} has no body content")]
    NoContent(ObjectId),

    /// No task is eligible to be claimed.
    #[error("no open task with satisfied prerequisites is available to claim")]
    NoAvailableTask,

    /// The repository failed.
    #[error(transparent)]
    Repository(#[from] ObjectRepositoryError),
}

impl TrellisError {
    /// Returns the structured discriminator for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::Repository(ObjectRepositoryError::NotFound(_)) => {
                ErrorKind::NotFound
            }
            Self::Validation(_) => ErrorKind::ValidationFailure,
            Self::Domain(err) => match err {
                ObjectDomainError::InvalidStatusTransition { .. }
                | ObjectDomainError::NotATask { .. } => ErrorKind::InvalidTransition,
                ObjectDomainError::UnmetPrerequisite { .. } => ErrorKind::UnmetPrerequisite,
                ObjectDomainError::InvalidObjectId(_)
                | ObjectDomainError::KindMismatch { .. }
                | ObjectDomainError::EmptyTitle => ErrorKind::InvalidInput,
            },
            Self::InvalidPattern { .. } => ErrorKind::InvalidPattern,
            Self::MultipleMatches { .. } => ErrorKind::MultipleMatches,
            Self::NoContent(_) => ErrorKind::NoContent,
            Self::NoAvailableTask => ErrorKind::NoAvailableTask,
            Self::Repository(_) => ErrorKind::StorageFailure,
        }
    }
}
