//! Identifier and kind types for trellis objects.

use super::{ObjectDomainError, ParseObjectKindError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest slug derived from a title when generating identifiers.
const MAX_SLUG_LENGTH: usize = 40;

/// Kind of a trellis object, encoded in the identifier prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Top-level project.
    Project,
    /// Epic grouping features inside a project.
    Epic,
    /// Feature grouping tasks.
    Feature,
    /// Unit of claimable work.
    Task,
}

impl ObjectKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Epic => "epic",
            Self::Feature => "feature",
            Self::Task => "task",
        }
    }

    /// Returns the identifier prefix character for this kind.
    #[must_use]
    pub const fn prefix(self) -> char {
        match self {
            Self::Project => 'P',
            Self::Epic => 'E',
            Self::Feature => 'F',
            Self::Task => 'T',
        }
    }

    /// Returns the kind whose identifiers start with `prefix`.
    #[must_use]
    pub const fn from_prefix(prefix: char) -> Option<Self> {
        match prefix {
            'P' => Some(Self::Project),
            'E' => Some(Self::Epic),
            'F' => Some(Self::Feature),
            'T' => Some(Self::Task),
            _ => None,
        }
    }

    /// Returns the kind that may act as parent of this kind.
    ///
    /// Projects never have a parent.
    #[must_use]
    pub const fn parent_kind(self) -> Option<Self> {
        match self {
            Self::Project => None,
            Self::Epic => Some(Self::Project),
            Self::Feature => Some(Self::Epic),
            Self::Task => Some(Self::Feature),
        }
    }

    /// Returns whether an object of this kind may exist without a parent.
    #[must_use]
    pub const fn allows_standalone(self) -> bool {
        matches!(self, Self::Project | Self::Feature | Self::Task)
    }

    /// Returns whether this kind legally contains `child`.
    #[must_use]
    pub fn can_contain(self, child: Self) -> bool {
        child.parent_kind() == Some(self)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ObjectKind {
    type Error = ParseObjectKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "project" => Ok(Self::Project),
            "epic" => Ok(Self::Epic),
            "feature" => Ok(Self::Feature),
            "task" => Ok(Self::Task),
            _ => Err(ParseObjectKindError(value.to_owned())),
        }
    }
}

/// Globally unique trellis object identifier such as `T-add-login-form`.
///
/// The first character selects the [`ObjectKind`]; the second is always `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Creates a validated identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectDomainError::InvalidObjectId`] when the value does not
    /// start with `P-`, `E-`, `F-`, or `T-`, or contains whitespace or path
    /// separators.
    pub fn new(value: impl Into<String>) -> Result<Self, ObjectDomainError> {
        let raw = value.into();
        if !Self::is_well_formed(&raw) {
            return Err(ObjectDomainError::InvalidObjectId(raw));
        }
        Ok(Self(raw))
    }

    /// Parses an optional identifier where an empty string means absent.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectDomainError::InvalidObjectId`] for non-empty values
    /// that are not well formed.
    pub fn parse_optional(value: Option<&str>) -> Result<Option<Self>, ObjectDomainError> {
        match value.map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Self::new(raw).map(Some),
        }
    }

    /// Derives an identifier from a title: kind prefix plus a kebab slug.
    #[must_use]
    pub fn from_title(kind: ObjectKind, title: &str) -> Self {
        Self(format!("{}-{}", kind.prefix(), slugify(title)))
    }

    /// Returns a copy of this identifier with a numeric disambiguation suffix.
    #[must_use]
    pub fn with_suffix(&self, suffix: usize) -> Self {
        Self(format!("{}-{suffix}", self.0))
    }

    /// Returns whether `value` follows the identifier convention.
    #[must_use]
    pub fn is_well_formed(value: &str) -> bool {
        let mut chars = value.chars();
        let has_prefix = chars.next().and_then(ObjectKind::from_prefix).is_some()
            && chars.next() == Some('-');
        has_prefix
            && !value
                .chars()
                .any(|c| c.is_whitespace() || c == '/' || c == '\\')
    }

    /// Returns the kind encoded in the identifier prefix.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        // Construction guarantees a valid prefix.
        self.0
            .chars()
            .next()
            .and_then(ObjectKind::from_prefix)
            .unwrap_or(ObjectKind::Task)
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.len() >= MAX_SLUG_LENGTH {
            break;
        }
    }
    let trimmed = slug.trim_end_matches('-');
    if trimmed.is_empty() {
        "untitled".to_owned()
    } else {
        trimmed.to_owned()
    }
}

impl TryFrom<String> for ObjectId {
    type Error = ObjectDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectId> for String {
    fn from(value: ObjectId) -> Self {
        value.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
