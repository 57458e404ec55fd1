//! Pattern-based rewrites of an object's markdown body.

use super::locks::ObjectLocks;
use super::support::find_or_not_found;
use crate::object::{
    domain::{ObjectId, TrellisObject},
    error::{TrellisError, TrellisResult},
    ports::ObjectRepository,
};
use regex::{Regex, RegexBuilder};
use std::sync::Arc;
use tracing::{debug, info};

/// Request payload for a body rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceBodyRequest {
    id: ObjectId,
    pattern: String,
    replacement: String,
    allow_multiple_occurrences: bool,
}

impl ReplaceBodyRequest {
    /// Creates a request that refuses to touch more than one match.
    ///
    /// `replacement` may reference capture groups as `$1`, `$2`, or
    /// `${name}`.
    #[must_use]
    pub fn new(id: ObjectId, pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            id,
            pattern: pattern.into(),
            replacement: replacement.into(),
            allow_multiple_occurrences: false,
        }
    }

    /// Permits replacing every match when the pattern matches more than once.
    #[must_use]
    pub const fn allow_multiple_occurrences(mut self, allow: bool) -> Self {
        self.allow_multiple_occurrences = allow;
        self
    }
}

/// Result of a body rewrite that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceBodyOutcome {
    /// The body changed and the object was saved.
    Replaced {
        /// Object as saved.
        object: TrellisObject,
        /// Number of matches substituted.
        replacements: usize,
    },
    /// The pattern matched nothing; nothing was written.
    NoMatches,
    /// Substitution reproduced the original body; nothing was written.
    Unchanged,
}

/// Compiles a body pattern with `.` matching newlines and `^`/`$` matching
/// at line boundaries.
///
/// # Errors
///
/// Returns [`TrellisError::InvalidPattern`] for empty or malformed patterns.
pub fn compile_body_pattern(pattern: &str) -> TrellisResult<Regex> {
    if pattern.is_empty() {
        return Err(TrellisError::InvalidPattern {
            pattern: String::new(),
            reason: "pattern must not be empty".to_owned(),
        });
    }
    RegexBuilder::new(pattern)
        .dot_matches_new_line(true)
        .multi_line(true)
        .build()
        .map_err(|err| TrellisError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: err.to_string(),
        })
}

/// Wraps every unbraced numbered group reference in braces, so `$1_final`
/// expands group 1 followed by `_final` rather than a group named `1_final`.
/// Named references and `$$` escapes pass through unchanged.
fn brace_numbered_groups(replacement: &str) -> String {
    let mut normalized = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(ch) = chars.next() {
        normalized.push(ch);
        if ch != '$' {
            continue;
        }
        match chars.peek() {
            Some(&'$') => {
                if let Some(escaped) = chars.next() {
                    normalized.push(escaped);
                }
            }
            Some(next) if next.is_ascii_digit() => {
                normalized.push('{');
                while let Some(digit) = chars.next_if(char::is_ascii_digit) {
                    normalized.push(digit);
                }
                normalized.push('}');
            }
            _ => {}
        }
    }
    normalized
}

/// Body rewrite service.
#[derive(Clone)]
pub struct ContentService<R>
where
    R: ObjectRepository,
{
    repository: Arc<R>,
    locks: Arc<ObjectLocks>,
}

impl<R> ContentService<R>
where
    R: ObjectRepository,
{
    /// Creates a content service with its own lock table.
    #[must_use]
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            locks: Arc::new(ObjectLocks::new()),
        }
    }

    /// Shares a lock table with other services on the same store.
    #[must_use]
    pub fn with_locks(mut self, locks: Arc<ObjectLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Rewrites the body of an object.
    ///
    /// The match count is only computed past the first match, and only in
    /// full once a second match exists. The store is written only for
    /// [`ReplaceBodyOutcome::Replaced`], and only the body changes.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::NotFound`], [`TrellisError::NoContent`] for
    /// an empty body, [`TrellisError::InvalidPattern`],
    /// [`TrellisError::MultipleMatches`] with the exact count when more than
    /// one match exists without permission, or repository failures.
    pub async fn replace_body(&self, request: ReplaceBodyRequest) -> TrellisResult<ReplaceBodyOutcome> {
        let _guard = self.locks.lock(&request.id).await;
        let mut object = find_or_not_found(&*self.repository, &request.id).await?;
        if object.body().is_empty() {
            return Err(TrellisError::NoContent(request.id));
        }
        let regex = compile_body_pattern(&request.pattern)?;

        let mut matches = regex.find_iter(object.body());
        if matches.next().is_none() {
            debug!(object_id = %request.id, pattern = %request.pattern, "pattern matched nothing");
            return Ok(ReplaceBodyOutcome::NoMatches);
        }
        let replacements = if matches.next().is_some() {
            let count = 2 + matches.count();
            if !request.allow_multiple_occurrences {
                return Err(TrellisError::MultipleMatches {
                    count,
                    pattern: request.pattern,
                });
            }
            count
        } else {
            1
        };

        let replacement = brace_numbered_groups(&request.replacement);
        let rewritten = regex
            .replace_all(object.body(), replacement.as_str())
            .into_owned();
        if rewritten == object.body() {
            debug!(object_id = %request.id, "replacement left body unchanged");
            return Ok(ReplaceBodyOutcome::Unchanged);
        }
        object.rewrite_body(rewritten);
        self.repository.save_object(&object).await?;
        info!(object_id = %request.id, replacements, "replaced body content");
        Ok(ReplaceBodyOutcome::Replaced {
            object,
            replacements,
        })
    }
}
