//! Markdown document codec for stored objects.
//!
//! A document is a `---` fenced frontmatter block holding the object fields
//! as JSON (which YAML 1.2 readers accept), a blank line, and the markdown
//! body. Derived child identifiers are never written.

use crate::object::domain::{
    ObjectDomainError, ObjectId, ObjectKind, ObjectPriority, ObjectStatus, PersistedObjectData,
    TrellisObject,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

const DELIMITER: &str = "---";

/// Errors returned while decoding a stored document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document does not open with a frontmatter block.
    #[error("document does not start with a '---' frontmatter block")]
    MissingFrontmatter,

    /// The frontmatter block is never closed.
    #[error("frontmatter block is not terminated by '---'")]
    UnterminatedFrontmatter,

    /// The frontmatter fields could not be decoded.
    #[error("invalid frontmatter: {0}")]
    Fields(#[from] serde_json::Error),

    /// The decoded fields violate a domain rule.
    #[error(transparent)]
    Domain(#[from] ObjectDomainError),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectFrontmatter {
    id: ObjectId,
    #[serde(rename = "type")]
    kind: ObjectKind,
    title: String,
    status: ObjectStatus,
    #[serde(default)]
    priority: ObjectPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<ObjectId>,
    #[serde(default)]
    prerequisites: Vec<ObjectId>,
    #[serde(default)]
    affected_files: BTreeMap<String, String>,
    #[serde(default)]
    log: Vec<String>,
    schema: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

/// Renders an object as a markdown document.
///
/// # Errors
///
/// Returns the serializer error if the frontmatter cannot be encoded.
pub fn render_document(object: &TrellisObject) -> Result<String, serde_json::Error> {
    let frontmatter = ObjectFrontmatter {
        id: object.id().clone(),
        kind: object.kind(),
        title: object.title().to_owned(),
        status: object.status(),
        priority: object.priority(),
        parent: object.parent().cloned(),
        prerequisites: object.prerequisites().to_vec(),
        affected_files: object.affected_files().clone(),
        log: object.log().to_vec(),
        schema: object.schema().to_owned(),
        created: object.created(),
        updated: object.updated(),
    };
    let fields = serde_json::to_string_pretty(&frontmatter)?;
    let mut buf = format!("{DELIMITER}\n{fields}\n{DELIMITER}\n");
    if !object.body().is_empty() {
        buf.push('\n');
        buf.push_str(object.body());
    }
    Ok(buf)
}

/// Parses a markdown document back into an object.
///
/// # Errors
///
/// Returns [`DocumentError`] when the frontmatter is missing, malformed, or
/// inconsistent with the identifier.
pub fn parse_document(contents: &str) -> Result<TrellisObject, DocumentError> {
    let (fields, body) = split_frontmatter(contents)?;
    let frontmatter: ObjectFrontmatter = serde_json::from_str(fields)?;
    let object = TrellisObject::from_persisted(PersistedObjectData {
        id: frontmatter.id,
        kind: frontmatter.kind,
        title: frontmatter.title,
        status: frontmatter.status,
        priority: frontmatter.priority,
        parent: frontmatter.parent,
        prerequisites: frontmatter.prerequisites,
        affected_files: frontmatter.affected_files,
        log: frontmatter.log,
        schema: frontmatter.schema,
        body: body.to_owned(),
        created: frontmatter.created,
        updated: frontmatter.updated,
    })?;
    Ok(object)
}

/// Splits a document into its frontmatter text and body.
fn split_frontmatter(contents: &str) -> Result<(&str, &str), DocumentError> {
    let normalized_open = contents
        .strip_prefix("---\r\n")
        .or_else(|| contents.strip_prefix("---\n"))
        .ok_or(DocumentError::MissingFrontmatter)?;

    let mut offset = 0;
    for line in normalized_open.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            let (fields, rest) = normalized_open.split_at(offset);
            let after_delimiter = rest.strip_prefix(line).unwrap_or_default();
            let body = after_delimiter
                .strip_prefix("\r\n")
                .or_else(|| after_delimiter.strip_prefix('\n'))
                .unwrap_or(after_delimiter);
            return Ok((fields, body));
        }
        offset += line.len();
    }
    Err(DocumentError::UnterminatedFrontmatter)
}
