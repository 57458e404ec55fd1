//! Mapping storage locations to canonical object identifiers.
//!
//! A location is recognized as a trellis object when its leaf name, minus a
//! `.md` extension, follows the identifier convention. Nesting depth and
//! directory names play no part, so the same rule covers hierarchical and
//! standalone layouts.

use super::ObjectId;
use std::collections::BTreeSet;

/// File extension carried by stored objects.
pub const OBJECT_FILE_EXTENSION: &str = ".md";

/// Derives the canonical identifier from a storage location.
///
/// Backslashes are normalized to `/` first. Returns `None` when the leaf
/// name does not start with `P-`, `E-`, `F-`, or `T-`.
///
/// # Examples
///
/// ```
/// use trellis::object::domain::object_id_from_location;
///
/// let id = object_id_from_location(r"projects\P-app\epics\E-auth\E-auth.md");
/// assert_eq!(id.map(|id| id.to_string()), Some("E-auth".to_owned()));
/// assert!(object_id_from_location("notes/readme.md").is_none());
/// ```
#[must_use]
pub fn object_id_from_location(location: &str) -> Option<ObjectId> {
    let normalized = location.replace('\\', "/");
    let leaf = normalized.rsplit('/').next().unwrap_or_default();
    let stem = leaf.strip_suffix(OBJECT_FILE_EXTENSION).unwrap_or(leaf);
    ObjectId::new(stem).ok()
}

/// Extracts identifiers from many locations, deduplicated and sorted.
///
/// Locations that are not trellis objects are skipped silently.
#[must_use]
pub fn object_ids_from_locations<I, S>(locations: I) -> Vec<ObjectId>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    locations
        .into_iter()
        .filter_map(|location| object_id_from_location(location.as_ref()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
