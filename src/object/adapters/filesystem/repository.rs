//! Markdown-file object repository rooted in a capability directory.

use super::document::{parse_document, render_document};
use super::layout::{object_location, relocated};
use crate::config::TrellisConfig;
use crate::object::{
    domain::{OBJECT_FILE_EXTENSION, ObjectId, ObjectKind, TrellisObject, object_id_from_location},
    ports::{ObjectFilter, ObjectRepository, ObjectRepositoryError, ObjectRepositoryResult},
};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

/// Object repository storing one markdown document per object.
///
/// Every call re-reads the directory tree, so concurrent edits made by other
/// tools are picked up without a reload step.
#[derive(Debug, Clone)]
pub struct FileSystemObjectRepository {
    root: Arc<Dir>,
}

impl FileSystemObjectRepository {
    /// Opens the planning root named by `config`, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectRepositoryError::Persistence`] when the directory
    /// cannot be created or opened.
    pub fn open(config: &TrellisConfig) -> ObjectRepositoryResult<Self> {
        let planning_root = config.planning_root();
        Dir::create_ambient_dir_all(&planning_root, ambient_authority())
            .map_err(ObjectRepositoryError::persistence)?;
        let root = Dir::open_ambient_dir(&planning_root, ambient_authority())
            .map_err(ObjectRepositoryError::persistence)?;
        debug!(root = %planning_root, "opened filesystem object repository");
        Ok(Self::from_dir(root))
    }

    /// Wraps an already opened directory.
    #[must_use]
    pub fn from_dir(root: Dir) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    async fn with_root<F, T>(&self, operation: F) -> ObjectRepositoryResult<T>
    where
        F: FnOnce(&Dir) -> ObjectRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || operation(&root))
            .await
            .map_err(ObjectRepositoryError::persistence)?
    }
}

#[async_trait]
impl ObjectRepository for FileSystemObjectRepository {
    async fn get_object_by_id(&self, id: &ObjectId) -> ObjectRepositoryResult<Option<TrellisObject>> {
        let wanted = id.clone();
        self.with_root(move |root| {
            let index = index_locations(root)?;
            let Some(location) = index.get(&wanted) else {
                return Ok(None);
            };
            let object = read_object(root, location)?;
            let children = if object.kind() == ObjectKind::Task {
                Vec::new()
            } else {
                children_under(root, location, &wanted)?
            };
            Ok(Some(object.with_children_ids(children)))
        })
        .await
    }

    async fn get_objects(&self, filter: &ObjectFilter) -> ObjectRepositoryResult<Vec<TrellisObject>> {
        let criteria = filter.clone();
        self.with_root(move |root| {
            let objects = load_all(root)?;
            let mut children: BTreeMap<ObjectId, Vec<ObjectId>> = BTreeMap::new();
            for object in &objects {
                if let Some(parent) = object.parent() {
                    children
                        .entry(parent.clone())
                        .or_default()
                        .push(object.id().clone());
                }
            }
            Ok(objects
                .into_iter()
                .filter(|object| criteria.matches(object))
                .map(|object| {
                    let ids = children.remove(object.id()).unwrap_or_default();
                    object.with_children_ids(ids)
                })
                .collect())
        })
        .await
    }

    async fn save_object(&self, object: &TrellisObject) -> ObjectRepositoryResult<()> {
        let snapshot = object.clone();
        self.with_root(move |root| {
            let index = index_locations(root)?;
            let existing = index.get(snapshot.id());
            let target = match existing {
                Some(location) => relocated(&snapshot, location),
                None => {
                    let parent_location = snapshot
                        .parent()
                        .and_then(|parent| index.get(parent))
                        .map(Utf8PathBuf::as_path);
                    object_location(&snapshot, parent_location)
                }
            };
            let contents = render_document(&snapshot)
                .map_err(|err| ObjectRepositoryError::corrupt(target.as_str(), err))?;
            write_atomically(root, &target, &contents).map_err(ObjectRepositoryError::persistence)?;
            if let Some(previous) = existing.filter(|previous| **previous != target) {
                root.remove_file(previous)
                    .map_err(ObjectRepositoryError::persistence)?;
                remove_empty_dirs(root, previous);
                debug!(object_id = %snapshot.id(), from = %previous, to = %target, "moved object file");
            }
            Ok(())
        })
        .await
    }

    async fn delete_object(&self, id: &ObjectId) -> ObjectRepositoryResult<()> {
        let wanted = id.clone();
        self.with_root(move |root| {
            let index = index_locations(root)?;
            let location = index
                .get(&wanted)
                .ok_or_else(|| ObjectRepositoryError::NotFound(wanted.clone()))?;
            root.remove_file(location)
                .map_err(ObjectRepositoryError::persistence)?;
            remove_empty_dirs(root, location);
            Ok(())
        })
        .await
    }
}

/// Maps every recognized identifier to its location.
fn index_locations(root: &Dir) -> ObjectRepositoryResult<BTreeMap<ObjectId, Utf8PathBuf>> {
    let locations = scan_markdown(root, Utf8Path::new("")).map_err(ObjectRepositoryError::persistence)?;
    let mut index = BTreeMap::new();
    for location in locations {
        let Some(id) = object_id_from_location(location.as_str()) else {
            continue;
        };
        if let Some(first) = index.get(&id) {
            warn!(object_id = %id, kept = %first, ignored = %location, "duplicate object file");
            continue;
        }
        index.insert(id, location);
    }
    Ok(index)
}

fn load_all(root: &Dir) -> ObjectRepositoryResult<Vec<TrellisObject>> {
    index_locations(root)?
        .values()
        .map(|location| read_object(root, location))
        .collect()
}

/// Reads child identifiers from the subtree of a container object.
fn children_under(
    root: &Dir,
    location: &Utf8Path,
    parent: &ObjectId,
) -> ObjectRepositoryResult<Vec<ObjectId>> {
    let Some(container_dir) = location.parent().filter(|dir| !dir.as_str().is_empty()) else {
        return Ok(Vec::new());
    };
    let mut children = Vec::new();
    let candidates = scan_markdown(root, container_dir).map_err(ObjectRepositoryError::persistence)?;
    for candidate in candidates {
        if candidate == location || object_id_from_location(candidate.as_str()).is_none() {
            continue;
        }
        let object = read_object(root, &candidate)?;
        if object.parent() == Some(parent) {
            children.push(object.id().clone());
        }
    }
    Ok(children)
}

fn read_object(root: &Dir, location: &Utf8Path) -> ObjectRepositoryResult<TrellisObject> {
    let contents = root
        .read_to_string(location)
        .map_err(ObjectRepositoryError::persistence)?;
    let object = parse_document(&contents)
        .map_err(|err| ObjectRepositoryError::corrupt(location.as_str(), err))?;
    let named = object_id_from_location(location.as_str());
    if named.as_ref() != Some(object.id()) {
        return Err(ObjectRepositoryError::corrupt(
            location.as_str(),
            format!("file declares id {}", object.id()),
        ));
    }
    Ok(object)
}

/// Lists markdown files below `start`, skipping hidden entries.
fn scan_markdown(root: &Dir, start: &Utf8Path) -> io::Result<Vec<Utf8PathBuf>> {
    let mut pending = vec![start.to_path_buf()];
    let mut found = Vec::new();
    while let Some(current) = pending.pop() {
        let entries = if current.as_str().is_empty() {
            root.entries()?
        } else {
            root.read_dir(&current)?
        };
        for entry_result in entries {
            let entry = entry_result?;
            let name = entry.file_name()?;
            if name.starts_with('.') {
                continue;
            }
            let path = current.join(&name);
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() && name.ends_with(OBJECT_FILE_EXTENSION) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Writes through a hidden temporary file and renames it into place so
/// readers never observe a partial document.
fn write_atomically(root: &Dir, target: &Utf8Path, contents: &str) -> io::Result<()> {
    let dir = target.parent().unwrap_or_else(|| Utf8Path::new(""));
    if !dir.as_str().is_empty() {
        root.create_dir_all(dir)?;
    }
    let name = target.file_name().unwrap_or_default();
    let temp = dir.join(format!(".{name}.tmp"));
    root.write(&temp, contents)?;
    root.rename(&temp, root, target)
}

/// Removes the directory that held a file, then each emptied ancestor, best
/// effort. The walk stops at the first directory that still has entries,
/// which for a task bucket is its container's directory.
fn remove_empty_dirs(root: &Dir, location: &Utf8Path) {
    let mut current = location.parent();
    while let Some(dir) = current.filter(|dir| !dir.as_str().is_empty()) {
        if root.remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}

