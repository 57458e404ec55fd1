//! On-disk placement of objects under the planning root.
//!
//! ```text
//! projects/P-app/P-app.md
//! projects/P-app/epics/E-auth/E-auth.md
//! projects/P-app/epics/E-auth/features/F-login/F-login.md
//! projects/P-app/epics/E-auth/features/F-login/tasks-open/T-form.md
//! features/F-solo/F-solo.md
//! tasks-closed/T-solo.md
//! ```

use crate::object::domain::{OBJECT_FILE_EXTENSION, ObjectId, ObjectKind, TrellisObject};
use camino::{Utf8Path, Utf8PathBuf};

const PROJECTS_DIR: &str = "projects";
const EPICS_DIR: &str = "epics";
const FEATURES_DIR: &str = "features";
const OPEN_TASKS_DIR: &str = "tasks-open";
const CLOSED_TASKS_DIR: &str = "tasks-closed";

/// Returns the file name for an object identifier.
pub(super) fn file_name(id: &ObjectId) -> String {
    format!("{id}{OBJECT_FILE_EXTENSION}")
}

/// Returns where `object` belongs, relative to the planning root.
///
/// `parent_location` is the file of the parent object when one exists.
/// Container objects get their own directory so children can nest beneath
/// them; tasks sit in an open or closed bucket by status.
pub(super) fn object_location(
    object: &TrellisObject,
    parent_location: Option<&Utf8Path>,
) -> Utf8PathBuf {
    let base = parent_location
        .and_then(Utf8Path::parent)
        .map_or_else(Utf8PathBuf::new, Utf8Path::to_path_buf);
    let id = object.id();
    match object.kind() {
        ObjectKind::Project => container(Utf8Path::new(PROJECTS_DIR), id),
        ObjectKind::Epic => container(&base.join(EPICS_DIR), id),
        ObjectKind::Feature => container(&base.join(FEATURES_DIR), id),
        ObjectKind::Task => {
            let bucket = if object.status().is_terminal() {
                CLOSED_TASKS_DIR
            } else {
                OPEN_TASKS_DIR
            };
            base.join(bucket).join(file_name(id))
        }
    }
}

/// Returns where an already stored object belongs after a save.
///
/// Stored objects keep their location, except that tasks switch between the
/// open and closed buckets as their status changes.
pub(super) fn relocated(object: &TrellisObject, existing: &Utf8Path) -> Utf8PathBuf {
    if object.kind() != ObjectKind::Task {
        return existing.to_path_buf();
    }
    let Some(bucket_dir) = existing.parent() else {
        return existing.to_path_buf();
    };
    let in_bucket = matches!(
        bucket_dir.file_name(),
        Some(OPEN_TASKS_DIR | CLOSED_TASKS_DIR)
    );
    if !in_bucket {
        return existing.to_path_buf();
    }
    let base = bucket_dir.parent().unwrap_or_else(|| Utf8Path::new(""));
    let bucket = if object.status().is_terminal() {
        CLOSED_TASKS_DIR
    } else {
        OPEN_TASKS_DIR
    };
    base.join(bucket).join(file_name(object.id()))
}

fn container(dir: &Utf8Path, id: &ObjectId) -> Utf8PathBuf {
    dir.join(id.as_str()).join(file_name(id))
}
