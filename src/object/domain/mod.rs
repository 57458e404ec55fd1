//! Domain model for trellis objects.
//!
//! Projects, epics, features, and tasks share one aggregate,
//! [`TrellisObject`], whose kind is encoded in its identifier prefix. The
//! domain holds the status rules for claim and completion and the
//! identifier convention used to recognize stored objects; repository access
//! stays outside this boundary.

mod error;
mod ids;
mod object;
mod path;

pub use error::{
    ObjectDomainError, ParseObjectKindError, ParseObjectPriorityError, ParseObjectStatusError,
};
pub use ids::{ObjectId, ObjectKind};
pub use object::{
    ObjectDraft, ObjectPriority, ObjectStatus, PersistedObjectData, SCHEMA_VERSION, TrellisObject,
};
pub use path::{OBJECT_FILE_EXTENSION, object_id_from_location, object_ids_from_locations};
