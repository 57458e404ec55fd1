//! In-memory object repository for tests and embedded use.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::object::{
    domain::{ObjectId, TrellisObject},
    ports::{ObjectFilter, ObjectRepository, ObjectRepositoryError, ObjectRepositoryResult},
};

/// Thread-safe in-memory object repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectRepository {
    state: Arc<RwLock<BTreeMap<ObjectId, TrellisObject>>>,
}

impl InMemoryObjectRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl ToString) -> ObjectRepositoryError {
    ObjectRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

/// Attaches derived child identifiers from the `parent` fields in `objects`.
fn with_children(objects: &BTreeMap<ObjectId, TrellisObject>, object: &TrellisObject) -> TrellisObject {
    let children = objects
        .values()
        .filter(|candidate| candidate.parent() == Some(object.id()))
        .map(|child| child.id().clone())
        .collect();
    object.clone().with_children_ids(children)
}

#[async_trait]
impl ObjectRepository for InMemoryObjectRepository {
    async fn get_object_by_id(&self, id: &ObjectId) -> ObjectRepositoryResult<Option<TrellisObject>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.get(id).map(|object| with_children(&state, object)))
    }

    async fn get_objects(&self, filter: &ObjectFilter) -> ObjectRepositoryResult<Vec<TrellisObject>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .values()
            .filter(|object| filter.matches(object))
            .map(|object| with_children(&state, object))
            .collect())
    }

    async fn save_object(&self, object: &TrellisObject) -> ObjectRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.insert(object.id().clone(), object.clone().with_children_ids(Vec::new()));
        Ok(())
    }

    async fn delete_object(&self, id: &ObjectId) -> ObjectRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ObjectRepositoryError::NotFound(id.clone()))
    }
}
