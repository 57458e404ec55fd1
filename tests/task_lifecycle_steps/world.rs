//! Shared world state for task lifecycle BDD scenarios.

use std::sync::Arc;

use trellis::object::{
    adapters::InMemoryObjectRepository,
    domain::{ObjectId, TrellisObject},
    error::TrellisError,
    ports::ObjectRepository,
    services::{ContentService, ObjectLocks, PruneSummary, TaskLifecycleService},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Scenario world for task lifecycle behaviour tests.
pub struct LifecycleWorld {
    pub repository: Arc<InMemoryObjectRepository>,
    pub lifecycle: TaskLifecycleService<InMemoryObjectRepository, DefaultClock>,
    pub content: ContentService<InMemoryObjectRepository>,
    pub last_error: Option<TrellisError>,
    pub last_prune: Option<PruneSummary>,
}

impl LifecycleWorld {
    /// Creates a world over an empty store.
    #[must_use]
    pub fn new() -> Self {
        let repository = Arc::new(InMemoryObjectRepository::new());
        let clock = Arc::new(DefaultClock);
        let locks = Arc::new(ObjectLocks::new());
        Self {
            lifecycle: TaskLifecycleService::new(Arc::clone(&repository), clock)
                .with_locks(Arc::clone(&locks)),
            content: ContentService::new(Arc::clone(&repository)).with_locks(locks),
            repository,
            last_error: None,
            last_prune: None,
        }
    }

    /// Loads an object from the store.
    pub fn find(&self, id: &str) -> Result<Option<TrellisObject>, eyre::Report> {
        let object_id = ObjectId::new(id)?;
        Ok(run_async(self.repository.get_object_by_id(&object_id))?)
    }

    /// Records the failure of a step outcome, clearing any earlier one.
    pub fn record<T>(&mut self, result: Result<T, TrellisError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Some(value)
            }
            Err(err) => {
                self.last_error = Some(err);
                None
            }
        }
    }
}

impl Default for LifecycleWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> LifecycleWorld {
    LifecycleWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
