//! Application services for trellis objects.
//!
//! Each service owns a repository handle, a clock, and a shared
//! [`ObjectLocks`] table. Build services that touch the same store with
//! `with_locks` so their load-compute-save units serialize per object.

mod activity;
mod content;
mod lifecycle;
mod locks;
mod objects;
mod support;

pub use activity::ActivityLogService;
pub use content::{ContentService, ReplaceBodyOutcome, ReplaceBodyRequest, compile_body_pattern};
pub use lifecycle::{
    ClaimTaskRequest, CompleteTaskRequest, PruneClosedRequest, PruneFailure, PruneSummary,
    TaskLifecycleService,
};
pub use locks::ObjectLocks;
pub use objects::{CreateObjectRequest, ObjectService, UpdateObjectRequest};
