//! Structural validation for trellis objects.
//!
//! Checks run in a fixed order and stop at the first failure. Rules that
//! need no storage live in [`rules`]; checks that consult the repository
//! live in [`creation`].

pub mod creation;
pub mod rules;

pub use creation::{validate_object_creation, validate_parent_exists};
pub use rules::{PARENT_FIELD, validate_no_dependents, validate_parent_type};
