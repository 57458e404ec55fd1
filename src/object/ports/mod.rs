//! Port contracts for trellis object storage.
//!
//! Ports define infrastructure-agnostic interfaces used by object services.

pub mod repository;

pub use repository::{
    ObjectFilter, ObjectRepository, ObjectRepositoryError, ObjectRepositoryResult,
};
