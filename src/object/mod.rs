//! Trellis objects: hierarchical planning records and their task lifecycle.
//!
//! Projects contain epics, epics contain features, and features contain
//! tasks. Features and tasks may also stand alone. Tasks move through a
//! claim/complete lifecycle gated by prerequisites, and terminal objects are
//! pruned once nothing references them. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Structural checks in [`validation`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;
pub mod validation;

#[cfg(test)]
mod tests;
