//! Trellis: a file-backed planning store with a task lifecycle engine.
//!
//! Work is tracked as a hierarchy of markdown documents (projects, epics,
//! features, and tasks) kept under a planning directory. Automated agents
//! claim open tasks whose prerequisites are satisfied, complete them, and
//! edit their bodies and activity logs in place.
//!
//! # Architecture
//!
//! Trellis follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for storage
//! - **Adapters**: Concrete implementations of ports (filesystem, memory)
//!
//! # Modules
//!
//! - [`config`]: Store configuration loaded from TOML
//! - [`object`]: Trellis objects, validation, and lifecycle services

pub mod config;
pub mod object;
