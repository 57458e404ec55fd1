//! Unit tests for the object module.
//!
//! Tests are organised by service, with shared seeding helpers in
//! [`fixtures`].

mod lifecycle_tests;
