//! Adapter implementations for the object repository port.

pub mod filesystem;
pub mod memory;

pub use filesystem::FileSystemObjectRepository;
pub use memory::InMemoryObjectRepository;
