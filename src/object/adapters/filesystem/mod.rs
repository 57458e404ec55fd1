//! Filesystem adapter storing each object as a markdown document.

mod document;
mod layout;
mod repository;

pub use document::{DocumentError, parse_document, render_document};
pub use repository::FileSystemObjectRepository;
