//! Book loading and lookup.

pub mod docx;
pub mod store;

pub use store::{Document, Library, SearchHit, EXCERPT_CHARS, MAX_SEARCH_RESULTS, NO_TEXT_PLACEHOLDER};
