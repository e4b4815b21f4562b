//! Shared utilities for the dialog crates.
//!
//! - **path**: dotted document paths with key and index segments
//! - **document**: get/set/modify/remove on JSON settings documents, plus
//!   [`DocumentPatch`] for recorded edits
//! - **scope**: JSON-Forms scope strings

pub mod document;
pub mod path;
pub mod scope;

pub use document::{
    DocumentError, DocumentPatch, array_len, get_at, get_at_mut, leaves, modify_at, remove_at,
    set_at,
};
pub use path::{DocPath, Segment};
pub use scope::Scope;
