//! notable-core: note types and search semantics for Notable
//!
//! This crate provides:
//! - [`NoteId`] and [`Note`], the persisted entity
//! - [`SearchQuery`] matching and [`SearchResults`] ordering, shared by every
//!   storage engine so results never depend on which engine is configured

pub mod search;
pub mod types;

pub use search::{SNIPPET_MAX_CHARS, SearchHit, SearchQuery, SearchResults, recency_order, snippet};
pub use types::{Note, NoteId, NoteIdParseError, now_millis};
