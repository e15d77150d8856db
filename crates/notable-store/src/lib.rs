//! notable-store: storage backends for Notable
//!
//! This crate provides:
//! - the [`Backend`] trait every note operation goes through
//! - [`RedbBackend`], an embedded single-file ordered key-value engine (the default)
//! - [`SqliteBackend`], a single-file relational engine
//! - [`open`], which picks an engine from a [`StoreConfig`]
//!
//! # Usage
//!
//! ```rust,ignore
//! use notable_store::{Engine, StoreConfig, open};
//! use notable_core::SearchQuery;
//!
//! let backend = open(&StoreConfig::new(Engine::Redb, "/tmp/notes.db"))?;
//! let uid = backend.create("buy milk")?;
//! let hits = backend.search(&SearchQuery::new("milk"))?;
//! backend.close()?;
//! ```

pub mod backend;
pub mod embedded;
pub mod error;
pub mod models;
pub mod schema;
pub mod sqlite;
pub mod store;

pub use backend::Backend;
pub use embedded::RedbBackend;
pub use error::{StoreError, StoreResult};
pub use sqlite::SqliteBackend;
pub use store::{Engine, ParseEngineError, StoreConfig, open};

// Re-export notable-core for downstream crates
pub use notable_core;
