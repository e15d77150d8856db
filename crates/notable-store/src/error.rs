//! Error types for the storage layer.

use std::path::PathBuf;

use notable_core::NoteId;
use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Note not found.
    #[error("note not found: {0}")]
    NotFound(NoteId),

    /// The uid belongs to a live note or to one that was deleted.
    #[error("note uid already used: {0}")]
    UidConflict(NoteId),

    /// Writing to the engine failed.
    #[error("storage write failed: {0}")]
    StorageWrite(String),

    /// Reading from the engine failed.
    #[error("storage read failed: {0}")]
    StorageRead(String),

    /// A persisted record could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The backend was closed.
    #[error("backend is closed")]
    Closed,

    /// The engine could not be opened.
    #[error("failed to open {engine} store at '{path}': {message}")]
    Open {
        engine: &'static str,
        path: PathBuf,
        message: String,
    },

    /// Migration error.
    #[error("migration error: {0}")]
    MigrationError(String),
}

impl StoreError {
    /// Whether the backend should be considered unusable after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Corrupt(_) | Self::Closed)
    }
}
