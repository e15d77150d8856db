//! Core data types for Notable.
//!
//! A note is the only persisted entity. It is addressed by a [`NoteId`] that
//! the storage backend assigns at creation and never hands out again, and it
//! carries free-form text content that is the single source of truth for
//! every derived view (snippets, search matches).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a note.
///
/// Wraps a UUID v4. The canonical text form is the lowercase hyphenated
/// rendering, which sorts the same way as the underlying bytes; both storage
/// engines rely on that when breaking ordering ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub Uuid);

impl NoteId {
    /// Creates a new random NoteId using UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a NoteId from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for NoteId {
    type Err = NoteIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(NoteIdParseError::Empty);
        }
        Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|_| NoteIdParseError::Malformed(trimmed.to_string()))
    }
}

/// Error type for parsing a NoteId from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoteIdParseError {
    /// The identifier was empty or only whitespace.
    #[error("note uid must not be empty")]
    Empty,
    /// The identifier is not a UUID.
    #[error("malformed note uid `{0}`")]
    Malformed(String),
}

// ============================================================================
// Core Domain Types
// ============================================================================

/// A persisted note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Stable identifier, immutable for the note's lifetime.
    pub uid: NoteId,

    /// Free-form text body.
    pub content: String,

    /// When the note was created (millisecond precision).
    pub created_at: DateTime<Utc>,

    /// When the content was last replaced (millisecond precision).
    pub updated_at: DateTime<Utc>,

    /// Backend-wide modification counter, bumped on create and update.
    ///
    /// Higher means more recently modified. Unlike `updated_at` it never
    /// ties between two writes to the same backend.
    pub revision: u64,
}

/// Current time truncated to millisecond precision.
///
/// Both engines persist timestamps as epoch milliseconds, so values handed
/// back to callers must not carry finer precision than what is stored.
#[must_use]
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
