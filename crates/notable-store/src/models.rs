//! Persisted record shapes.
//!
//! These types map directly to what the engines write. They are separate
//! from the domain types in notable-core so the on-disk layout can evolve
//! without touching callers.

use chrono::{DateTime, Utc};
use notable_core::{Note, NoteId};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Value stored under a note's key in the key-value engine.
///
/// Timestamps are epoch milliseconds, matching the relational engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub content: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub revision: u64,
}

impl NoteRecord {
    /// A record for a freshly created note.
    pub fn new(content: &str, now: DateTime<Utc>, revision: u64) -> Self {
        let ms = now.timestamp_millis();
        Self {
            content: content.to_string(),
            created_at_ms: ms,
            updated_at_ms: ms,
            revision,
        }
    }

    /// Replace the content, keeping the creation time.
    pub fn replace_content(&mut self, content: &str, now: DateTime<Utc>, revision: u64) {
        self.content = content.to_string();
        self.updated_at_ms = now.timestamp_millis();
        self.revision = revision;
    }

    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::StorageWrite(e.to_string()))
    }

    pub fn decode(uid: NoteId, bytes: &[u8]) -> StoreResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| StoreError::Corrupt(format!("note {uid}: {e}")))
    }

    /// Convert into the domain type.
    pub fn into_note(self, uid: NoteId) -> StoreResult<Note> {
        Ok(Note {
            uid,
            content: self.content,
            created_at: millis_to_datetime(uid, self.created_at_ms)?,
            updated_at: millis_to_datetime(uid, self.updated_at_ms)?,
            revision: self.revision,
        })
    }
}

/// Convert stored epoch milliseconds back into a timestamp.
pub fn millis_to_datetime(uid: NoteId, ms: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corrupt(format!("note {uid}: timestamp {ms} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notable_core::now_millis;

    #[test]
    fn test_replace_content_keeps_created_at() {
        let created = DateTime::from_timestamp_millis(1_000).unwrap();
        let mut record = NoteRecord::new("first", created, 1);
        let later = DateTime::from_timestamp_millis(5_000).unwrap();
        record.replace_content("second", later, 7);

        assert_eq!(record.content, "second");
        assert_eq!(record.created_at_ms, 1_000);
        assert_eq!(record.updated_at_ms, 5_000);
        assert_eq!(record.revision, 7);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = NoteRecord::decode(NoteId::new(), b"{not json").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn test_into_note_preserves_millis() {
        let now = now_millis();
        let uid = NoteId::new();
        let note = NoteRecord::new("body", now, 3).into_note(uid).unwrap();
        assert_eq!(note.uid, uid);
        assert_eq!(note.created_at, now);
        assert_eq!(note.revision, 3);
    }
}
