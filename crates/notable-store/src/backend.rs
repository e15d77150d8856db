//! The storage capability set every engine implements.

use std::fmt;

use notable_core::{Note, NoteId, SearchQuery, SearchResults};

use crate::error::{StoreError, StoreResult};
use crate::store::Engine;

/// Attempts at drawing a fresh random uid before giving up.
const MAX_UID_ATTEMPTS: usize = 8;

/// Durable note storage.
///
/// Implementations must behave identically for the same sequence of calls:
/// the same success/failure outcomes and the same search ordering. Every
/// mutation is atomic and visible to the next read from any thread.
///
/// After [`Backend::close`] every operation returns [`StoreError::Closed`].
pub trait Backend: Send + Sync + fmt::Debug {
    /// Which engine backs this instance.
    fn engine(&self) -> Engine;

    /// Persist a note under a caller-supplied uid.
    ///
    /// Fails with [`StoreError::UidConflict`] when the uid is live or was
    /// deleted earlier.
    fn create_with_uid(&self, uid: NoteId, content: &str) -> StoreResult<NoteId>;

    /// Fetch a note by uid.
    fn read(&self, uid: NoteId) -> StoreResult<Note>;

    /// Replace the content of an existing note.
    fn update(&self, uid: NoteId, content: &str) -> StoreResult<()>;

    /// Remove a note. Its uid is never handed out again.
    fn delete(&self, uid: NoteId) -> StoreResult<()>;

    /// Matching notes, most recently modified first, uid ascending on ties.
    fn search(&self, query: &SearchQuery) -> StoreResult<SearchResults>;

    /// Number of live notes.
    fn count(&self) -> StoreResult<u64>;

    /// Release engine resources. Calling it again is a no-op.
    fn close(&self) -> StoreResult<()>;

    /// Persist a note under a freshly allocated uid.
    fn create(&self, content: &str) -> StoreResult<NoteId> {
        for _ in 0..MAX_UID_ATTEMPTS {
            match self.create_with_uid(NoteId::new(), content) {
                Err(StoreError::UidConflict(uid)) => {
                    tracing::warn!(%uid, "random uid collided, drawing another");
                }
                other => return other,
            }
        }
        Err(StoreError::StorageWrite(
            "could not allocate an unused note uid".to_string(),
        ))
    }
}
