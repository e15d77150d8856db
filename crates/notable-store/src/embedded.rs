//! Embedded key-value engine backed by a single redb file.
//!
//! # Tables
//! - `notes`: uid (as `u128`) -> JSON [`NoteRecord`]
//! - `tombstones`: uid (as `u128`) -> deletion time (epoch ms)
//! - `meta`: `revision` -> last assigned revision
//!
//! A uid's `u128` form orders exactly like its canonical text, so iterating
//! `notes` yields uid ascending order. Every mutation is one redb write
//! transaction; redb admits a single writer at a time, so the revision
//! counter is read-modify-written without races.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use notable_core::{Note, NoteId, SearchQuery, SearchResults, now_millis};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition, WriteTransaction};
use uuid::Uuid;

use crate::backend::Backend;
use crate::error::{StoreError, StoreResult};
use crate::models::NoteRecord;
use crate::store::Engine;

/// Live notes.
const NOTES: TableDefinition<u128, &[u8]> = TableDefinition::new("notes");
/// Uids of deleted notes.
const TOMBSTONES: TableDefinition<u128, i64> = TableDefinition::new("tombstones");
/// Engine metadata.
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const REVISION_KEY: &str = "revision";

/// redb implementation of [`Backend`].
pub struct RedbBackend {
    path: PathBuf,
    db: RwLock<Option<Database>>,
}

impl RedbBackend {
    /// Open (or create) a store file at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let open_err = |message: String| StoreError::Open {
            engine: Engine::Redb.as_str(),
            path: path.to_path_buf(),
            message,
        };

        let db = Database::create(path).map_err(|e| open_err(e.to_string()))?;

        // Read transactions cannot open tables that were never created.
        let txn = db.begin_write().map_err(|e| open_err(e.to_string()))?;
        txn.open_table(NOTES).map_err(|e| open_err(e.to_string()))?;
        txn.open_table(TOMBSTONES).map_err(|e| open_err(e.to_string()))?;
        txn.open_table(META).map_err(|e| open_err(e.to_string()))?;
        txn.commit().map_err(|e| open_err(e.to_string()))?;

        tracing::debug!(path = %path.display(), "redb store opened");

        Ok(Self {
            path: path.to_path_buf(),
            db: RwLock::new(Some(db)),
        })
    }

    /// Run `f` against the open database, or fail with `Closed`.
    fn with_db<T>(&self, f: impl FnOnce(&Database) -> StoreResult<T>) -> StoreResult<T> {
        let guard = self.db.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(db) => f(db),
            None => Err(StoreError::Closed),
        }
    }

    /// Run `f` inside a write transaction, committing only when it succeeds.
    fn write<T>(&self, f: impl FnOnce(&WriteTransaction) -> StoreResult<T>) -> StoreResult<T> {
        self.with_db(|db| {
            let txn = db.begin_write().map_err(write_err)?;
            let value = f(&txn)?;
            txn.commit().map_err(write_err)?;
            Ok(value)
        })
    }
}

fn read_err(e: impl Into<redb::Error>) -> StoreError {
    StoreError::StorageRead(e.into().to_string())
}

fn write_err(e: impl Into<redb::Error>) -> StoreError {
    StoreError::StorageWrite(e.into().to_string())
}

fn key(uid: NoteId) -> u128 {
    uid.as_uuid().as_u128()
}

/// Bump and return the modification counter inside `txn`.
fn next_revision(txn: &WriteTransaction) -> StoreResult<u64> {
    let mut meta = txn.open_table(META).map_err(write_err)?;
    let current = meta
        .get(REVISION_KEY)
        .map_err(read_err)?
        .map_or(0, |guard| guard.value());
    let next = current + 1;
    meta.insert(REVISION_KEY, next).map_err(write_err)?;
    Ok(next)
}

impl Backend for RedbBackend {
    fn engine(&self) -> Engine {
        Engine::Redb
    }

    fn create_with_uid(&self, uid: NoteId, content: &str) -> StoreResult<NoteId> {
        let revision = self.write(|txn| {
            let mut notes = txn.open_table(NOTES).map_err(write_err)?;
            let tombstones = txn.open_table(TOMBSTONES).map_err(write_err)?;

            let live = notes.get(key(uid)).map_err(read_err)?.is_some();
            let buried = tombstones.get(key(uid)).map_err(read_err)?.is_some();
            if live || buried {
                return Err(StoreError::UidConflict(uid));
            }

            let revision = next_revision(txn)?;
            let record = NoteRecord::new(content, now_millis(), revision).encode()?;
            notes
                .insert(key(uid), record.as_slice())
                .map_err(write_err)?;
            Ok(revision)
        })?;

        tracing::debug!(%uid, revision, "note created");
        Ok(uid)
    }

    fn read(&self, uid: NoteId) -> StoreResult<Note> {
        self.with_db(|db| {
            let txn = db.begin_read().map_err(read_err)?;
            let notes = txn.open_table(NOTES).map_err(read_err)?;
            let guard = notes
                .get(key(uid))
                .map_err(read_err)?
                .ok_or(StoreError::NotFound(uid))?;
            NoteRecord::decode(uid, guard.value())?.into_note(uid)
        })
    }

    fn update(&self, uid: NoteId, content: &str) -> StoreResult<()> {
        let revision = self.write(|txn| {
            let mut notes = txn.open_table(NOTES).map_err(write_err)?;
            let existing = notes
                .get(key(uid))
                .map_err(read_err)?
                .map(|guard| guard.value().to_vec())
                .ok_or(StoreError::NotFound(uid))?;

            let mut record = NoteRecord::decode(uid, &existing)?;
            let revision = next_revision(txn)?;
            record.replace_content(content, now_millis(), revision);
            notes
                .insert(key(uid), record.encode()?.as_slice())
                .map_err(write_err)?;
            Ok(revision)
        })?;

        tracing::debug!(%uid, revision, "note updated");
        Ok(())
    }

    fn delete(&self, uid: NoteId) -> StoreResult<()> {
        self.write(|txn| {
            let mut notes = txn.open_table(NOTES).map_err(write_err)?;
            // Only presence matters; the record is never decoded.
            if notes.remove(key(uid)).map_err(write_err)?.is_none() {
                return Err(StoreError::NotFound(uid));
            }
            let mut tombstones = txn.open_table(TOMBSTONES).map_err(write_err)?;
            tombstones
                .insert(key(uid), now_millis().timestamp_millis())
                .map_err(write_err)?;
            Ok(())
        })?;

        tracing::debug!(%uid, "note deleted");
        Ok(())
    }

    fn search(&self, query: &SearchQuery) -> StoreResult<SearchResults> {
        self.with_db(|db| {
            let txn = db.begin_read().map_err(read_err)?;
            let notes = txn.open_table(NOTES).map_err(read_err)?;
            let mut candidates = Vec::new();
            for item in notes.iter().map_err(read_err)? {
                let (k, v) = item.map_err(read_err)?;
                let uid = NoteId::from_uuid(Uuid::from_u128(k.value()));
                candidates.push(NoteRecord::decode(uid, v.value())?.into_note(uid)?);
            }
            Ok(SearchResults::collect(query, candidates))
        })
    }

    fn count(&self) -> StoreResult<u64> {
        self.with_db(|db| {
            let txn = db.begin_read().map_err(read_err)?;
            let notes = txn.open_table(NOTES).map_err(read_err)?;
            notes.len().map_err(read_err)
        })
    }

    fn close(&self) -> StoreResult<()> {
        let mut guard = self.db.write().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            tracing::info!(path = %self.path.display(), "redb store closed");
        }
        Ok(())
    }
}

impl fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = self
            .db
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false);
        f.debug_struct("RedbBackend")
            .field("path", &self.path)
            .field("open", &open)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_garbage(backend: &RedbBackend, uid: NoteId) {
        backend
            .write(|txn| {
                let mut notes = txn.open_table(NOTES).map_err(write_err)?;
                notes
                    .insert(key(uid), b"garbage".as_slice())
                    .map_err(write_err)?;
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_store_is_a_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");

        let backend = RedbBackend::open(&path).unwrap();
        backend.create("x").unwrap();
        backend.close().unwrap();

        assert!(path.is_file());
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_revision_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");

        let first = {
            let backend = RedbBackend::open(&path).unwrap();
            let uid = backend.create("one").unwrap();
            let revision = backend.read(uid).unwrap().revision;
            backend.close().unwrap();
            revision
        };

        let backend = RedbBackend::open(&path).unwrap();
        let uid = backend.create("two").unwrap();
        assert!(backend.read(uid).unwrap().revision > first);
    }

    #[test]
    fn test_tombstones_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");
        let uid = NoteId::new();

        {
            let backend = RedbBackend::open(&path).unwrap();
            backend.create_with_uid(uid, "short lived").unwrap();
            backend.delete(uid).unwrap();
            backend.close().unwrap();
        }

        let backend = RedbBackend::open(&path).unwrap();
        assert!(matches!(
            backend.create_with_uid(uid, "again"),
            Err(StoreError::UidConflict(found)) if found == uid
        ));
    }

    #[test]
    fn test_close_releases_file_for_second_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");

        let backend = RedbBackend::open(&path).unwrap();
        assert!(RedbBackend::open(&path).is_err());
        backend.close().unwrap();
        assert!(RedbBackend::open(&path).is_ok());
    }

    #[test]
    fn test_failed_update_does_not_consume_revision() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RedbBackend::open(&dir.path().join("notes.db")).unwrap();
        let uid = backend.create("first").unwrap();
        let before = backend.read(uid).unwrap().revision;

        assert!(matches!(
            backend.update(NoteId::new(), "nobody"),
            Err(StoreError::NotFound(_))
        ));

        let other = backend.create("second").unwrap();
        assert_eq!(backend.read(other).unwrap().revision, before + 1);
    }

    #[test]
    fn test_corrupt_record_is_reported_but_deletable() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RedbBackend::open(&dir.path().join("notes.db")).unwrap();
        let uid = NoteId::new();
        put_garbage(&backend, uid);

        assert!(matches!(backend.read(uid), Err(StoreError::Corrupt(_))));
        backend.delete(uid).unwrap();
        assert!(matches!(backend.read(uid), Err(StoreError::NotFound(_))));
        assert_eq!(backend.count().unwrap(), 0);
    }
}
