//! Relational engine backed by a single SQLite file.
//!
//! Notes live in the `notes` table keyed by their uid text; deleted uids are
//! kept in `tombstones`; `meta.revision` holds the modification counter.
//! Every mutation runs in an `IMMEDIATE` transaction on the one connection,
//! which the backend guards with a mutex.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use notable_core::{Note, NoteId, SearchQuery, SearchResults, now_millis};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};

use crate::backend::Backend;
use crate::error::{StoreError, StoreResult};
use crate::models::millis_to_datetime;
use crate::schema;
use crate::store::Engine;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite implementation of [`Backend`].
pub struct SqliteBackend {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl SqliteBackend {
    /// Open (or create) a SQLite store at `path` and apply migrations.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(|e| StoreError::Open {
            engine: Engine::Sqlite.as_str(),
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::bootstrap(conn, path.to_path_buf())
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open {
            engine: Engine::Sqlite.as_str(),
            path: PathBuf::from(":memory:"),
            message: e.to_string(),
        })?;
        Self::bootstrap(conn, PathBuf::from(":memory:"))
    }

    fn bootstrap(mut conn: Connection, path: PathBuf) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(|e| StoreError::Open {
            engine: Engine::Sqlite.as_str(),
            path: path.clone(),
            message: e.to_string(),
        })?;
        schema::run_migrations(&mut conn)?;

        tracing::debug!(path = %path.display(), "SQLite store opened");

        Ok(Self {
            path,
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Run `f` against the open connection, or fail with `Closed`.
    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(conn) => f(conn),
            None => Err(StoreError::Closed),
        }
    }
}

fn read_err(e: rusqlite::Error) -> StoreError {
    StoreError::StorageRead(e.to_string())
}

fn write_err(e: rusqlite::Error) -> StoreError {
    StoreError::StorageWrite(e.to_string())
}

fn begin(conn: &mut Connection) -> StoreResult<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(write_err)
}

/// Bump and return the modification counter inside `tx`.
fn next_revision(tx: &Transaction<'_>) -> StoreResult<i64> {
    tx.query_row(
        "UPDATE meta SET value = value + 1 WHERE key = 'revision' RETURNING value;",
        [],
        |row| row.get(0),
    )
    .map_err(write_err)
}

/// Raw `notes` row before conversion into the domain type.
struct NoteRow {
    uid: String,
    content: String,
    created_at: i64,
    updated_at: i64,
    revision: i64,
}

impl NoteRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            uid: row.get("uid")?,
            content: row.get("content")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            revision: row.get("revision")?,
        })
    }

    fn into_note(self) -> StoreResult<Note> {
        let uid: NoteId = self
            .uid
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("notes.uid: {e}")))?;
        let revision = u64::try_from(self.revision)
            .map_err(|_| StoreError::Corrupt(format!("note {uid}: negative revision")))?;
        Ok(Note {
            uid,
            content: self.content,
            created_at: millis_to_datetime(uid, self.created_at)?,
            updated_at: millis_to_datetime(uid, self.updated_at)?,
            revision,
        })
    }
}

impl Backend for SqliteBackend {
    fn engine(&self) -> Engine {
        Engine::Sqlite
    }

    fn create_with_uid(&self, uid: NoteId, content: &str) -> StoreResult<NoteId> {
        self.with_conn(|conn| {
            let tx = begin(conn)?;
            let uid_text = uid.to_string();

            let taken: bool = tx
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM notes WHERE uid = ?1)
                         OR EXISTS(SELECT 1 FROM tombstones WHERE uid = ?1);",
                    [uid_text.as_str()],
                    |row| row.get(0),
                )
                .map_err(read_err)?;
            if taken {
                return Err(StoreError::UidConflict(uid));
            }

            let revision = next_revision(&tx)?;
            let now = now_millis().timestamp_millis();
            tx.execute(
                "INSERT INTO notes (uid, content, created_at, updated_at, revision)
                 VALUES (?1, ?2, ?3, ?3, ?4);",
                params![uid_text, content, now, revision],
            )
            .map_err(write_err)?;
            tx.commit().map_err(write_err)?;

            tracing::debug!(%uid, revision, "note created");
            Ok(uid)
        })
    }

    fn read(&self, uid: NoteId) -> StoreResult<Note> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT uid, content, created_at, updated_at, revision
                 FROM notes WHERE uid = ?1;",
                [uid.to_string()],
                NoteRow::from_row,
            )
            .optional()
            .map_err(read_err)?
            .ok_or(StoreError::NotFound(uid))?
            .into_note()
        })
    }

    fn update(&self, uid: NoteId, content: &str) -> StoreResult<()> {
        self.with_conn(|conn| {
            let tx = begin(conn)?;
            let revision = next_revision(&tx)?;
            let changed = tx
                .execute(
                    "UPDATE notes SET content = ?2, updated_at = ?3, revision = ?4
                     WHERE uid = ?1;",
                    params![uid.to_string(), content, now_millis().timestamp_millis(), revision],
                )
                .map_err(write_err)?;

            // Dropping the transaction rolls back the counter bump.
            if changed == 0 {
                return Err(StoreError::NotFound(uid));
            }
            tx.commit().map_err(write_err)?;

            tracing::debug!(%uid, revision, "note updated");
            Ok(())
        })
    }

    fn delete(&self, uid: NoteId) -> StoreResult<()> {
        self.with_conn(|conn| {
            let tx = begin(conn)?;
            let uid_text = uid.to_string();
            let changed = tx
                .execute("DELETE FROM notes WHERE uid = ?1;", [uid_text.as_str()])
                .map_err(write_err)?;
            if changed == 0 {
                return Err(StoreError::NotFound(uid));
            }
            tx.execute(
                "INSERT OR REPLACE INTO tombstones (uid, deleted_at) VALUES (?1, ?2);",
                params![uid_text, now_millis().timestamp_millis()],
            )
            .map_err(write_err)?;
            tx.commit().map_err(write_err)?;

            tracing::debug!(%uid, "note deleted");
            Ok(())
        })
    }

    fn search(&self, query: &SearchQuery) -> StoreResult<SearchResults> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT uid, content, created_at, updated_at, revision
                     FROM notes
                     ORDER BY revision DESC, uid ASC;",
                )
                .map_err(read_err)?;
            let rows = stmt
                .query_map([], NoteRow::from_row)
                .map_err(read_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(read_err)?;

            let notes = rows
                .into_iter()
                .map(NoteRow::into_note)
                .collect::<StoreResult<Vec<_>>>()?;
            Ok(SearchResults::collect(query, notes))
        })
    }

    fn count(&self) -> StoreResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))
                .map_err(read_err)?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
    }

    fn close(&self) -> StoreResult<()> {
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(conn) = guard.take() else {
            return Ok(());
        };
        conn.close().map_err(|(_, e)| write_err(e))?;
        tracing::info!(path = %self.path.display(), "SQLite store closed");
        Ok(())
    }
}

impl fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = self
            .conn
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false);
        f.debug_struct("SqliteBackend")
            .field("path", &self.path)
            .field("open", &open)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_update_does_not_consume_revision() {
        let backend = SqliteBackend::open_in_memory().unwrap();
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
    fn test_uid_stored_in_canonical_form() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let uid = backend.create("body").unwrap();
        let stored: String = backend
            .with_conn(|conn| {
                conn.query_row("SELECT uid FROM notes;", [], |row| row.get(0))
                    .map_err(read_err)
            })
            .unwrap();
        assert_eq!(stored, uid.to_string());
    }

    #[test]
    fn test_reopen_keeps_notes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.sqlite");

        let uid = {
            let backend = SqliteBackend::open(&path).unwrap();
            let uid = backend.create("persisted").unwrap();
            backend.close().unwrap();
            uid
        };

        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(backend.read(uid).unwrap().content, "persisted");
        assert_eq!(backend.count().unwrap(), 1);
    }
}
