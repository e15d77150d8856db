//! Note use-case service.
//!
//! Validates input before it reaches the storage backend and otherwise
//! delegates. Holds no cached notes: every call crosses into the backend.

use std::sync::Arc;

use notable_core::{Note, NoteId, SearchQuery, SearchResults};
use notable_store::{Backend, Engine, StoreError};

/// Service error for note use-cases.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request carried unusable input (empty content, bad uid).
    #[error("invalid note: {0}")]
    InvalidNote(String),

    /// Storage-layer failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Note service facade over a storage backend.
#[derive(Debug, Clone)]
pub struct NoteService {
    backend: Arc<dyn Backend>,
}

impl NoteService {
    /// Creates a service over `backend`.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Which engine backs this service.
    pub fn engine(&self) -> Engine {
        self.backend.engine()
    }

    /// Creates a note, letting the backend assign the uid unless `uid` is given.
    pub fn create(&self, content: &str, uid: Option<&str>) -> ServiceResult<NoteId> {
        let content = normalize_content(content)?;
        let uid = uid.map(parse_uid).transpose()?;
        let created = match uid {
            Some(uid) => self.backend.create_with_uid(uid, &content)?,
            None => self.backend.create(&content)?,
        };
        Ok(created)
    }

    /// Gets one note by uid.
    pub fn read(&self, uid: &str) -> ServiceResult<Note> {
        let uid = parse_uid(uid)?;
        Ok(self.backend.read(uid)?)
    }

    /// Replaces a note's content.
    pub fn update(&self, uid: &str, content: &str) -> ServiceResult<()> {
        let uid = parse_uid(uid)?;
        let content = normalize_content(content)?;
        Ok(self.backend.update(uid, &content)?)
    }

    /// Deletes a note.
    pub fn delete(&self, uid: &str) -> ServiceResult<()> {
        let uid = parse_uid(uid)?;
        Ok(self.backend.delete(uid)?)
    }

    /// Searches note content. An empty query lists every note.
    pub fn search(&self, query: &str) -> ServiceResult<SearchResults> {
        Ok(self.backend.search(&SearchQuery::new(query.trim()))?)
    }

    /// Number of stored notes.
    pub fn count(&self) -> ServiceResult<u64> {
        Ok(self.backend.count()?)
    }

    /// Closes the underlying backend.
    pub fn close(&self) -> ServiceResult<()> {
        Ok(self.backend.close()?)
    }
}

/// Parses a uid path segment, rejecting empty and malformed values.
pub fn parse_uid(raw: &str) -> ServiceResult<NoteId> {
    raw.parse()
        .map_err(|e: notable_core::NoteIdParseError| ServiceError::InvalidNote(e.to_string()))
}

/// Normalizes line endings and rejects blank content.
pub fn normalize_content(content: &str) -> ServiceResult<String> {
    if content.trim().is_empty() {
        return Err(ServiceError::InvalidNote(
            "content must not be empty".to_string(),
        ));
    }
    Ok(content.replace("\r\n", "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notable_store::SqliteBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that counts calls and refuses to do anything else.
    #[derive(Debug, Default)]
    struct Untouchable {
        calls: AtomicUsize,
    }

    impl Untouchable {
        fn hit<T>(&self) -> notable_store::StoreResult<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Closed)
        }
    }

    impl Backend for Untouchable {
        fn engine(&self) -> Engine {
            Engine::Sqlite
        }
        fn create_with_uid(&self, _: NoteId, _: &str) -> notable_store::StoreResult<NoteId> {
            self.hit()
        }
        fn read(&self, _: NoteId) -> notable_store::StoreResult<Note> {
            self.hit()
        }
        fn update(&self, _: NoteId, _: &str) -> notable_store::StoreResult<()> {
            self.hit()
        }
        fn delete(&self, _: NoteId) -> notable_store::StoreResult<()> {
            self.hit()
        }
        fn search(&self, _: &SearchQuery) -> notable_store::StoreResult<SearchResults> {
            self.hit()
        }
        fn count(&self) -> notable_store::StoreResult<u64> {
            self.hit()
        }
        fn close(&self) -> notable_store::StoreResult<()> {
            Ok(())
        }
    }

    fn sqlite_service() -> NoteService {
        NoteService::new(Arc::new(SqliteBackend::open_in_memory().unwrap()))
    }

    #[test]
    fn invalid_input_never_reaches_backend() {
        let backend = Arc::new(Untouchable::default());
        let service = NoteService::new(backend.clone());

        assert!(matches!(service.create("", None), Err(ServiceError::InvalidNote(_))));
        assert!(matches!(service.create(" \n\t", None), Err(ServiceError::InvalidNote(_))));
        assert!(matches!(service.create("ok", Some("nope")), Err(ServiceError::InvalidNote(_))));
        assert!(matches!(service.read(""), Err(ServiceError::InvalidNote(_))));
        assert!(matches!(service.read("12345"), Err(ServiceError::InvalidNote(_))));
        assert!(matches!(service.update("bad", "text"), Err(ServiceError::InvalidNote(_))));
        assert!(matches!(
            service.update(&NoteId::new().to_string(), "   "),
            Err(ServiceError::InvalidNote(_))
        ));
        assert!(matches!(service.delete(" "), Err(ServiceError::InvalidNote(_))));

        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn store_errors_pass_through() {
        let service = sqlite_service();
        let uid = NoteId::new().to_string();
        assert!(matches!(
            service.read(&uid),
            Err(ServiceError::Store(StoreError::NotFound(_)))
        ));
    }

    #[test]
    fn crlf_is_normalized() {
        let service = sqlite_service();
        let uid = service.create("line one\r\nline two", None).unwrap();
        let note = service.read(&uid.to_string()).unwrap();
        assert_eq!(note.content, "line one\nline two");
    }

    #[test]
    fn caller_supplied_uid_is_kept() {
        let service = sqlite_service();
        let wanted = NoteId::new();
        let uid = service.create("mine", Some(&wanted.to_string())).unwrap();
        assert_eq!(uid, wanted);
    }

    #[test]
    fn uppercase_uid_addresses_same_note() {
        let service = sqlite_service();
        let uid = service.create("case test", None).unwrap();
        let upper = uid.to_string().to_uppercase();
        assert_eq!(service.read(&upper).unwrap().uid, uid);
    }

    #[test]
    fn search_trims_query() {
        let service = sqlite_service();
        let milk = service.create("buy milk", None).unwrap();
        service.create("buy eggs", None).unwrap();
        assert_eq!(service.search("  milk  ").unwrap().uids(), vec![milk]);
        assert_eq!(service.search("").unwrap().len(), 2);
    }
}
