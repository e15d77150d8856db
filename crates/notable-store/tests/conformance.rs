//! Behavioural contract every storage engine must satisfy.
//!
//! Each check is written once against `&dyn Backend` and instantiated for
//! every engine by the `conformance!` macro below.

use std::sync::Arc;
use std::thread;

use notable_core::{NoteId, SearchQuery};
use notable_store::{Backend, Engine, StoreConfig, StoreError, open};
use tempfile::TempDir;

/// An opened backend plus the directory keeping it alive.
struct Fixture {
    backend: Arc<dyn Backend>,
    _dir: TempDir,
}

fn fixture(engine: Engine) -> Fixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let backend = open(&StoreConfig::in_dir(engine, dir.path())).expect("open backend");
    Fixture { backend, _dir: dir }
}

fn create_then_read_returns_content(b: &dyn Backend) {
    for content in ["buy milk", "  padded  ", "# Title\n\nbody\r\nwith crlf", "ünïcødé ✓"] {
        let uid = b.create(content).unwrap();
        assert_eq!(b.read(uid).unwrap().content, content);
    }
}

fn missing_uid_is_not_found(b: &dyn Backend) {
    let uid = NoteId::new();
    assert!(matches!(b.read(uid), Err(StoreError::NotFound(u)) if u == uid));
    assert!(matches!(b.update(uid, "x"), Err(StoreError::NotFound(u)) if u == uid));
    assert!(matches!(b.delete(uid), Err(StoreError::NotFound(u)) if u == uid));
}

fn deleted_uid_is_not_found(b: &dyn Backend) {
    let uid = b.create("soon gone").unwrap();
    b.delete(uid).unwrap();
    assert!(matches!(b.read(uid), Err(StoreError::NotFound(_))));
    assert!(matches!(b.update(uid, "x"), Err(StoreError::NotFound(_))));
    assert!(matches!(b.delete(uid), Err(StoreError::NotFound(_))));
}

fn deleted_uid_is_never_reissued(b: &dyn Backend) {
    let uid = b.create("first").unwrap();
    b.delete(uid).unwrap();
    assert!(matches!(
        b.create_with_uid(uid, "reuse attempt"),
        Err(StoreError::UidConflict(u)) if u == uid
    ));
    for _ in 0..50 {
        assert_ne!(b.create("next").unwrap(), uid);
    }
}

fn live_uid_conflicts(b: &dyn Backend) {
    let uid = NoteId::new();
    assert_eq!(b.create_with_uid(uid, "mine").unwrap(), uid);
    assert!(matches!(
        b.create_with_uid(uid, "theirs"),
        Err(StoreError::UidConflict(_))
    ));
    assert_eq!(b.read(uid).unwrap().content, "mine");
}

fn update_replaces_content_and_keeps_created_at(b: &dyn Backend) {
    let uid = b.create("draft").unwrap();
    let before = b.read(uid).unwrap();
    b.update(uid, "final").unwrap();
    let after = b.read(uid).unwrap();

    assert_eq!(after.content, "final");
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at >= before.updated_at);
    assert!(after.revision > before.revision);
}

fn search_orders_most_recent_first(b: &dyn Backend) {
    let u1 = b.create("buy milk").unwrap();
    let u2 = b.create("buy eggs").unwrap();

    let hits = b.search(&SearchQuery::new("buy")).unwrap();
    assert_eq!(hits.uids(), vec![u2, u1]);

    b.update(u1, "buy oat milk").unwrap();
    assert_eq!(b.search(&SearchQuery::new("buy")).unwrap().uids(), vec![u1, u2]);
    assert_eq!(b.search(&SearchQuery::new("milk")).unwrap().uids(), vec![u1]);
}

fn search_is_case_insensitive_and_tokenized(b: &dyn Backend) {
    let groceries = b.create("Groceries: MILK and bread").unwrap();
    b.create("Meeting notes").unwrap();

    assert_eq!(b.search(&SearchQuery::new("milk")).unwrap().uids(), vec![groceries]);
    assert_eq!(b.search(&SearchQuery::new("BREAD milk")).unwrap().uids(), vec![groceries]);
    assert!(b.search(&SearchQuery::new("milk meeting")).unwrap().is_empty());
}

fn empty_query_lists_everything(b: &dyn Backend) {
    let a = b.create("alpha").unwrap();
    let c = b.create("gamma").unwrap();
    let hits = b.search(&SearchQuery::all()).unwrap();
    assert_eq!(hits.uids(), vec![c, a]);
    assert_eq!(b.count().unwrap(), 2);
}

fn search_is_stable_across_calls(b: &dyn Backend) {
    for i in 0..20 {
        b.create(&format!("note number {i}")).unwrap();
    }
    let query = SearchQuery::new("note");
    let first = b.search(&query).unwrap();
    let second = b.search(&query).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 20);
}

fn search_snippet_is_derived(b: &dyn Backend) {
    let uid = b.create("\n# Shopping\n- milk").unwrap();
    let hits = b.search(&SearchQuery::new("milk")).unwrap();
    let hit = hits.iter().next().unwrap();
    assert_eq!(hit.uid, uid);
    assert_eq!(hit.snippet, "Shopping");
}

fn deleted_notes_leave_search(b: &dyn Backend) {
    let keep = b.create("keep me").unwrap();
    let gone = b.create("drop me").unwrap();
    b.delete(gone).unwrap();
    assert_eq!(b.search(&SearchQuery::new("me")).unwrap().uids(), vec![keep]);
}

fn closed_backend_rejects_operations(b: &dyn Backend) {
    let uid = b.create("before close").unwrap();
    b.close().unwrap();
    b.close().unwrap();

    assert!(matches!(b.create("after"), Err(StoreError::Closed)));
    assert!(matches!(b.create_with_uid(NoteId::new(), "after"), Err(StoreError::Closed)));
    assert!(matches!(b.read(uid), Err(StoreError::Closed)));
    assert!(matches!(b.update(uid, "after"), Err(StoreError::Closed)));
    assert!(matches!(b.delete(uid), Err(StoreError::Closed)));
    assert!(matches!(b.search(&SearchQuery::all()), Err(StoreError::Closed)));
    assert!(matches!(b.count(), Err(StoreError::Closed)));
}

fn concurrent_writers_get_distinct_revisions(backend: Arc<dyn Backend>) {
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let backend = Arc::clone(&backend);
            thread::spawn(move || {
                (0..10)
                    .map(|i| backend.create(&format!("thread {t} note {i}")).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let uids: Vec<NoteId> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();

    let mut revisions: Vec<u64> = uids.iter().map(|u| backend.read(*u).unwrap().revision).collect();
    revisions.sort_unstable();
    revisions.dedup();
    assert_eq!(revisions.len(), 40);
    assert_eq!(backend.search(&SearchQuery::new("thread")).unwrap().len(), 40);
}

macro_rules! conformance {
    ($module:ident, $engine:expr) => {
        mod $module {
            use super::*;

            #[test]
            fn create_then_read() {
                create_then_read_returns_content(fixture($engine).backend.as_ref());
            }

            #[test]
            fn missing_uid() {
                missing_uid_is_not_found(fixture($engine).backend.as_ref());
            }

            #[test]
            fn deleted_uid() {
                deleted_uid_is_not_found(fixture($engine).backend.as_ref());
            }

            #[test]
            fn uid_never_reissued() {
                deleted_uid_is_never_reissued(fixture($engine).backend.as_ref());
            }

            #[test]
            fn uid_conflict() {
                live_uid_conflicts(fixture($engine).backend.as_ref());
            }

            #[test]
            fn update_replaces() {
                update_replaces_content_and_keeps_created_at(fixture($engine).backend.as_ref());
            }

            #[test]
            fn search_recency() {
                search_orders_most_recent_first(fixture($engine).backend.as_ref());
            }

            #[test]
            fn search_matching() {
                search_is_case_insensitive_and_tokenized(fixture($engine).backend.as_ref());
            }

            #[test]
            fn search_empty_query() {
                empty_query_lists_everything(fixture($engine).backend.as_ref());
            }

            #[test]
            fn search_stable() {
                search_is_stable_across_calls(fixture($engine).backend.as_ref());
            }

            #[test]
            fn search_snippet() {
                search_snippet_is_derived(fixture($engine).backend.as_ref());
            }

            #[test]
            fn search_after_delete() {
                deleted_notes_leave_search(fixture($engine).backend.as_ref());
            }

            #[test]
            fn closed() {
                closed_backend_rejects_operations(fixture($engine).backend.as_ref());
            }

            #[test]
            fn concurrent_writers() {
                let f = fixture($engine);
                concurrent_writers_get_distinct_revisions(Arc::clone(&f.backend));
            }
        }
    };
}

conformance!(redb_engine, Engine::Redb);
conformance!(sqlite_engine, Engine::Sqlite);
