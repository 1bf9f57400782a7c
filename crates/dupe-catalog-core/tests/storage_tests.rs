use dupe_catalog_core::storage::{CatalogEntry, CatalogWrite, Database, SCHEMA_VERSION};
use dupe_catalog_core::MediaClass;
use tempfile::tempdir;

fn make_test_entry(path: &str, hash: &str, size: i64, created: &str) -> CatalogEntry {
    CatalogEntry {
        id: 0,
        path: path.to_string(),
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        content_hash: hash.to_string(),
        size_bytes: size,
        created_at: created.to_string(),
        extension: ".jpg".to_string(),
        media_class: MediaClass::Image,
        is_corrupted: false,
        is_deleted: false,
        is_ignored: false,
    }
}

#[test]
fn test_upsert_inserts_then_updates_in_place() {
    let db = Database::open_in_memory().unwrap();
    let entry = make_test_entry("/p/a.jpg", "h1", 100, "2020-01-01 00:00:00");
    db.upsert_entry(&entry).unwrap();
    let first = db.get_entry("/p/a.jpg").unwrap().unwrap();

    let mut changed = entry.clone();
    changed.content_hash = "h2".to_string();
    changed.size_bytes = 250;
    changed.is_corrupted = true;
    db.upsert_entry(&changed).unwrap();

    let second = db.get_entry("/p/a.jpg").unwrap().unwrap();
    assert_eq!(second.id, first.id, "path is the natural key");
    assert_eq!(second.content_hash, "h2");
    assert_eq!(second.size_bytes, 250);
    assert!(second.is_corrupted);
    assert_eq!(db.count_entries().unwrap(), 1);
}

#[test]
fn test_upsert_is_idempotent() {
    let db = Database::open_in_memory().unwrap();
    let entry = make_test_entry("/p/a.jpg", "h1", 100, "2020-01-01 00:00:00");
    db.upsert_entry(&entry).unwrap();
    db.upsert_entry(&entry).unwrap();
    assert_eq!(db.count_entries().unwrap(), 1);
    let stored = db.get_entry("/p/a.jpg").unwrap().unwrap();
    assert_eq!(stored.content_hash, entry.content_hash);
    assert_eq!(stored.name, "a.jpg");
}

#[test]
fn test_upsert_leaves_soft_flags_alone() {
    let db = Database::open_in_memory().unwrap();
    let entry = make_test_entry("/p/a.jpg", "h1", 100, "2020-01-01 00:00:00");
    db.upsert_entry(&entry).unwrap();
    assert!(db.set_deleted("/p/a.jpg").unwrap());
    assert_eq!(db.toggle_ignored("/p/a.jpg").unwrap(), Some(true));

    db.upsert_entry(&make_test_entry("/p/a.jpg", "h9", 120, "2020-01-01 00:00:00"))
        .unwrap();
    let stored = db.get_entry("/p/a.jpg").unwrap().unwrap();
    assert!(stored.is_deleted, "deleted is never cleared automatically");
    assert!(stored.is_ignored);
}

#[test]
fn test_apply_writes_mixes_upserts_and_deletes() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_entry(&make_test_entry("/p/old.jpg", "h0", 1, "2020-01-01 00:00:00"))
        .unwrap();

    let writes = vec![
        CatalogWrite::Upsert(make_test_entry("/p/a.jpg", "h1", 10, "2020-01-01 00:00:00")),
        CatalogWrite::Upsert(make_test_entry("/p/b.jpg", "h2", 20, "2020-01-01 00:00:00")),
        CatalogWrite::Delete("/p/old.jpg".to_string()),
    ];
    let written = db.apply_writes(&writes).unwrap();
    assert_eq!(written, 3);

    let paths = db.all_paths().unwrap();
    assert_eq!(paths.len(), 2);
    assert!(paths.contains("/p/a.jpg"));
    assert!(paths.contains("/p/b.jpg"));
    assert!(!paths.contains("/p/old.jpg"));
}

#[test]
fn test_delete_by_path() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_entry(&make_test_entry("/p/a.jpg", "h1", 10, "2020-01-01 00:00:00"))
        .unwrap();
    assert!(db.delete_by_path("/p/a.jpg").unwrap());
    assert!(!db.delete_by_path("/p/a.jpg").unwrap());
    assert!(db.get_entry("/p/a.jpg").unwrap().is_none());
}

#[test]
fn test_soft_flags_on_missing_path_are_noops() {
    let db = Database::open_in_memory().unwrap();
    assert!(!db.set_deleted("/nowhere.jpg").unwrap());
    assert_eq!(db.toggle_ignored("/nowhere.jpg").unwrap(), None);
    assert_eq!(db.count_entries().unwrap(), 0);
}

#[test]
fn test_toggle_ignored_twice_restores_state() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_entry(&make_test_entry("/p/a.jpg", "h1", 10, "2020-01-01 00:00:00"))
        .unwrap();
    assert_eq!(db.toggle_ignored("/p/a.jpg").unwrap(), Some(true));
    assert_eq!(db.toggle_ignored("/p/a.jpg").unwrap(), Some(false));
    let stored = db.get_entry("/p/a.jpg").unwrap().unwrap();
    assert!(!stored.is_ignored);
    assert!(!stored.is_deleted, "ignored and deleted are independent");
}

#[test]
fn test_aggregate_deleted() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_entry(&make_test_entry("/s/a.jpg", "h1", 500, "2020-01-01 00:00:00"))
        .unwrap();
    db.upsert_entry(&make_test_entry("/s/b.jpg", "h2", 300, "2020-01-01 00:00:00"))
        .unwrap();
    db.upsert_entry(&make_test_entry("/s/c.jpg", "h3", 7, "2020-01-01 00:00:00"))
        .unwrap();

    let empty = db.aggregate_deleted().unwrap();
    assert_eq!(empty.deleted_count, 0);
    assert_eq!(empty.deleted_bytes_total, 0);

    db.set_deleted("/s/a.jpg").unwrap();
    db.set_deleted("/s/b.jpg").unwrap();
    db.set_deleted("/s/b.jpg").unwrap();

    let stats = db.aggregate_deleted().unwrap();
    assert_eq!(stats.deleted_count, 2);
    assert_eq!(stats.deleted_bytes_total, 800);
    assert_eq!(db.count_entries().unwrap(), 3, "soft-deleted rows are retained");
}

#[test]
fn test_query_corrupted_respects_classes() {
    let db = Database::open_in_memory().unwrap();
    let mut bad_image = make_test_entry("/c/bad.jpg", "h1", 10, "2020-01-01 00:00:00");
    bad_image.is_corrupted = true;
    let good_image = make_test_entry("/c/good.jpg", "h1", 10, "2020-01-01 00:00:00");
    db.upsert_entry(&bad_image).unwrap();
    db.upsert_entry(&good_image).unwrap();

    let images = db.query_corrupted(&[MediaClass::Image]).unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].path, "/c/bad.jpg");

    assert!(db.query_corrupted(&[MediaClass::Video]).unwrap().is_empty());
    assert!(db.query_corrupted(&[]).unwrap().is_empty());
}

#[test]
fn test_indexed_states() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_entry(&make_test_entry("/i/a.jpg", "h1", 42, "2021-05-06 07:08:09"))
        .unwrap();
    let states = db.indexed_states().unwrap();
    let state = states.get("/i/a.jpg").unwrap();
    assert_eq!(state.size_bytes, 42);
    assert_eq!(state.created_at, "2021-05-06 07:08:09");
}

#[test]
fn test_truncate_all() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_entry(&make_test_entry("/t/a.jpg", "h1", 10, "2020-01-01 00:00:00"))
        .unwrap();
    db.set_deleted("/t/a.jpg").unwrap();
    assert_eq!(db.truncate_all().unwrap(), 1);
    assert_eq!(db.count_entries().unwrap(), 0);
    assert_eq!(db.aggregate_deleted().unwrap().deleted_count, 0);
}

#[test]
fn test_grouping_index_exists() {
    let db = Database::open_in_memory().unwrap();
    let count: i64 = db
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'index' AND name = 'idx_catalog_entry_hash_size_created'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_legacy_store_gains_ignored_column() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("legacy.db");
    let db_path_str = db_path.to_str().unwrap();

    {
        let conn = rusqlite::Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TABLE catalog_entry (
                 id            INTEGER PRIMARY KEY,
                 path          TEXT    NOT NULL UNIQUE,
                 name          TEXT    NOT NULL,
                 content_hash  TEXT    NOT NULL,
                 size_bytes    INTEGER NOT NULL,
                 created_at    TEXT    NOT NULL,
                 extension     TEXT    NOT NULL,
                 media_class   TEXT    NOT NULL,
                 is_corrupted  INTEGER NOT NULL DEFAULT 0,
                 is_deleted    INTEGER NOT NULL DEFAULT 0
             );
             INSERT INTO catalog_entry
                 (path, name, content_hash, size_bytes, created_at, extension, media_class, is_deleted)
             VALUES ('/old/a.jpg', 'a.jpg', 'abc', 99, '2019-01-01 10:00:00', '.jpg', 'image', 1);
             PRAGMA user_version = 1;",
        )
        .unwrap();
    }

    let db = Database::open(db_path_str).unwrap();
    let entry = db.get_entry("/old/a.jpg").unwrap().unwrap();
    assert_eq!(entry.content_hash, "abc");
    assert_eq!(entry.size_bytes, 99);
    assert!(entry.is_deleted);
    assert!(!entry.is_ignored);

    let version: i64 = db
        .connection()
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
    drop(db);

    // Opening again must not try to add the column a second time.
    let db = Database::open(db_path_str).unwrap();
    assert_eq!(db.toggle_ignored("/old/a.jpg").unwrap(), Some(true));
    assert_eq!(db.count_entries().unwrap(), 1);
}
