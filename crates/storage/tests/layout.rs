#![forbid(unsafe_code)]

use rp_core::Node;
use rp_storage::{DocumentStore, LAYOUT_VERSION, SqliteStore};
use rusqlite::Connection;
use serde_json::json;
use tempfile::TempDir;

#[test]
fn open_creates_database_file_and_reopens_cleanly() {
    let dir = TempDir::new().expect("temp dir");
    let nested = dir.path().join("storage").join("reporting");

    let store = SqliteStore::open(&nested, "reports").expect("open store");
    assert_eq!(store.db_name(), "reports");
    assert_eq!(store.storage_dir(), nested.as_path());
    assert!(store.db_path().exists());
    assert!(store.list_collections().expect("collections").is_empty());
    drop(store);

    let store = SqliteStore::open(&nested, "reports").expect("reopen store");
    assert_eq!(store.max_document_bytes(), rp_storage::MAX_DOCUMENT_BYTES);

    let conn = Connection::open(nested.join("reports.db")).expect("open sqlite db");
    let version: i64 = conn
        .query_row(
            "SELECT layout_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get(0),
        )
        .expect("layout version");
    assert_eq!(version, LAYOUT_VERSION);
}

#[test]
fn unknown_tables_require_reset() {
    let dir = TempDir::new().expect("temp dir");
    let conn = Connection::open(dir.path().join("reports.db")).expect("open sqlite db");
    conn.execute_batch("CREATE TABLE workspaces(workspace TEXT PRIMARY KEY);")
        .expect("seed foreign schema");
    drop(conn);

    let err = SqliteStore::open(dir.path(), "reports").expect_err("must refuse");
    assert_eq!(err.code(), "RESET_REQUIRED");
}

#[test]
fn layout_version_mismatch_requires_reset() {
    let dir = TempDir::new().expect("temp dir");
    drop(SqliteStore::open(dir.path(), "reports").expect("open store"));

    let conn = Connection::open(dir.path().join("reports.db")).expect("open sqlite db");
    conn.execute("UPDATE store_state SET layout_version=99 WHERE singleton=1", [])
        .expect("bump version");
    drop(conn);

    let err = SqliteStore::open(dir.path(), "reports").expect_err("must refuse");
    assert_eq!(err.code(), "RESET_REQUIRED");
}

#[test]
fn partial_layouts_require_reset() {
    let dir = TempDir::new().expect("temp dir");
    drop(SqliteStore::open(dir.path(), "reports").expect("open store"));
    let conn = Connection::open(dir.path().join("reports.db")).expect("open sqlite db");
    conn.execute("DELETE FROM store_state", []).expect("clear state");
    drop(conn);
    let err = SqliteStore::open(dir.path(), "reports").expect_err("missing state row");
    assert_eq!(err.code(), "RESET_REQUIRED");

    let dir = TempDir::new().expect("temp dir");
    drop(SqliteStore::open(dir.path(), "reports").expect("open store"));
    let conn = Connection::open(dir.path().join("reports.db")).expect("open sqlite db");
    conn.execute_batch("DROP TABLE store_indexes;").expect("drop table");
    drop(conn);
    let err = SqliteStore::open(dir.path(), "reports").expect_err("missing table");
    assert_eq!(err.code(), "RESET_REQUIRED");
}

#[test]
fn databases_are_isolated_by_name() {
    let dir = TempDir::new().expect("temp dir");
    let mut reports = SqliteStore::open(dir.path(), "reports").expect("open reports");
    reports
        .insert_one("analysis", &Node::from(json!({"info": {"id": 1}})))
        .expect("insert");

    let other = SqliteStore::open(dir.path(), "staging").expect("open staging");
    assert_eq!(other.count("analysis").expect("count"), 0);
    assert_eq!(
        reports.list_collections().expect("collections"),
        vec!["analysis".to_string()]
    );
}

#[test]
fn invalid_open_arguments_are_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let err = SqliteStore::open(dir.path(), "../escape").expect_err("bad db name");
    assert_eq!(err.code(), "INVALID_INPUT");
    let err = SqliteStore::open(dir.path(), "").expect_err("empty db name");
    assert_eq!(err.code(), "INVALID_INPUT");
    let err = SqliteStore::open_with_limit(dir.path(), "reports", 0).expect_err("zero limit");
    assert_eq!(err.code(), "INVALID_INPUT");
}
