#![forbid(unsafe_code)]

mod documents;
mod indexes;
mod support;

use crate::{MAX_DOCUMENT_BYTES, StoreError};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::time::Duration;
use support::{is_identifier, now_ms};
use tracing::debug;

pub const LAYOUT_VERSION: i64 = 1;

const REQUIRED_TABLES: [&str; 4] = ["store_state", "collections", "documents", "store_indexes"];

/// Embedded JSON document store: every collection lives in one SQLite file
/// (`<storage_dir>/<db>.db`).
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
    db_name: String,
    max_document_bytes: usize,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>, db_name: &str) -> Result<Self, StoreError> {
        Self::open_with_limit(storage_dir, db_name, MAX_DOCUMENT_BYTES)
    }

    pub fn open_with_limit(
        storage_dir: impl AsRef<Path>,
        db_name: &str,
        max_document_bytes: usize,
    ) -> Result<Self, StoreError> {
        if !is_db_name(db_name) {
            return Err(StoreError::InvalidInput("invalid database name"));
        }
        if max_document_bytes == 0 {
            return Err(StoreError::InvalidInput("document size limit must be positive"));
        }

        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(format!("{db_name}.db"));
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        install_schema(&conn)?;
        debug!(db = db_name, dir = %storage_dir.display(), "document store opened");

        Ok(Self {
            conn,
            storage_dir,
            db_name: db_name.to_string(),
            max_document_bytes,
        })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join(format!("{}.db", self.db_name))
    }
}

fn is_db_name(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-'))
}

/// Lays out an empty database, or accepts an existing one only when it holds
/// exactly the current layout.
fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    let tables = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")?
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    if tables.is_empty() {
        return create_layout(conn);
    }
    if let Some(reason) = layout_mismatch(&tables) {
        return Err(StoreError::InvalidInput(reason));
    }

    let version = conn
        .query_row(
            "SELECT layout_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    match version {
        Some(LAYOUT_VERSION) => Ok(()),
        Some(_) => Err(StoreError::InvalidInput("RESET_REQUIRED: layout version mismatch")),
        None => Err(StoreError::InvalidInput("RESET_REQUIRED: store state row is missing")),
    }
}

fn layout_mismatch(tables: &[String]) -> Option<&'static str> {
    if tables
        .iter()
        .any(|table| !REQUIRED_TABLES.contains(&table.as_str()))
    {
        return Some("RESET_REQUIRED: unsupported tables detected");
    }
    REQUIRED_TABLES
        .iter()
        .any(|required| !tables.iter().any(|table| table == required))
        .then_some("RESET_REQUIRED: required table is missing")
}

fn create_layout(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          layout_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS collections (
          name TEXT PRIMARY KEY,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS documents (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          collection TEXT NOT NULL,
          body TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          FOREIGN KEY(collection) REFERENCES collections(name) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, id);

        CREATE TABLE IF NOT EXISTS store_indexes (
          collection TEXT NOT NULL,
          name TEXT NOT NULL,
          paths_json TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          PRIMARY KEY(collection, name)
        );
        "#,
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO store_state(singleton, layout_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2)",
        params![LAYOUT_VERSION, now_ms()],
    )?;
    debug!(version = LAYOUT_VERSION, "store layout created");
    Ok(())
}

fn check_collection(collection: &str) -> Result<(), StoreError> {
    if is_identifier(collection) {
        Ok(())
    } else {
        Err(StoreError::InvalidInput("invalid collection name"))
    }
}
