#![forbid(unsafe_code)]

use super::support::{is_identifier, json_path};
use crate::{IndexSpec, StoreError};
use rusqlite::{OptionalExtension, Transaction, params};
use tracing::debug;

pub(super) fn create_index_tx(
    tx: &Transaction<'_>,
    collection: &str,
    index: &IndexSpec,
    now_ms: i64,
) -> Result<bool, StoreError> {
    if !is_identifier(&index.name) {
        return Err(StoreError::InvalidInput("invalid index name"));
    }
    if index.paths.is_empty() {
        return Err(StoreError::InvalidInput("index must cover at least one path"));
    }

    let expressions = index
        .paths
        .iter()
        .map(|path| json_path(path).map(|json_path| format!("json_extract(body, '{json_path}')")))
        .collect::<Result<Vec<_>, _>>()?;
    let paths_json = serde_json::to_string(&index.paths)?;

    let existing = tx
        .query_row(
            "SELECT paths_json FROM store_indexes WHERE collection=?1 AND name=?2",
            params![collection, index.name],
            |row| row.get::<_, String>(0),
        )
        .optional()?;

    if let Some(existing) = existing {
        if existing == paths_json {
            return Ok(false);
        }
        return Err(StoreError::InvalidInput(
            "index already exists with different paths",
        ));
    }

    tx.execute_batch(&format!(
        "CREATE INDEX IF NOT EXISTS \"ix_{collection}_{name}\" ON documents({columns}) WHERE collection = '{collection}';",
        name = index.name,
        columns = expressions.join(", "),
    ))?;
    tx.execute(
        "INSERT INTO store_indexes(collection, name, paths_json, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
        params![collection, index.name, paths_json, now_ms],
    )?;
    debug!(collection, index = %index.name, "index created");
    Ok(true)
}
