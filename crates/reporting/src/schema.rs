#![forbid(unsafe_code)]

use crate::{ReportError, SCHEMA};
use rp_core::Node;
use rp_storage::DocumentStore;
use tracing::debug;

/// Layout version of stored reports, used for data migration.
pub const SCHEMA_VERSION: &str = "1";

/// Creates the schema marker on first use, otherwise checks its version.
pub fn ensure_schema(store: &mut dyn DocumentStore) -> Result<(), ReportError> {
    let collections = store.list_collections()?;
    if collections.iter().any(|name| name == SCHEMA) {
        if let Some(marker) = store.find_one(SCHEMA)? {
            let found = marker
                .body
                .get("version")
                .and_then(|version| version.as_str())
                .unwrap_or_default();
            if found != SCHEMA_VERSION {
                return Err(ReportError::SchemaMismatch {
                    found: found.to_string(),
                    expected: SCHEMA_VERSION.to_string(),
                });
            }
            return Ok(());
        }
    }

    let marker = Node::from_entries([("version", Node::from(SCHEMA_VERSION))]);
    store.insert_one(SCHEMA, &marker)?;
    debug!(version = SCHEMA_VERSION, "schema marker created");
    Ok(())
}
