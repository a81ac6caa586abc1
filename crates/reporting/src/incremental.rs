#![forbid(unsafe_code)]

use crate::{ANALYSIS, ReportError};
use rp_core::Node;
use rp_storage::{DocumentId, DocumentStore, StoreError};
use tracing::{error, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IncrementalOutcome {
    Saved {
        id: DocumentId,
        /// Sections the store refused; the rest of the report is stored.
        skipped: Vec<String>,
    },
    MissingInfo,
}

/// Stores `info` first, then every other top-level section as its own
/// update. Sections the store rejects for encoding or size are skipped.
pub fn save_incrementally(
    store: &mut dyn DocumentStore,
    report: &Node,
) -> Result<IncrementalOutcome, ReportError> {
    let Some(sections) = report.as_map() else {
        return Err(ReportError::InvalidReport("report must be a map".to_string()));
    };
    let keys: Vec<String> = sections.keys().map(ToString::to_string).collect();
    let Some(info) = report.get("info") else {
        error!("Missing 'info' key: {keys:?}");
        return Ok(IncrementalOutcome::MissingInfo);
    };

    let head = Node::from_entries([("info", info.clone())]);
    let id = store.insert_one(ANALYSIS, &head)?;

    let mut skipped = Vec::new();
    for (key, value) in sections {
        let key = key.to_string();
        if key == "info" || key == "_id" {
            continue;
        }
        match store.set_field(ANALYSIS, id, &key, value) {
            Ok(()) => {}
            Err(err @ (StoreError::InvalidDocument(_) | StoreError::DocumentTooLarge { .. })) => {
                warn!("Investigate your key: {key} ({err})");
                skipped.push(key);
            }
            Err(other) => return Err(other.into()),
        }
    }
    Ok(IncrementalOutcome::Saved { id, skipped })
}
