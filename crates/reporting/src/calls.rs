#![forbid(unsafe_code)]

use crate::{ANALYSIS, CALLS, ReportError};
use rp_core::{Node, normalize_text};
use rp_storage::{DocumentId, DocumentStore, StoreError};
use serde_json::Value;
use tracing::{debug, warn};

/// Call records stored per document of the `calls` collection.
pub const CALLS_CHUNK_SIZE: usize = 100;

/// Moves inline call records of every process into the `calls` collection.
///
/// Each process's `calls` array is replaced by the ids of the chunks written
/// for it. Entries that are already ids are kept as they are. Returns the
/// ids of the chunks written by this call.
pub fn detach_calls(
    store: &mut dyn DocumentStore,
    report: &mut Node,
) -> Result<Vec<DocumentId>, ReportError> {
    let Some(behavior) = report.get_mut("behavior") else {
        return Ok(Vec::new());
    };
    if matches!(behavior, Node::Null) {
        *behavior = Node::empty_map();
        return Ok(Vec::new());
    }
    if behavior.as_map().is_none() {
        return Err(ReportError::InvalidReport(format!(
            "behavior must be a map, got {}",
            behavior.type_name()
        )));
    }
    let Some(processes) = behavior.get_mut("processes").and_then(Node::as_array_mut) else {
        return Ok(Vec::new());
    };

    let mut written = Vec::new();
    for process in processes.iter_mut() {
        let pid = process
            .get("process_id")
            .or_else(|| process.get("pid"))
            .cloned()
            .unwrap_or(Node::Null);
        let Some(calls) = process.get_mut("calls").and_then(Node::as_array_mut) else {
            continue;
        };
        if calls.iter().all(|call| matches!(call, Node::Int(_))) {
            continue;
        }

        let records = std::mem::take(calls);
        let mut ids = Vec::new();
        let mut inline = Vec::new();
        for record in records {
            match record {
                Node::Int(id) => ids.push(Node::Int(id)),
                other => inline.push(other),
            }
        }

        for chunk in inline.chunks(CALLS_CHUNK_SIZE) {
            let mut document = Node::from_entries([
                ("pid", pid.clone()),
                ("calls", Node::Array(chunk.to_vec())),
            ]);
            normalize_text(&mut document);
            match store.insert_one(CALLS, &document) {
                Ok(id) => {
                    ids.push(Node::Int(id.get()));
                    written.push(id);
                }
                Err(err @ (StoreError::DocumentTooLarge { .. } | StoreError::InvalidDocument(_))) => {
                    warn!(pid = ?pid, "call chunk skipped: {err}");
                }
                Err(err) => return Err(err.into()),
            }
        }
        *calls = ids;
    }
    Ok(written)
}

/// Deletes the chunks in `written` that the stored report `kept` no longer
/// references. With no stored report every chunk goes.
pub fn release_calls(
    store: &mut dyn DocumentStore,
    written: &[DocumentId],
    kept: Option<DocumentId>,
) -> Result<usize, ReportError> {
    if written.is_empty() {
        return Ok(0);
    }
    let referenced = match kept {
        Some(id) => store
            .get(ANALYSIS, id)?
            .map(|document| referenced_calls(&document.body))
            .unwrap_or_default(),
        None => Vec::new(),
    };
    let orphaned: Vec<DocumentId> = written
        .iter()
        .copied()
        .filter(|id| !referenced.contains(id))
        .collect();
    if orphaned.is_empty() {
        return Ok(0);
    }
    let removed = store.delete_many(CALLS, &orphaned)?;
    debug!(removed, "released unreferenced call chunks");
    Ok(removed)
}

/// Call chunk ids referenced by the processes of a stored report.
pub(crate) fn referenced_calls(body: &Value) -> Vec<DocumentId> {
    body.pointer("/behavior/processes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|process| process.get("calls").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_i64)
        .map(DocumentId::new)
        .collect()
}
