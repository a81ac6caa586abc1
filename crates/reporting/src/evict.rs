#![forbid(unsafe_code)]

use crate::calls::referenced_calls;
use crate::{ANALYSIS, CALLS, ReportError};
use rp_storage::DocumentStore;
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvictionSummary {
    pub documents: usize,
    pub call_records: usize,
}

/// Deletes every stored report of `task_id` together with the call records
/// its processes reference.
pub fn evict_previous(
    store: &mut dyn DocumentStore,
    task_id: i64,
) -> Result<EvictionSummary, ReportError> {
    let previous = store.find_by_i64(ANALYSIS, "info.id", task_id)?;
    let mut summary = EvictionSummary::default();
    if previous.is_empty() {
        return Ok(summary);
    }

    debug!("Deleting analysis data for Task {task_id}");
    for analysis in previous {
        let ids = referenced_calls(&analysis.body);
        summary.call_records += store.delete_many(CALLS, &ids)?;
        if store.delete_one(ANALYSIS, analysis.id)? {
            summary.documents += 1;
        }
    }
    debug!(
        documents = summary.documents,
        call_records = summary.call_records,
        "Deleted previous data for Task {task_id}"
    );
    Ok(summary)
}
