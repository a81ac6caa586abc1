#![forbid(unsafe_code)]

use crate::{
    ANALYSIS, DroppedField, IncrementalOutcome, MitigationOutcome, ReportError, ReportingOptions,
    connect, detach_calls, ensure_indexes, ensure_schema, evict_previous, mitigate,
    release_calls, resolve_task_id, save_incrementally,
};
use rp_core::{KeyFootprint, Node, coerce_keys, normalize_text};
use rp_storage::{DocumentId, DocumentStore, EncodeError, StoreError};
use tracing::{debug, error, info, warn};

/// Why a report was not stored.
#[derive(Clone, Debug, PartialEq)]
pub enum Rejection {
    /// Too large and `fix_large_docs` is off.
    OversizeNotFixed { largest: Option<KeyFootprint> },
    RemediationExhausted {
        dropped: Vec<DroppedField>,
        largest: Option<KeyFootprint>,
    },
    /// A producer emitted a non-string key that survived key coercion.
    ProducerKeyBug { error: EncodeError },
    Unencodable { error: EncodeError },
    /// The section-by-section fallback found no `info` section. Not produced
    /// by [`save`], which requires `info` to resolve the task id first.
    MissingInfo,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SaveOutcome {
    Stored {
        id: DocumentId,
        task_id: i64,
        dropped: Vec<DroppedField>,
    },
    /// Stored section by section; `skipped` sections are missing.
    Partial {
        id: DocumentId,
        task_id: i64,
        skipped: Vec<String>,
    },
    Rejected { task_id: i64, reason: Rejection },
}

impl SaveOutcome {
    pub fn task_id(&self) -> i64 {
        match self {
            Self::Stored { task_id, .. }
            | Self::Partial { task_id, .. }
            | Self::Rejected { task_id, .. } => *task_id,
        }
    }

    pub fn document_id(&self) -> Option<DocumentId> {
        match self {
            Self::Stored { id, .. } | Self::Partial { id, .. } => Some(*id),
            Self::Rejected { .. } => None,
        }
    }

    /// Turns a rejection into the matching [`ReportError`].
    pub fn into_result(self) -> Result<Self, ReportError> {
        let Self::Rejected { task_id, reason } = self else {
            return Ok(self);
        };
        Err(match reason {
            Rejection::OversizeNotFixed { largest } => ReportError::SizeLimit(format!(
                "task {task_id}: report too large{}, enable fix_large_docs to drop oversized sections",
                describe_largest(largest.as_ref())
            )),
            Rejection::RemediationExhausted { dropped, largest } => {
                ReportError::SizeLimit(format!(
                    "task {task_id}: report still too large after dropping {} sections{}",
                    dropped.len(),
                    describe_largest(largest.as_ref())
                ))
            }
            Rejection::ProducerKeyBug { error } | Rejection::Unencodable { error } => {
                ReportError::Encoding(format!("task {task_id}: {error}"))
            }
            Rejection::MissingInfo => {
                ReportError::InvalidReport(format!("task {task_id}: report has no info section"))
            }
        })
    }
}

fn describe_largest(largest: Option<&KeyFootprint>) -> String {
    largest
        .map(|largest| format!(" (largest section {}: {} chars)", largest.key, largest.size))
        .unwrap_or_default()
}

/// Stores `report` in the store described by `options`, replacing any
/// earlier report of the same task.
///
/// The store is opened for this call only and closed on return.
pub fn save(report: Node, options: &ReportingOptions) -> Result<SaveOutcome, ReportError> {
    let mut store = connect(options)?;
    save_to_store(store.as_mut(), report, options)
}

/// [`save`] against an already open store.
pub fn save_to_store(
    store: &mut dyn DocumentStore,
    mut report: Node,
    options: &ReportingOptions,
) -> Result<SaveOutcome, ReportError> {
    if report.as_map().is_none() {
        return Err(ReportError::InvalidReport(format!(
            "report must be a map, got {}",
            report.type_name()
        )));
    }

    let coerced = coerce_keys(&mut report);
    if !coerced.is_empty() {
        warn!(count = coerced.len(), "non-string keys rewritten");
    }
    if !report.contains_key("network") {
        let _ = report.insert("network", Node::empty_map());
    }
    let task_id = resolve_task_id(&mut report, options.task_id_override)?;

    ensure_schema(store)?;
    let written = detach_calls(store, &mut report)?;
    ensure_indexes(store)?;
    let evicted = evict_previous(store, task_id)?;
    let repaired = normalize_text(&mut report);
    debug!(
        task_id,
        call_chunks = written.len(),
        evicted = evicted.documents,
        repaired_text = repaired,
        "report prepared"
    );

    let outcome = match store.insert_one(ANALYSIS, &report) {
        Ok(id) => SaveOutcome::Stored {
            id,
            task_id,
            dropped: Vec::new(),
        },
        Err(StoreError::DocumentTooLarge { size, limit }) => {
            warn!(task_id, size, limit, "report exceeds the document size limit");
            match mitigate(store, report, options.fix_large_docs)? {
                MitigationOutcome::Stored { id, dropped } => SaveOutcome::Stored {
                    id,
                    task_id,
                    dropped,
                },
                MitigationOutcome::Diagnosed { largest } => SaveOutcome::Rejected {
                    task_id,
                    reason: Rejection::OversizeNotFixed { largest },
                },
                MitigationOutcome::Exhausted { dropped, largest } => SaveOutcome::Rejected {
                    task_id,
                    reason: Rejection::RemediationExhausted { dropped, largest },
                },
                MitigationOutcome::ProducerKeyBug { error, .. } => SaveOutcome::Rejected {
                    task_id,
                    reason: Rejection::ProducerKeyBug { error },
                },
                MitigationOutcome::Unencodable { error, .. } => SaveOutcome::Rejected {
                    task_id,
                    reason: Rejection::Unencodable { error },
                },
            }
        }
        Err(StoreError::InvalidDocument(error)) if error.is_structural() => {
            warn!(task_id, "{error}; storing the report section by section");
            match save_incrementally(store, &report)? {
                IncrementalOutcome::Saved { id, skipped } => SaveOutcome::Partial {
                    id,
                    task_id,
                    skipped,
                },
                IncrementalOutcome::MissingInfo => SaveOutcome::Rejected {
                    task_id,
                    reason: Rejection::MissingInfo,
                },
            }
        }
        Err(StoreError::InvalidDocument(error)) => {
            error!("Search bug in your modifications - you got a dictionary key as int, should be string");
            error!("{error}");
            SaveOutcome::Rejected {
                task_id,
                reason: Rejection::ProducerKeyBug { error },
            }
        }
        Err(other) => return Err(other.into()),
    };

    let trimmed = match &outcome {
        SaveOutcome::Stored { dropped, .. } => !dropped.is_empty(),
        SaveOutcome::Partial { skipped, .. } => !skipped.is_empty(),
        SaveOutcome::Rejected { .. } => true,
    };
    if trimmed {
        let released = release_calls(store, &written, outcome.document_id())?;
        if released > 0 {
            warn!(task_id, released, "call chunks of the unsaved content removed");
        }
    }

    match &outcome {
        SaveOutcome::Stored { id, dropped, .. } => {
            info!(task_id, id = %id, dropped = dropped.len(), "report stored");
        }
        SaveOutcome::Partial { id, skipped, .. } => {
            info!(task_id, id = %id, skipped = skipped.len(), "report stored partially");
        }
        SaveOutcome::Rejected { reason, .. } => {
            warn!(task_id, ?reason, "report rejected");
        }
    }
    Ok(outcome)
}
