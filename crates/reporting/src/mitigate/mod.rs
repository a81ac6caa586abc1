#![forbid(unsafe_code)]

mod step;

pub use step::{DroppedField, RemediationStep, strip_oversized};

use crate::{ANALYSIS, MEGABYTE, ReportError};
use rp_core::{KeyFootprint, Node, largest_key, profile};
use rp_storage::{DocumentId, DocumentStore, EncodeError, StoreError};
use step::PROTECTED_KEY;
use tracing::{error, warn};

/// Result of shrinking a report the store rejected as too large.
#[derive(Clone, Debug, PartialEq)]
pub enum MitigationOutcome {
    Stored {
        id: DocumentId,
        dropped: Vec<DroppedField>,
    },
    /// Remediation is disabled; only the largest section was reported.
    Diagnosed { largest: Option<KeyFootprint> },
    /// A pass at threshold zero removed nothing and the report still does
    /// not fit.
    Exhausted {
        dropped: Vec<DroppedField>,
        largest: Option<KeyFootprint>,
    },
    ProducerKeyBug {
        dropped: Vec<DroppedField>,
        error: EncodeError,
    },
    Unencodable {
        dropped: Vec<DroppedField>,
        error: EncodeError,
    },
}

/// Threshold decrement between passes: one sixteenth of the ceiling.
pub fn size_step(ceiling: usize) -> usize {
    (ceiling / 16).max(1)
}

/// Drops oversized sections of `document` until the store accepts it.
///
/// Each pass strips the largest unprotected top-level section at the current
/// threshold, which starts at the store's ceiling and shrinks by
/// [`size_step`] after every pass that did not produce a storable document.
pub fn mitigate(
    store: &mut dyn DocumentStore,
    mut document: Node,
    fix_large_docs: bool,
) -> Result<MitigationOutcome, ReportError> {
    let mut largest = largest_key(&document);
    log_largest(largest.as_ref());
    if !fix_large_docs {
        return Ok(MitigationOutcome::Diagnosed { largest });
    }

    let ceiling = store.max_document_bytes();
    let step = size_step(ceiling);
    let mut threshold = ceiling;
    let mut dropped = Vec::new();

    loop {
        let Some(parent_key) = remediation_target(&document) else {
            return Ok(MitigationOutcome::Exhausted { dropped, largest });
        };
        let pass = strip_oversized(document, &parent_key, threshold);
        document = pass.document;

        if pass.dropped.is_empty() {
            // Nothing changed since the last rejected write.
            if threshold == 0 {
                return Ok(MitigationOutcome::Exhausted { dropped, largest });
            }
            threshold = threshold.saturating_sub(step);
            continue;
        }
        dropped.extend(pass.dropped);

        match store.insert_one(ANALYSIS, &document) {
            Ok(id) => return Ok(MitigationOutcome::Stored { id, dropped }),
            Err(StoreError::DocumentTooLarge { size, limit }) => {
                error!("document still too large (size={size}, limit={limit})");
                largest = largest_key(&document);
                log_largest(largest.as_ref());
                threshold = threshold.saturating_sub(step);
            }
            Err(StoreError::InvalidDocument(error @ EncodeError::NonStringKey { .. })) => {
                error!(
                    "Search bug in your modifications - you got a dictionary key as int, should be string"
                );
                error!("{error}");
                return Ok(MitigationOutcome::ProducerKeyBug { dropped, error });
            }
            Err(StoreError::InvalidDocument(error)) => {
                error!("{error}");
                return Ok(MitigationOutcome::Unencodable { dropped, error });
            }
            Err(other) => return Err(other.into()),
        }
    }
}

/// Largest top-level section that may be stripped.
fn remediation_target(document: &Node) -> Option<String> {
    profile(document)
        .into_iter()
        .map(|footprint| footprint.key)
        .find(|key| key != PROTECTED_KEY)
}

fn log_largest(largest: Option<&KeyFootprint>) {
    if let Some(largest) = largest {
        warn!(
            "Largest parent key: {} ({} MB)",
            largest.key,
            largest.size / MEGABYTE
        );
    }
}
