#![forbid(unsafe_code)]

use crate::{ANALYSIS, ReportError};
use rp_storage::{DocumentStore, IndexSpec};

/// Lookup indexes of the `analysis` collection: by task id and by any of the
/// sample hashes.
pub fn report_indexes() -> [IndexSpec; 2] {
    [
        IndexSpec::new("info_id", ["info.id"]),
        IndexSpec::new(
            "all_sha256",
            [
                "target.file.sha256",
                "dropped.sha256",
                "procdump.sha256",
                "CAPE.payloads.sha256",
            ],
        ),
    ]
}

/// Creates the report indexes. Existing ones are left alone.
pub fn ensure_indexes(store: &mut dyn DocumentStore) -> Result<usize, ReportError> {
    let mut created = 0;
    for index in report_indexes() {
        if store.create_index(ANALYSIS, &index)? {
            created += 1;
        }
    }
    Ok(created)
}
