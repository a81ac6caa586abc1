#![forbid(unsafe_code)]

//! Writes analysis reports into a size-limited document store.
//!
//! [`save`] opens the store from [`ReportingOptions`], replaces any earlier
//! report for the same task and falls back to oversize remediation or a
//! section-by-section write when the store rejects the whole document.

mod calls;
mod connect;
mod error;
mod evict;
mod incremental;
mod indexes;
mod mitigate;
mod options;
mod save;
mod schema;
mod task;

pub use calls::{CALLS_CHUNK_SIZE, detach_calls, release_calls};
pub use connect::connect;
pub use error::ReportError;
pub use evict::{EvictionSummary, evict_previous};
pub use incremental::{IncrementalOutcome, save_incrementally};
pub use indexes::{ensure_indexes, report_indexes};
pub use mitigate::{
    DroppedField, MitigationOutcome, RemediationStep, mitigate, size_step, strip_oversized,
};
pub use options::{ReportingOptions, StoragePort};
pub use save::{Rejection, SaveOutcome, save, save_to_store};
pub use schema::{SCHEMA_VERSION, ensure_schema};
pub use task::resolve_task_id;

pub const ANALYSIS: &str = "analysis";
pub const CALLS: &str = "calls";
pub const SCHEMA: &str = "schema";

/// One size unit in the log lines (`Largest parent key: logs (20 MB)`).
pub const MEGABYTE: usize = 0x10_0000;
