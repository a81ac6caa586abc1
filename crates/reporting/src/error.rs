#![forbid(unsafe_code)]

use rp_storage::StoreError;
use thiserror::Error;

/// Failures surfaced to the caller of [`crate::save`].
///
/// Size and encoding rejections only appear here through
/// [`crate::SaveOutcome::into_result`]; `save` itself reports them as a
/// `Rejected` outcome.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("cannot connect to the document store: {0}")]
    Connectivity(String),

    /// An existing schema marker carries another version.
    #[error("schema version not expected (found {found}, expected {expected}), check data migration")]
    SchemaMismatch { found: String, expected: String },

    #[error("report exceeds the document size limit: {0}")]
    SizeLimit(String),

    #[error("report cannot be encoded: {0}")]
    Encoding(String),

    #[error("document store backend unavailable: {0}")]
    DependencyMissing(&'static str),

    #[error("invalid report: {0}")]
    InvalidReport(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
