#![forbid(unsafe_code)]

use crate::{ReportError, ReportingOptions};
use rp_storage::DocumentStore;

#[cfg(feature = "sqlite")]
const LOCAL_HOSTS: [&str; 3] = ["127.0.0.1", "localhost", "::1"];

/// Opens the document store described by `options`.
///
/// The embedded backend keeps its database under `storage_dir` and only
/// serves local hosts; any other host is unreachable.
#[cfg(feature = "sqlite")]
pub fn connect(options: &ReportingOptions) -> Result<Box<dyn DocumentStore>, ReportError> {
    use rp_storage::{SqliteStore, StoreError};
    use tracing::debug;

    let port = options.validate()?;
    let host = options.host.trim();
    if !LOCAL_HOSTS.contains(&host) {
        return Err(ReportError::Connectivity(format!(
            "host {host}:{port} is not reachable by the embedded store"
        )));
    }

    let store = SqliteStore::open(&options.storage_dir, &options.db).map_err(|err| match err {
        StoreError::InvalidInput(message) if !message.starts_with("RESET_REQUIRED") => {
            ReportError::Configuration(format!("{message}: {:?}", options.db))
        }
        other => ReportError::Connectivity(other.to_string()),
    })?;
    debug!(
        host,
        port,
        db = %options.db,
        authsource = %options.authsource,
        "connected to document store"
    );
    Ok(Box::new(store))
}

/// Without a compiled-in backend no options can be served, valid or not.
#[cfg(not(feature = "sqlite"))]
pub fn connect(_options: &ReportingOptions) -> Result<Box<dyn DocumentStore>, ReportError> {
    Err(ReportError::DependencyMissing(
        "no document store backend compiled in (enable the `sqlite` feature)",
    ))
}
