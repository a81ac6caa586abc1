#![forbid(unsafe_code)]

mod document_store;
mod encode;
mod error;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use document_store::*;
pub use encode::*;
pub use error::StoreError;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteStore, LAYOUT_VERSION};

/// Per-document ceiling on the serialized size, in bytes (16 MiB).
pub const MAX_DOCUMENT_BYTES: usize = 0x100_0000;
