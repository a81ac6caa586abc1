#![forbid(unsafe_code)]

use crate::StoreError;
use rp_core::Node;
use serde_json::Value;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(i64);

impl DocumentId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub body: Value,
}

/// A named lookup index over one or more dotted field paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub paths: Vec<String>,
}

impl IndexSpec {
    pub fn new<P: AsRef<str>>(name: &str, paths: impl IntoIterator<Item = P>) -> Self {
        Self {
            name: name.to_string(),
            paths: paths
                .into_iter()
                .map(|path| path.as_ref().to_string())
                .collect(),
        }
    }
}

/// Operations the report writer needs from a document database.
///
/// Writes that exceed [`DocumentStore::max_document_bytes`] fail with
/// `StoreError::DocumentTooLarge`; documents that break the encoding rules fail
/// with `StoreError::InvalidDocument`. Neither writes anything.
pub trait DocumentStore {
    fn max_document_bytes(&self) -> usize;

    fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    fn insert_one(&mut self, collection: &str, document: &Node) -> Result<DocumentId, StoreError>;

    fn get(&self, collection: &str, id: DocumentId) -> Result<Option<StoredDocument>, StoreError>;

    /// Oldest document of the collection.
    fn find_one(&self, collection: &str) -> Result<Option<StoredDocument>, StoreError>;

    /// Documents whose field at `path` is the integer `value`, oldest first.
    fn find_by_i64(
        &self,
        collection: &str,
        path: &str,
        value: i64,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Sets one top-level field of an existing document.
    fn set_field(
        &mut self,
        collection: &str,
        id: DocumentId,
        field: &str,
        value: &Node,
    ) -> Result<(), StoreError>;

    fn delete_one(&mut self, collection: &str, id: DocumentId) -> Result<bool, StoreError>;

    fn delete_many(&mut self, collection: &str, ids: &[DocumentId]) -> Result<usize, StoreError>;

    /// Creates the index unless an identical one exists. Returns whether it
    /// was created.
    fn create_index(&mut self, collection: &str, index: &IndexSpec) -> Result<bool, StoreError>;

    fn count(&self, collection: &str) -> Result<usize, StoreError>;
}
