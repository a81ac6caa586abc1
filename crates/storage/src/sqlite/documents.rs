#![forbid(unsafe_code)]

use super::support::{json_path, now_ms};
use super::{SqliteStore, check_collection};
use crate::{
    DocumentId, DocumentStore, IndexSpec, StoreError, StoredDocument, encode_document,
    encode_field,
};
use rusqlite::{OptionalExtension, Transaction, params};
use rp_core::Node;
use serde_json::Value;

impl SqliteStore {
    fn checked_body(&self, value: &Value) -> Result<String, StoreError> {
        let body = serde_json::to_string(value)?;
        if body.len() > self.max_document_bytes {
            return Err(StoreError::DocumentTooLarge {
                size: body.len(),
                limit: self.max_document_bytes,
            });
        }
        Ok(body)
    }

    fn query_documents(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let body: String = row.get(1)?;
            out.push(StoredDocument {
                id: DocumentId::new(row.get(0)?),
                body: serde_json::from_str(&body)?,
            });
        }
        Ok(out)
    }
}

impl DocumentStore for SqliteStore {
    fn max_document_bytes(&self) -> usize {
        self.max_document_bytes
    }

    fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM collections ORDER BY name ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_one(&mut self, collection: &str, document: &Node) -> Result<DocumentId, StoreError> {
        check_collection(collection)?;
        if document.as_map().is_none() {
            return Err(StoreError::InvalidInput("document must be a map"));
        }
        let value = encode_document(document)?;
        let body = self.checked_body(&value)?;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        ensure_collection_tx(&tx, collection, now_ms)?;
        tx.execute(
            "INSERT INTO documents(collection, body, created_at_ms, updated_at_ms) VALUES (?1, ?2, ?3, ?3)",
            params![collection, body, now_ms],
        )?;
        let id = DocumentId::new(tx.last_insert_rowid());
        tx.commit()?;
        Ok(id)
    }

    fn get(&self, collection: &str, id: DocumentId) -> Result<Option<StoredDocument>, StoreError> {
        check_collection(collection)?;
        let body = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection=?1 AND id=?2",
                params![collection, id.get()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        match body {
            Some(body) => Ok(Some(StoredDocument {
                id,
                body: serde_json::from_str(&body)?,
            })),
            None => Ok(None),
        }
    }

    fn find_one(&self, collection: &str) -> Result<Option<StoredDocument>, StoreError> {
        check_collection(collection)?;
        let mut found = self.query_documents(
            "SELECT id, body FROM documents WHERE collection=?1 ORDER BY id ASC LIMIT 1",
            params![collection],
        )?;
        Ok(found.pop())
    }

    fn find_by_i64(
        &self,
        collection: &str,
        path: &str,
        value: i64,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        check_collection(collection)?;
        let json_path = json_path(path)?;
        // Literal collection and path so the partial expression indexes apply.
        let sql = format!(
            "SELECT id, body FROM documents \
             WHERE collection='{collection}' AND json_extract(body, '{json_path}') = ?1 \
             ORDER BY id ASC"
        );
        self.query_documents(&sql, params![value])
    }

    fn set_field(
        &mut self,
        collection: &str,
        id: DocumentId,
        field: &str,
        value: &Node,
    ) -> Result<(), StoreError> {
        check_collection(collection)?;
        let encoded = encode_field(field, value)?;

        let Some(mut current) = self.get(collection, id)? else {
            return Err(StoreError::UnknownId);
        };
        let Some(object) = current.body.as_object_mut() else {
            return Err(StoreError::InvalidInput("stored document is not an object"));
        };
        object.insert(field.to_string(), encoded);
        let body = self.checked_body(&current.body)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE documents SET body=?3, updated_at_ms=?4 WHERE collection=?1 AND id=?2",
            params![collection, id.get(), body, now_ms()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_one(&mut self, collection: &str, id: DocumentId) -> Result<bool, StoreError> {
        check_collection(collection)?;
        let tx = self.conn.transaction()?;
        let deleted = tx.execute(
            "DELETE FROM documents WHERE collection=?1 AND id=?2",
            params![collection, id.get()],
        )?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    fn delete_many(&mut self, collection: &str, ids: &[DocumentId]) -> Result<usize, StoreError> {
        check_collection(collection)?;
        if ids.is_empty() {
            return Ok(0);
        }
        let ids_json = serde_json::to_string(&ids.iter().map(|id| id.get()).collect::<Vec<_>>())?;

        let tx = self.conn.transaction()?;
        let deleted = tx.execute(
            "DELETE FROM documents WHERE collection=?1 AND id IN (SELECT value FROM json_each(?2))",
            params![collection, ids_json],
        )?;
        tx.commit()?;
        Ok(deleted)
    }

    fn create_index(&mut self, collection: &str, index: &IndexSpec) -> Result<bool, StoreError> {
        check_collection(collection)?;
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        ensure_collection_tx(&tx, collection, now_ms)?;
        let created = super::indexes::create_index_tx(&tx, collection, index, now_ms)?;
        tx.commit()?;
        Ok(created)
    }

    fn count(&self, collection: &str) -> Result<usize, StoreError> {
        check_collection(collection)?;
        let count = self.conn.query_row(
            "SELECT COUNT(1) FROM documents WHERE collection=?1",
            params![collection],
            |row| row.get::<_, i64>(0),
        )?;
        usize::try_from(count).map_err(|_| StoreError::InvalidInput("numeric overflow"))
    }
}

fn ensure_collection_tx(
    tx: &Transaction<'_>,
    collection: &str,
    now_ms: i64,
) -> Result<(), StoreError> {
    tx.execute(
        "INSERT OR IGNORE INTO collections(name, created_at_ms) VALUES (?1, ?2)",
        params![collection, now_ms],
    )?;
    Ok(())
}
