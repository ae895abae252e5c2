//! Core PlanStore implementation
//!
//! One JSON file per document. Every successful update bumps a monotonic
//! revision token; writers must present the revision they read, so concurrent
//! read-modify-write cycles against the same document cannot silently lose an
//! update.

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Unique identifier for a plan document
pub type DocumentId = String;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    #[error("Revision conflict on {id}: expected {expected}, found {found}")]
    RevisionConflict {
        id: DocumentId,
        expected: u64,
        found: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Check if this is a revision conflict (safe to re-read and retry)
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::RevisionConflict { .. })
    }
}

/// A plan document: structured content plus bookkeeping
///
/// `content` is an arbitrary JSON object whose top-level keys are owned by
/// independent sections. The store never interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDocument {
    /// Unique document ID (UUIDv7, sortable by creation time)
    pub id: DocumentId,
    /// Human-readable plan name
    pub name: String,
    /// Monotonic revision token, bumped on every successful update
    pub revision: u64,
    /// Structured document content
    pub content: Value,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Summary row for listings
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub id: DocumentId,
    pub name: String,
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

/// The plan document store
pub struct PlanStore {
    /// Base path for storage
    base_path: PathBuf,
    /// Advisory lock held for the lifetime of the store
    _lock: fs::File,
}

impl PlanStore {
    /// Open or create a plan store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let lock = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(base_path.join(".lock"))?;
        lock.lock_exclusive()?;

        debug!(?base_path, "Opened plan store");
        Ok(Self {
            base_path,
            _lock: lock,
        })
    }

    /// Create a new empty document
    pub fn create(&self, name: &str) -> Result<PlanDocument, StoreError> {
        let now = Utc::now();
        let doc = PlanDocument {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            revision: 0,
            content: Value::Object(serde_json::Map::new()),
            created_at: now,
            updated_at: now,
        };

        self.write_document(&doc)?;
        info!(id = %doc.id, name = %doc.name, "Created document");
        Ok(doc)
    }

    /// Get a document by ID
    pub fn get(&self, id: &str) -> Result<PlanDocument, StoreError> {
        let path = self.document_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let raw = fs::read_to_string(&path)?;
        let doc: PlanDocument = serde_json::from_str(&raw)?;
        Ok(doc)
    }

    /// Replace a document's content, guarded by the revision the caller read
    ///
    /// Fails with `RevisionConflict` if the stored revision no longer matches
    /// `expected_revision`. On success the revision is bumped and the updated
    /// document returned.
    pub fn update(&self, id: &str, content: Value, expected_revision: u64) -> Result<PlanDocument, StoreError> {
        let mut doc = self.get(id)?;

        if doc.revision != expected_revision {
            debug!(
                %id,
                expected = expected_revision,
                found = doc.revision,
                "update: revision conflict"
            );
            return Err(StoreError::RevisionConflict {
                id: id.to_string(),
                expected: expected_revision,
                found: doc.revision,
            });
        }

        doc.content = content;
        doc.revision += 1;
        doc.updated_at = Utc::now();

        self.write_document(&doc)?;
        debug!(%id, revision = doc.revision, "Updated document");
        Ok(doc)
    }

    /// List all documents
    pub fn list(&self) -> Result<Vec<PlanSummary>, StoreError> {
        let mut summaries = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let raw = fs::read_to_string(&path)?;
                let doc: PlanDocument = serde_json::from_str(&raw)?;
                summaries.push(PlanSummary {
                    id: doc.id,
                    name: doc.name,
                    revision: doc.revision,
                    updated_at: doc.updated_at,
                });
            }
        }

        // UUIDv7 ids sort by creation time
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    /// Delete a document
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.document_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        fs::remove_file(&path)?;
        info!(%id, "Deleted document");
        Ok(())
    }

    fn document_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }

    /// Atomic write: temp file in the same directory, then rename
    fn write_document(&self, doc: &PlanDocument) -> Result<(), StoreError> {
        let path = self.document_path(&doc.id);
        let tmp = self.base_path.join(format!("{}.json.tmp", doc.id));

        let raw = serde_json::to_string_pretty(doc)?;
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_get() {
        let temp = TempDir::new().unwrap();
        let store = PlanStore::open(temp.path()).unwrap();

        let doc = store.create("Bakery expansion").unwrap();
        assert_eq!(doc.revision, 0);
        assert!(doc.content.as_object().unwrap().is_empty());

        let fetched = store.get(&doc.id).unwrap();
        assert_eq!(fetched.id, doc.id);
        assert_eq!(fetched.name, "Bakery expansion");
    }

    #[test]
    fn test_get_missing() {
        let temp = TempDir::new().unwrap();
        let store = PlanStore::open(temp.path()).unwrap();

        let result = store.get("no-such-id");
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_update_bumps_revision() {
        let temp = TempDir::new().unwrap();
        let store = PlanStore::open(temp.path()).unwrap();

        let doc = store.create("Test").unwrap();
        let content = serde_json::json!({"vision": {"data": {"x": 1}}});

        let updated = store.update(&doc.id, content.clone(), doc.revision).unwrap();
        assert_eq!(updated.revision, 1);
        assert_eq!(updated.content, content);
    }

    #[test]
    fn test_update_stale_revision_conflicts() {
        let temp = TempDir::new().unwrap();
        let store = PlanStore::open(temp.path()).unwrap();

        let doc = store.create("Test").unwrap();
        store
            .update(&doc.id, serde_json::json!({"a": 1}), doc.revision)
            .unwrap();

        // Second writer still holds revision 0
        let result = store.update(&doc.id, serde_json::json!({"b": 2}), doc.revision);
        match result {
            Err(StoreError::RevisionConflict { expected, found, .. }) => {
                assert_eq!(expected, 0);
                assert_eq!(found, 1);
            }
            other => panic!("Expected RevisionConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_list_and_delete() {
        let temp = TempDir::new().unwrap();
        let store = PlanStore::open(temp.path()).unwrap();

        let a = store.create("A").unwrap();
        let b = store.create("B").unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        // UUIDv7 ordering follows creation order
        assert_eq!(listed[0].id, a.id);
        assert_eq!(listed[1].id, b.id);

        store.delete(&a.id).unwrap();
        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, b.id);
    }
}
