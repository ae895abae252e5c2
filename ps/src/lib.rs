//! PlanStore - whole-document JSON persistence for plan documents
//!
//! Stores one JSON file per document under a base directory. Documents carry
//! a monotonic revision token so that concurrent read-modify-write cycles can
//! be detected instead of silently losing updates.
//!
//! # Architecture
//!
//! ```text
//! .planstore/
//! ├── .lock                # advisory lock for the open store
//! ├── {document_id}.json
//! └── ...
//! ```
//!
//! # Example
//!
//! ```ignore
//! use planstore::PlanStore;
//!
//! let store = PlanStore::open(".planstore")?;
//! let doc = store.create("Bakery expansion")?;
//! let doc = store.update(&doc.id, serde_json::json!({"vision": {}}), doc.revision)?;
//! ```

pub mod cli;
pub mod config;
mod store;

pub use store::{DocumentId, PlanDocument, PlanStore, PlanSummary, StoreError};
