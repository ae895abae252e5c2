//! Engine error taxonomy
//!
//! One enum for everything the engine surfaces to calling layers. Extraction
//! failure is deliberately absent: a reply without a parseable payload is
//! "no update", not an error.

use planstore::StoreError;
use thiserror::Error;

use crate::assistant::AssistantError;

/// Errors surfaced by the section engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    /// Assistant service failure after the client's bounded retries
    #[error("Assistant service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The run reached a terminal failure state upstream; no document
    /// mutation has occurred
    #[error("Run failed: {reason}")]
    RunFailed { reason: String },

    /// The run never reached a terminal state within the polling budget
    #[error("Timed out waiting for run {run_id} after {attempts} polls")]
    Timeout { run_id: String, attempts: u32 },

    /// Persistence or other internal failure. When this happens after a run,
    /// the conversation has already advanced, so a caller retry will append a
    /// duplicate conversational turn. Known risk, not silently solved.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AssistantError> for EngineError {
    fn from(e: AssistantError) -> Self {
        EngineError::ServiceUnavailable(e.to_string())
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => EngineError::NotFound(id),
            other => EngineError::Internal(other.to_string()),
        }
    }
}
