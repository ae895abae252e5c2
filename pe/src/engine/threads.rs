//! Thread registry - lazy, idempotent conversation handles
//!
//! Maps a (document, section) pair to its conversation handle. The handle is
//! created on the first message to a section and persisted into the document
//! before it is ever returned, so a session can never be orphaned from the
//! document that references it. Once stored, a handle is stable for the
//! document's lifetime.

use std::sync::Arc;

use planstore::PlanStore;
use tracing::{debug, info};

use crate::assistant::{AssistantClient, ConversationHandle};
use crate::document;
use crate::engine::RateLimiter;
use crate::error::EngineError;

/// How many revision-conflict retries the handle write gets
const PERSIST_RETRIES: u32 = 3;

pub struct ThreadRegistry {
    store: Arc<PlanStore>,
    client: Arc<dyn AssistantClient>,
    limiter: Arc<RateLimiter>,
}

impl ThreadRegistry {
    pub fn new(store: Arc<PlanStore>, client: Arc<dyn AssistantClient>, limiter: Arc<RateLimiter>) -> Self {
        Self { store, client, limiter }
    }

    /// Get the section's conversation handle, creating it on first use
    ///
    /// Idempotent: repeated calls return the same handle and create at most
    /// one upstream session. Fails with `NotFound` if the document does not
    /// exist and `ServiceUnavailable` if session creation fails, in which
    /// case nothing is persisted.
    pub async fn get_or_create(
        &self,
        document_id: &str,
        section_key: &str,
    ) -> Result<ConversationHandle, EngineError> {
        let doc = self.store.get(document_id)?;

        if let Some(handle) = document::section_handle(&doc.content, section_key) {
            debug!(%document_id, %section_key, %handle, "get_or_create: handle already exists");
            return Ok(handle.to_string());
        }

        self.limiter.acquire().await;
        let handle = self.client.create_conversation().await?;
        info!(%document_id, %section_key, %handle, "Created conversation for section");

        // Persist before returning. A racing writer may have stored a handle
        // in the meantime; theirs wins and ours is abandoned upstream.
        let mut revision = doc.revision;
        let mut content = doc.content;
        for attempt in 0..PERSIST_RETRIES {
            if let Some(existing) = document::section_handle(&content, section_key) {
                debug!(%document_id, %section_key, %existing, "get_or_create: lost creation race");
                return Ok(existing.to_string());
            }

            let updated = document::set_section_handle(&content, section_key, &handle);
            match self.store.update(document_id, updated, revision) {
                Ok(_) => return Ok(handle),
                Err(e) if e.is_conflict() => {
                    debug!(%document_id, attempt, "get_or_create: revision conflict, re-reading");
                    let doc = self.store.get(document_id)?;
                    revision = doc.revision;
                    content = doc.content;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(EngineError::Internal(format!(
            "could not persist handle for {}/{} after {} attempts",
            document_id, section_key, PERSIST_RETRIES
        )))
    }
}
