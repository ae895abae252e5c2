//! Section service - the full message pipeline
//!
//! Ties the registry, thread registry, executor, extraction and merge
//! together into the two operations callers actually use: send a message to
//! a section, read a section back. Per-handle locks make message handling
//! single-flight per conversation, so two concurrent messages to the same
//! section serialize instead of tripping the upstream active-run conflict.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use planstore::PlanStore;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::document;
use crate::engine::{RunExecutor, ThreadRegistry};
use crate::error::EngineError;
use crate::extract::{clean_response, extract_payload};
use crate::sections::{SectionRegistry, SectionSpec};

/// How many revision-conflict retries a merge write gets
const MERGE_RETRIES: u32 = 3;

/// The engine's answer to one user message
#[derive(Debug, Clone)]
pub struct SectionReply {
    /// Cleaned conversational reply, payload blocks removed
    pub assistant_text: String,
    /// The section's structured data after the merge
    pub structured_data: Value,
    /// Canonical rendered text for the section
    pub rendered_text: String,
}

/// A section read back without sending a message
#[derive(Debug, Clone)]
pub struct SectionView {
    pub structured_data: Value,
    pub rendered_text: String,
}

/// Per-conversation mutexes, created on demand
///
/// The outer lock only guards the map; the inner async mutex is held for the
/// whole pipeline run.
#[derive(Default)]
struct HandleLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl HandleLocks {
    fn for_handle(&self, handle: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(handle.to_string()).or_default())
    }
}

pub struct SectionService {
    store: Arc<PlanStore>,
    registry: SectionRegistry,
    threads: ThreadRegistry,
    executor: RunExecutor,
    handle_locks: HandleLocks,
}

impl SectionService {
    pub fn new(
        store: Arc<PlanStore>,
        registry: SectionRegistry,
        threads: ThreadRegistry,
        executor: RunExecutor,
    ) -> Self {
        Self {
            store,
            registry,
            threads,
            executor,
            handle_locks: HandleLocks::default(),
        }
    }

    /// Send one user message to a document section
    ///
    /// Runs the whole pipeline: resolve the section's conversation, wait out
    /// any in-flight run, submit the turn, extract whatever payload the reply
    /// carries, merge it into the document, and render. A reply without a
    /// payload is a perfectly good conversational turn; the document just
    /// does not change.
    pub async fn send_message(
        &self,
        document_id: &str,
        section_key: &str,
        text: &str,
    ) -> Result<SectionReply, EngineError> {
        let spec = self.section_spec(section_key)?;

        let handle = self.threads.get_or_create(document_id, section_key).await?;

        let lock = self.handle_locks.for_handle(&handle);
        let _guard = lock.lock().await;

        self.executor.drain(&handle).await?;

        let reply = self.executor.submit(&handle, text, &spec.system_prompt).await?;

        let mut payload = extract_payload(&reply.text).into_payload();
        if payload.is_none() && spec.structured_followup {
            debug!(%document_id, %section_key, "send_message: no inline payload, trying followup");
            payload = self.executor.structured_followup(&handle, &spec.schema_hint).await;
        }

        let structured_data = match payload {
            Some(payload) => {
                info!(%document_id, %section_key, "send_message: merging extracted payload");
                self.merge_and_persist(document_id, section_key, &payload).await?
            }
            None => {
                debug!(%document_id, %section_key, "send_message: no payload, document unchanged");
                let doc = self.store.get(document_id)?;
                document::section_data(&doc.content, section_key)
            }
        };

        Ok(SectionReply {
            assistant_text: clean_response(&reply.text),
            rendered_text: spec.renderer.render(&structured_data),
            structured_data,
        })
    }

    /// Read a section's current data and rendered text
    pub fn get_section(&self, document_id: &str, section_key: &str) -> Result<SectionView, EngineError> {
        let spec = self.section_spec(section_key)?;
        let doc = self.store.get(document_id)?;
        let structured_data = document::section_data(&doc.content, section_key);

        Ok(SectionView {
            rendered_text: spec.renderer.render(&structured_data),
            structured_data,
        })
    }

    /// Section keys in rendering order
    pub fn section_keys(&self) -> Vec<&str> {
        self.registry.keys()
    }

    fn section_spec(&self, section_key: &str) -> Result<&SectionSpec, EngineError> {
        self.registry
            .get(section_key)
            .ok_or_else(|| EngineError::UnknownSection(section_key.to_string()))
    }

    /// Merge the payload into the stored document, retrying on revision races
    ///
    /// The merge is additive, so re-reading and re-merging onto a newer
    /// revision is always safe. Returns the section's data after the write.
    async fn merge_and_persist(
        &self,
        document_id: &str,
        section_key: &str,
        payload: &Value,
    ) -> Result<Value, EngineError> {
        for attempt in 0..MERGE_RETRIES {
            let doc = self.store.get(document_id)?;
            let merged = document::merge_section(&doc.content, section_key, payload);

            match self.store.update(document_id, merged, doc.revision) {
                Ok(updated) => return Ok(document::section_data(&updated.content, section_key)),
                Err(e) if e.is_conflict() => {
                    warn!(%document_id, %section_key, attempt, "merge_and_persist: revision conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(EngineError::Internal(format!(
            "could not persist section {} of {} after {} attempts",
            section_key, document_id, MERGE_RETRIES
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::assistant::RunState;
    use crate::assistant::mock::MockAssistant;
    use crate::config::EngineConfig;
    use crate::engine::RateLimiter;

    fn service(temp: &TempDir, client: Arc<MockAssistant>) -> (Arc<PlanStore>, SectionService) {
        let store = Arc::new(PlanStore::open(temp.path()).unwrap());
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(0)));
        let config = EngineConfig {
            min_gap_ms: 0,
            poll_interval_ms: 1,
            max_poll_attempts: 10,
        };

        let threads = ThreadRegistry::new(
            Arc::clone(&store),
            Arc::clone(&client) as Arc<dyn crate::assistant::AssistantClient>,
            Arc::clone(&limiter),
        );
        let executor = RunExecutor::new(client, limiter, &config);
        let service = SectionService::new(
            Arc::clone(&store),
            SectionRegistry::with_defaults(),
            threads,
            executor,
        );
        (store, service)
    }

    #[tokio::test]
    async fn test_unknown_section_rejected() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockAssistant::new(vec![]));
        let (store, service) = service(&temp, client);

        let doc = store.create("Test").unwrap();
        let result = service.send_message(&doc.id, "nope", "hello").await;
        assert!(matches!(result, Err(EngineError::UnknownSection(k)) if k == "nope"));
    }

    #[tokio::test]
    async fn test_payload_reply_merges_and_renders() {
        let temp = TempDir::new().unwrap();
        let reply = "Great vision! Here's what I captured:\n```json\n\
            {\"long_term_vision\": \"simplify bookkeeping\"}\n```\nAnything else?";
        let client = Arc::new(MockAssistant::new(vec![reply]));
        let (store, service) = service(&temp, client);

        let doc = store.create("Test").unwrap();
        let reply = service
            .send_message(&doc.id, "vision", "We simplify bookkeeping.")
            .await
            .unwrap();

        assert_eq!(reply.structured_data["long_term_vision"], "simplify bookkeeping");
        assert!(reply.rendered_text.contains("## Long-Term Vision"));
        // The payload block is gone from the conversational text
        assert!(!reply.assistant_text.contains("```"));
        assert!(reply.assistant_text.contains("Great vision!"));

        // And the merge was persisted
        let stored = store.get(&doc.id).unwrap();
        assert_eq!(
            document::section_data(&stored.content, "vision")["long_term_vision"],
            "simplify bookkeeping"
        );
    }

    #[tokio::test]
    async fn test_no_payload_leaves_document_unchanged() {
        let temp = TempDir::new().unwrap();
        // Conversational reply, then a followup reply that also carries no JSON
        let client = Arc::new(MockAssistant::new(vec![
            "Could you tell me more about your customers?",
            "I don't have enough to summarize yet.",
        ]));
        let (store, service) = service(&temp, client);

        let doc = store.create("Test").unwrap();
        let before = store.get(&doc.id).unwrap();

        let reply = service.send_message(&doc.id, "vision", "hmm").await.unwrap();

        assert_eq!(reply.structured_data, json!({}));
        let after = store.get(&doc.id).unwrap();
        // Only the handle write happened; no data was merged
        assert_eq!(document::section_data(&after.content, "vision"), json!({}));
        assert_eq!(after.revision, before.revision + 1);
    }

    #[tokio::test]
    async fn test_followup_payload_merges() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockAssistant::new(vec![
            "Got it, your market is small retailers.",
            r#"{"target_market": "small retailers"}"#,
        ]));
        let (store, service) = service(&temp, client);

        let doc = store.create("Test").unwrap();
        let reply = service
            .send_message(&doc.id, "market", "We sell to small retailers.")
            .await
            .unwrap();

        assert_eq!(reply.structured_data["target_market"], "small retailers");
        let stored = store.get(&doc.id).unwrap();
        assert_eq!(
            document::section_data(&stored.content, "market")["target_market"],
            "small retailers"
        );
    }

    #[tokio::test]
    async fn test_second_turn_extends_first() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockAssistant::new(vec![
            "Noted.\n```json\n{\"long_term_vision\": \"simplify bookkeeping\"}\n```",
            "Noted.\n```json\n{\"year_one_goals\": [\"launch MVP\"]}\n```",
        ]));
        let (store, service) = service(&temp, client);

        let doc = store.create("Test").unwrap();
        service.send_message(&doc.id, "vision", "first").await.unwrap();
        let reply = service.send_message(&doc.id, "vision", "second").await.unwrap();

        // Both turns' keys survive
        assert_eq!(reply.structured_data["long_term_vision"], "simplify bookkeeping");
        assert_eq!(reply.structured_data["year_one_goals"], json!(["launch MVP"]));
        assert_eq!(store.get(&doc.id).unwrap().revision, 3);
    }

    #[tokio::test]
    async fn test_run_failure_leaves_document_unchanged() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockAssistant::new(vec![]));
        let (store, service) = service(&temp, Arc::clone(&client));

        let doc = store.create("Test").unwrap();
        client.push_run_states(vec![RunState::Failed]);

        let result = service.send_message(&doc.id, "vision", "hello").await;
        assert!(matches!(result, Err(EngineError::RunFailed { .. })));

        let stored = store.get(&doc.id).unwrap();
        assert_eq!(document::section_data(&stored.content, "vision"), json!({}));
    }

    #[tokio::test]
    async fn test_sections_are_isolated() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockAssistant::new(vec![
            "Noted.\n```json\n{\"long_term_vision\": \"grow\"}\n```",
            "Noted.\n```json\n{\"target_market\": \"retailers\"}\n```",
        ]));
        let (store, service) = service(&temp, client);

        let doc = store.create("Test").unwrap();
        service.send_message(&doc.id, "vision", "a").await.unwrap();
        service.send_message(&doc.id, "market", "b").await.unwrap();

        let stored = store.get(&doc.id).unwrap();
        assert_eq!(document::section_data(&stored.content, "vision")["long_term_vision"], "grow");
        assert_eq!(document::section_data(&stored.content, "market")["target_market"], "retailers");
    }

    #[tokio::test]
    async fn test_concurrent_messages_serialize() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockAssistant::new(vec![
            "Noted.\n```json\n{\"summary\": \"warmup\"}\n```",
            "Noted.\n```json\n{\"long_term_vision\": \"a\"}\n```",
            "Noted.\n```json\n{\"year_one_goals\": [\"b\"]}\n```",
        ]));
        let (store, service) = service(&temp, client);
        let service = Arc::new(service);

        let doc = store.create("Test").unwrap();
        // Create the handle first so both tasks contend on the same lock
        service.send_message(&doc.id, "vision", "warmup").await.unwrap();

        let s = Arc::clone(&service);
        let id = doc.id.clone();
        let task = tokio::spawn(async move { s.send_message(&id, "vision", "concurrent").await });
        let direct = service.send_message(&doc.id, "vision", "concurrent").await;

        let spawned = task.await.unwrap();
        assert!(direct.is_ok());
        assert!(spawned.is_ok());

        // Whatever the interleaving, both payload keys made it in
        let stored = store.get(&doc.id).unwrap();
        let data = document::section_data(&stored.content, "vision");
        assert_eq!(data["long_term_vision"], "a");
        assert_eq!(data["year_one_goals"], json!(["b"]));
    }

    #[tokio::test]
    async fn test_get_section_renders_stored_data() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockAssistant::new(vec![]));
        let (store, service) = service(&temp, client);

        let doc = store.create("Test").unwrap();
        let content = document::merge_section(
            &doc.content,
            "vision",
            &json!({"long_term_vision": "simplify bookkeeping"}),
        );
        store.update(&doc.id, content, doc.revision).unwrap();

        let view = service.get_section(&doc.id, "vision").unwrap();
        assert_eq!(view.structured_data["long_term_vision"], "simplify bookkeeping");
        assert!(view.rendered_text.contains("simplify bookkeeping"));
    }

    #[tokio::test]
    async fn test_get_section_empty_document() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockAssistant::new(vec![]));
        let (store, service) = service(&temp, client);

        let doc = store.create("Test").unwrap();
        let view = service.get_section(&doc.id, "vision").unwrap();
        assert_eq!(view.structured_data, json!({}));
    }
}
