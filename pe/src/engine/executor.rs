//! Run executor and active-run guard
//!
//! Drives one request/response cycle against a conversation: drain any
//! outstanding run to a terminal state, append the user's message, create a
//! run, poll it to completion, fetch the newest assistant reply. Every
//! upstream call goes through the shared rate limiter, and the poll loop is
//! bounded so an upstream job that never terminates surfaces `Timeout`
//! instead of hanging.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::assistant::{AssistantClient, MessageRecord, Role, RunJob};
use crate::config::EngineConfig;
use crate::engine::RateLimiter;
use crate::error::EngineError;
use crate::extract::{ExtractionResult, extract_payload};

/// Cues in the user's message that trigger the examples instruction
const HELP_CUES: &[&str] = &["example", "help", "not sure", "unsure", "idea", "suggest"];

/// Per-call instruction appended when the user sounds stuck
const EXAMPLES_INSTRUCTION: &str = "The user is unsure. Offer 2-3 concrete, numbered examples \
tailored to their business, then end with one clarifying question.";

/// Prompt for the auxiliary summarize turn
const SUMMARIZE_PROMPT: &str = "Summarize everything established so far in this conversation \
as a single JSON object matching this schema, and output only the JSON:";

pub struct RunExecutor {
    client: Arc<dyn AssistantClient>,
    limiter: Arc<RateLimiter>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl RunExecutor {
    pub fn new(client: Arc<dyn AssistantClient>, limiter: Arc<RateLimiter>, config: &EngineConfig) -> Self {
        Self {
            client,
            limiter,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_poll_attempts: config.max_poll_attempts,
        }
    }

    /// Drain every non-terminal run on the handle to a terminal state
    ///
    /// This is the active-run guard: submitting while a run is in flight
    /// trips the upstream "already has an active run" conflict. A drained
    /// run's outcome is irrelevant here; only terminality matters.
    pub async fn drain(&self, handle: &str) -> Result<(), EngineError> {
        self.limiter.acquire().await;
        let runs = self.client.list_runs(handle).await?;

        for run in runs {
            if !run.state.is_terminal() {
                debug!(%handle, run_id = %run.id, state = ?run.state, "drain: waiting out active run");
                self.poll_to_terminal(handle, &run.id).await?;
            }
        }

        Ok(())
    }

    /// Submit one conversational turn and return the assistant's reply
    ///
    /// `instructions` frame the run (the section's system prompt); the
    /// examples instruction is appended when the message sounds stuck.
    pub async fn submit(&self, handle: &str, text: &str, instructions: &str) -> Result<MessageRecord, EngineError> {
        let instructions = if needs_examples(text) {
            debug!(%handle, "submit: message sounds unsure, adding examples instruction");
            format!("{}\n\n{}", instructions, EXAMPLES_INSTRUCTION)
        } else {
            instructions.to_string()
        };

        self.limiter.acquire().await;
        self.client.append_message(handle, Role::User, text).await?;

        self.limiter.acquire().await;
        let run = self.client.create_run(handle, Some(&instructions)).await?;
        info!(%handle, run_id = %run.id, "submit: run created");

        let finished = self.poll_to_terminal(handle, &run.id).await?;
        if finished.state.is_failure() {
            return Err(EngineError::RunFailed {
                reason: finished.reason(),
            });
        }

        self.newest_assistant_message(handle).await
    }

    /// Auxiliary turn: ask for a JSON summary, extract, then delete the turn
    ///
    /// Best-effort: any failure is logged and reported as "no payload" so it
    /// can never fail the caller's request. On success both auxiliary
    /// messages are removed so the visible transcript stays conversational.
    pub async fn structured_followup(&self, handle: &str, schema_hint: &str) -> Option<Value> {
        let prompt = format!("{}\n{}", SUMMARIZE_PROMPT, schema_hint);

        let result: Result<Option<Value>, EngineError> = async {
            self.limiter.acquire().await;
            let user_msg = self.client.append_message(handle, Role::User, &prompt).await?;

            self.limiter.acquire().await;
            let run = self.client.create_run(handle, None).await?;

            let finished = self.poll_to_terminal(handle, &run.id).await?;
            if finished.state.is_failure() {
                warn!(%handle, reason = %finished.reason(), "structured_followup: run failed");
                return Ok(None);
            }

            let reply = self.newest_assistant_message(handle).await?;
            let payload = match extract_payload(&reply.text) {
                ExtractionResult::Payload(value) => value,
                ExtractionResult::NoPayload => return Ok(None),
            };

            // Scrub the auxiliary turn from the transcript
            self.limiter.acquire().await;
            let _ = self.client.delete_message(handle, &user_msg.id).await;
            self.limiter.acquire().await;
            let _ = self.client.delete_message(handle, &reply.id).await;

            Ok(Some(payload))
        }
        .await;

        match result {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%handle, error = %e, "structured_followup: failed, treating as no payload");
                None
            }
        }
    }

    /// Poll a run until it reaches a terminal state, bounded by attempts
    async fn poll_to_terminal(&self, handle: &str, run_id: &str) -> Result<RunJob, EngineError> {
        for attempt in 0..self.max_poll_attempts {
            self.limiter.acquire().await;
            let run = self.client.get_run(handle, run_id).await?;

            if run.state.is_terminal() {
                debug!(%handle, %run_id, state = ?run.state, attempt, "poll_to_terminal: terminal");
                return Ok(run);
            }

            debug!(%handle, %run_id, state = ?run.state, attempt, "poll_to_terminal: still running");
            sleep(self.poll_interval).await;
        }

        warn!(%handle, %run_id, attempts = self.max_poll_attempts, "poll_to_terminal: budget exhausted");
        Err(EngineError::Timeout {
            run_id: run_id.to_string(),
            attempts: self.max_poll_attempts,
        })
    }

    /// Fetch the most recent assistant message on the conversation
    async fn newest_assistant_message(&self, handle: &str) -> Result<MessageRecord, EngineError> {
        self.limiter.acquire().await;
        let messages = self.client.list_messages(handle).await?;

        messages
            .into_iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .ok_or_else(|| EngineError::ServiceUnavailable("run completed without an assistant reply".to_string()))
    }
}

/// Cheap heuristic: does the message sound like the user wants guidance?
fn needs_examples(text: &str) -> bool {
    let lower = text.to_lowercase();
    HELP_CUES.iter().any(|cue| lower.contains(cue))
}
