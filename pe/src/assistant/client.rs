//! AssistantClient trait definition

use async_trait::async_trait;

use super::{AssistantError, ConversationHandle, MessageRecord, Role, RunJob};

/// Stateful assistant backend - conversations live upstream
///
/// This is the core abstraction over the assistant service. Unlike a plain
/// completion API, the backend owns conversation state: the engine creates a
/// conversation once per document section and keeps appending to it. Runs are
/// asynchronous; completion is discovered by polling `get_run`.
#[async_trait]
pub trait AssistantClient: Send + Sync {
    /// Create a new conversation and return its opaque handle
    async fn create_conversation(&self) -> Result<ConversationHandle, AssistantError>;

    /// Append a message to a conversation
    async fn append_message(&self, handle: &str, role: Role, text: &str) -> Result<MessageRecord, AssistantError>;

    /// Start a new run against a conversation, optionally with per-call instructions
    async fn create_run(&self, handle: &str, instructions: Option<&str>) -> Result<RunJob, AssistantError>;

    /// Fetch the current state of a run
    async fn get_run(&self, handle: &str, run_id: &str) -> Result<RunJob, AssistantError>;

    /// List runs for a conversation, newest first
    async fn list_runs(&self, handle: &str) -> Result<Vec<RunJob>, AssistantError>;

    /// List messages in a conversation, oldest first
    async fn list_messages(&self, handle: &str) -> Result<Vec<MessageRecord>, AssistantError>;

    /// Delete a message from a conversation
    async fn delete_message(&self, handle: &str, message_id: &str) -> Result<(), AssistantError>;
}
