//! Assistant service client module
//!
//! Provides the conversation/run abstraction over the assistant backend.

mod client;
mod error;
mod openai;
mod types;

pub use client::AssistantClient;
pub use error::AssistantError;
pub use openai::OpenAiAssistantClient;
pub use types::{ConversationHandle, MessageRecord, Role, RunJob, RunState};

#[cfg(test)]
pub use client::mock;
