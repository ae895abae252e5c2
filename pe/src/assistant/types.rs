//! Assistant service wire types
//!
//! These types model a threads/runs style assistant backend but are
//! provider-agnostic enough to support other backends in the future.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Opaque reference to a stateful dialogue session in the assistant service
pub type ConversationHandle = String;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message stored in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Upstream message ID (needed for deletion)
    pub id: String,
    pub role: Role,
    pub text: String,
    /// Creation timestamp (unix seconds, upstream clock)
    pub created_at: i64,
}

impl MessageRecord {
    /// Create a user message record
    pub fn user(id: impl Into<String>, text: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            text: text.into(),
            created_at,
        }
    }

    /// Create an assistant message record
    pub fn assistant(id: impl Into<String>, text: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            text: text.into(),
            created_at,
        }
    }
}

/// State of one asynchronous run against a conversation
///
/// `Queued → InProgress → {Completed, Failed, Cancelled, Expired}`, with
/// `Cancelling` as a transient sub-state of `InProgress`. Terminal states are
/// absorbing: the engine only ever observes state by polling and never sees a
/// terminal run change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Queued,
    InProgress,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
    Expired,
}

impl RunState {
    /// Parse from the upstream status string
    pub fn from_wire(s: &str) -> Self {
        debug!(%s, "RunState::from_wire: called");
        match s {
            "queued" => RunState::Queued,
            "in_progress" => RunState::InProgress,
            "cancelling" => RunState::Cancelling,
            "completed" => RunState::Completed,
            "failed" => RunState::Failed,
            "cancelled" => RunState::Cancelled,
            "expired" => RunState::Expired,
            _ => {
                debug!(%s, "RunState::from_wire: unknown status, treating as in_progress");
                RunState::InProgress
            }
        }
    }

    /// Whether this state is terminal (absorbing)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Failed | RunState::Cancelled | RunState::Expired
        )
    }

    /// Whether this state is a terminal failure (anything terminal except Completed)
    pub fn is_failure(&self) -> bool {
        matches!(self, RunState::Failed | RunState::Cancelled | RunState::Expired)
    }
}

/// One asynchronous request/response cycle against a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunJob {
    /// Upstream run ID
    pub id: String,
    pub state: RunState,
    /// Upstream failure reason, present for failed/cancelled/expired runs
    pub failure_reason: Option<String>,
}

impl RunJob {
    /// Human-readable reason for a failed run
    pub fn reason(&self) -> String {
        self.failure_reason
            .clone()
            .unwrap_or_else(|| format!("run ended in state {:?}", self.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_state_from_wire() {
        assert_eq!(RunState::from_wire("queued"), RunState::Queued);
        assert_eq!(RunState::from_wire("in_progress"), RunState::InProgress);
        assert_eq!(RunState::from_wire("cancelling"), RunState::Cancelling);
        assert_eq!(RunState::from_wire("completed"), RunState::Completed);
        assert_eq!(RunState::from_wire("failed"), RunState::Failed);
        assert_eq!(RunState::from_wire("cancelled"), RunState::Cancelled);
        assert_eq!(RunState::from_wire("expired"), RunState::Expired);
        // Unknown statuses keep the poll loop going
        assert_eq!(RunState::from_wire("requires_action"), RunState::InProgress);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RunState::Queued.is_terminal());
        assert!(!RunState::InProgress.is_terminal());
        assert!(!RunState::Cancelling.is_terminal());
        assert!(RunState::Completed.is_terminal());
        assert!(RunState::Failed.is_terminal());
        assert!(RunState::Cancelled.is_terminal());
        assert!(RunState::Expired.is_terminal());
    }

    #[test]
    fn test_failure_states() {
        assert!(!RunState::Completed.is_failure());
        assert!(RunState::Failed.is_failure());
        assert!(RunState::Cancelled.is_failure());
        assert!(RunState::Expired.is_failure());
    }

    #[test]
    fn test_run_job_reason_fallback() {
        let job = RunJob {
            id: "run_1".to_string(),
            state: RunState::Cancelled,
            failure_reason: None,
        };
        assert!(job.reason().contains("Cancelled"));

        let job = RunJob {
            id: "run_2".to_string(),
            state: RunState::Failed,
            failure_reason: Some("rate limit exceeded".to_string()),
        };
        assert_eq!(job.reason(), "rate limit exceeded");
    }
}
