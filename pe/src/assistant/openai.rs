//! OpenAI Assistants-style API client implementation
//!
//! Implements the AssistantClient trait against a threads/runs HTTP backend.
//! All calls go through one retrying JSON helper with exponential backoff on
//! transient errors.

use reqwest::{Client, Method};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{AssistantClient, AssistantError, ConversationHandle, MessageRecord, Role, RunJob, RunState};
use crate::config::AssistantConfig;
use async_trait::async_trait;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Assistants-style threads/runs API client
pub struct OpenAiAssistantClient {
    api_key: String,
    base_url: String,
    assistant_id: String,
    http: Client,
}

impl OpenAiAssistantClient {
    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, AssistantError> {
        debug!(?config.base_url, ?config.assistant_id, "from_config: called");
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| AssistantError::InvalidResponse(format!("{} is not set", config.api_key_env)))?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(AssistantError::Network)?;

        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            assistant_id: config.assistant_id.clone(),
            http,
        })
    }

    /// Send one JSON request with bounded retry on transient failures
    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, AssistantError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "send_json: called");

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, %url, "send_json: retrying after transient error");
                sleep(Duration::from_millis(backoff)).await;
            }

            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .header("authorization", format!("Bearer {}", self.api_key))
                .header("openai-beta", "assistants=v2")
                .header("content-type", "application/json");

            if let Some(ref b) = body {
                request = request.json(b);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "send_json: network error");
                    last_error = Some(AssistantError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "send_json: retryable error");
                last_error = Some(AssistantError::ApiError { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                debug!(%status, "send_json: API error");
                let text = response.text().await.unwrap_or_default();
                return Err(AssistantError::ApiError { status, message: text });
            }

            debug!("send_json: success");
            return response.json().await.map_err(AssistantError::Network);
        }

        Err(last_error.unwrap_or_else(|| AssistantError::InvalidResponse("Max retries exceeded".to_string())))
    }

    fn parse_run(value: serde_json::Value) -> Result<RunJob, AssistantError> {
        let run: ApiRun = serde_json::from_value(value)?;
        Ok(RunJob {
            id: run.id,
            state: RunState::from_wire(&run.status),
            failure_reason: run.last_error.map(|e| e.message),
        })
    }

    fn parse_message(msg: ApiMessage) -> MessageRecord {
        // Concatenate text parts; non-text parts are ignored
        let text = msg
            .content
            .iter()
            .filter_map(|part| part.text.as_ref().map(|t| t.value.as_str()))
            .collect::<Vec<_>>()
            .join("\n");

        MessageRecord {
            id: msg.id,
            role: if msg.role == "assistant" { Role::Assistant } else { Role::User },
            text,
            created_at: msg.created_at,
        }
    }
}

#[async_trait]
impl AssistantClient for OpenAiAssistantClient {
    async fn create_conversation(&self) -> Result<ConversationHandle, AssistantError> {
        debug!("create_conversation: called");
        let value = self
            .send_json(Method::POST, "/v1/threads", Some(serde_json::json!({})))
            .await?;

        value["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AssistantError::InvalidResponse("thread response missing id".to_string()))
    }

    async fn append_message(&self, handle: &str, role: Role, text: &str) -> Result<MessageRecord, AssistantError> {
        debug!(%handle, ?role, "append_message: called");
        let body = serde_json::json!({
            "role": match role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            "content": text,
        });

        let value = self
            .send_json(Method::POST, &format!("/v1/threads/{}/messages", handle), Some(body))
            .await?;

        let msg: ApiMessage = serde_json::from_value(value)?;
        Ok(Self::parse_message(msg))
    }

    async fn create_run(&self, handle: &str, instructions: Option<&str>) -> Result<RunJob, AssistantError> {
        debug!(%handle, has_instructions = instructions.is_some(), "create_run: called");
        let mut body = serde_json::json!({
            "assistant_id": self.assistant_id,
        });
        if let Some(extra) = instructions {
            body["additional_instructions"] = serde_json::json!(extra);
        }

        let value = self
            .send_json(Method::POST, &format!("/v1/threads/{}/runs", handle), Some(body))
            .await?;

        Self::parse_run(value)
    }

    async fn get_run(&self, handle: &str, run_id: &str) -> Result<RunJob, AssistantError> {
        debug!(%handle, %run_id, "get_run: called");
        let value = self
            .send_json(Method::GET, &format!("/v1/threads/{}/runs/{}", handle, run_id), None)
            .await?;

        Self::parse_run(value)
    }

    async fn list_runs(&self, handle: &str) -> Result<Vec<RunJob>, AssistantError> {
        debug!(%handle, "list_runs: called");
        let value = self
            .send_json(Method::GET, &format!("/v1/threads/{}/runs", handle), None)
            .await?;

        let list: ApiList<serde_json::Value> = serde_json::from_value(value)?;
        list.data.into_iter().map(Self::parse_run).collect()
    }

    async fn list_messages(&self, handle: &str) -> Result<Vec<MessageRecord>, AssistantError> {
        debug!(%handle, "list_messages: called");
        let value = self
            .send_json(Method::GET, &format!("/v1/threads/{}/messages?order=asc", handle), None)
            .await?;

        let list: ApiList<ApiMessage> = serde_json::from_value(value)?;
        Ok(list.data.into_iter().map(Self::parse_message).collect())
    }

    async fn delete_message(&self, handle: &str, message_id: &str) -> Result<(), AssistantError> {
        debug!(%handle, %message_id, "delete_message: called");
        self.send_json(
            Method::DELETE,
            &format!("/v1/threads/{}/messages/{}", handle, message_id),
            None,
        )
        .await?;
        Ok(())
    }
}

// Assistants API response types

#[derive(Debug, Deserialize)]
struct ApiRun {
    id: String,
    status: String,
    last_error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    id: String,
    role: String,
    created_at: i64,
    #[serde(default)]
    content: Vec<ApiContentPart>,
}

#[derive(Debug, Deserialize)]
struct ApiContentPart {
    #[serde(default)]
    text: Option<ApiText>,
}

#[derive(Debug, Deserialize)]
struct ApiText {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ApiList<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable_status() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(408));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn test_parse_run_failed() {
        let value = serde_json::json!({
            "id": "run_abc",
            "status": "failed",
            "last_error": { "code": "server_error", "message": "something broke" }
        });

        let job = OpenAiAssistantClient::parse_run(value).unwrap();
        assert_eq!(job.id, "run_abc");
        assert_eq!(job.state, RunState::Failed);
        assert_eq!(job.failure_reason.as_deref(), Some("something broke"));
    }

    #[test]
    fn test_parse_run_in_progress() {
        let value = serde_json::json!({
            "id": "run_def",
            "status": "in_progress",
            "last_error": null
        });

        let job = OpenAiAssistantClient::parse_run(value).unwrap();
        assert_eq!(job.state, RunState::InProgress);
        assert!(job.failure_reason.is_none());
    }

    #[test]
    fn test_parse_message_concatenates_text_parts() {
        let msg: ApiMessage = serde_json::from_value(serde_json::json!({
            "id": "msg_1",
            "role": "assistant",
            "created_at": 1700000000,
            "content": [
                { "type": "text", "text": { "value": "part one" } },
                { "type": "image_file", "image_file": { "file_id": "f1" } },
                { "type": "text", "text": { "value": "part two" } }
            ]
        }))
        .unwrap();

        let record = OpenAiAssistantClient::parse_message(msg);
        assert_eq!(record.role, Role::Assistant);
        assert_eq!(record.text, "part one\npart two");
    }
}
