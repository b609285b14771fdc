//! OpenAI Assistants (v2) implementation of `AssistantService`.
//!
//! Plain REST over reqwest: threads, messages, runs.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{AssistantService, RunSnapshot, ThreadMessage};
use crate::config::ClassifierConfig;
use crate::error::ClassifierError;

const PROVIDER: &str = "openai";

/// Header value selecting the Assistants v2 API.
const ASSISTANTS_BETA: &str = "assistants=v2";

/// How many thread messages to fetch when reading the label.
const MESSAGE_PAGE_SIZE: u32 = 20;

/// OpenAI Assistants API client.
pub struct OpenAiAssistants {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    request_timeout: Duration,
}

impl OpenAiAssistants {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClassifierError::RequestFailed {
                provider: PROVIDER.into(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request_timeout: config.request_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Send an authenticated request and decode a JSON body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<T, ClassifierError> {
        let response = request
            .bearer_auth(self.api_key.expose_secret())
            .header("OpenAI-Beta", ASSISTANTS_BETA)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Timeout {
                        provider: PROVIDER.into(),
                        timeout: self.request_timeout,
                    }
                } else {
                    ClassifierError::RequestFailed {
                        provider: PROVIDER.into(),
                        reason: format!("{operation}: {e}"),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                operation,
                status = status.as_u16(),
                "Assistant service rejected request"
            );
            return Err(ClassifierError::Api {
                provider: PROVIDER.into(),
                status: status.as_u16(),
                message: api_error_message(&body, status),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClassifierError::InvalidResponse {
                provider: PROVIDER.into(),
                reason: format!("{operation}: {e}"),
            })
    }
}

#[derive(Deserialize)]
struct ThreadObject {
    id: String,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Pull the human-readable message out of an OpenAI error body.
fn api_error_message(body: &str, status: reqwest::StatusCode) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            let trimmed: String = body.trim().chars().take(200).collect();
            if trimmed.is_empty() {
                status.to_string()
            } else {
                trimmed
            }
        })
}

#[async_trait]
impl AssistantService for OpenAiAssistants {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn create_thread(&self) -> Result<String, ClassifierError> {
        let thread: ThreadObject = self
            .send(
                self.client.post(self.url("threads")).json(&serde_json::json!({})),
                "create_thread",
            )
            .await?;
        Ok(thread.id)
    }

    async fn create_message(&self, thread_id: &str, content: &str) -> Result<(), ClassifierError> {
        let _: serde_json::Value = self
            .send(
                self.client
                    .post(self.url(&format!("threads/{thread_id}/messages")))
                    .json(&serde_json::json!({
                        "role": "user",
                        "content": content,
                    })),
                "create_message",
            )
            .await?;
        Ok(())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunSnapshot, ClassifierError> {
        self.send(
            self.client
                .post(self.url(&format!("threads/{thread_id}/runs")))
                .json(&serde_json::json!({ "assistant_id": assistant_id })),
            "create_run",
        )
        .await
    }

    async fn retrieve_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunSnapshot, ClassifierError> {
        self.send(
            self.client
                .get(self.url(&format!("threads/{thread_id}/runs/{run_id}"))),
            "retrieve_run",
        )
        .await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, ClassifierError> {
        let list: MessageList = self
            .send(
                self.client.get(self.url(&format!(
                    "threads/{thread_id}/messages?order=desc&limit={MESSAGE_PAGE_SIZE}"
                ))),
                "list_messages",
            )
            .await?;
        Ok(list.data)
    }
}
