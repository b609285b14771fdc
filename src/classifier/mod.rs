//! Classification client — asks an assistant service which bucket a message
//! belongs to.
//!
//! One classification is one conversation thread:
//! 1. Create a fresh thread (never reused across requests)
//! 2. Post the framed user message
//! 3. Start a run against the configured assistant
//! 4. Wait for a terminal state (`poll::RunPoller`)
//! 5. On completion, read the newest assistant reply as the label

pub mod openai;
pub mod poll;

pub use openai::OpenAiAssistants;
pub use poll::{Clock, RunPoller, RunState, TokioClock};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ClassifierError;

/// Label used when a completed run produced no usable text.
pub const DEFAULT_BUCKET: &str = "Miscellaneous";

/// Frame placed in front of every message sent to the classifier.
const QUERY_FRAME: &str = "The incoming query is: ";

// ── Wire-level types ────────────────────────────────────────────────

/// Run status as reported by the assistant service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteRunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    /// Any status this service does not know about yet.
    #[serde(other)]
    Unknown,
}

/// A run as returned by create/retrieve.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunSnapshot {
    pub id: String,
    pub thread_id: String,
    pub status: RemoteRunStatus,
}

/// One message in a thread.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

/// A content segment of a thread message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    pub value: String,
}

// ── Service seam ────────────────────────────────────────────────────

/// Operations the classifier needs from a conversational-assistant service.
///
/// None of these calls are idempotent, so callers never retry them.
#[async_trait]
pub trait AssistantService: Send + Sync {
    /// Service name for logs and errors.
    fn name(&self) -> &str;

    /// Open a new conversation thread. Returns its id.
    async fn create_thread(&self) -> Result<String, ClassifierError>;

    /// Append a user message to a thread.
    async fn create_message(&self, thread_id: &str, content: &str) -> Result<(), ClassifierError>;

    /// Start a run of `assistant_id` over the thread.
    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunSnapshot, ClassifierError>;

    /// Fetch the current state of a run.
    async fn retrieve_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunSnapshot, ClassifierError>;

    /// List thread messages, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, ClassifierError>;
}

// ── Client ──────────────────────────────────────────────────────────

/// One classification attempt, after it reached a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRun {
    pub run_id: String,
    pub conversation_id: String,
    pub status: RunState,
}

/// Result of `ClassificationClient::classify`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub run: ConversationRun,
    /// Present only when the run completed.
    pub label: Option<String>,
}

/// Drives a single classification through the assistant service.
pub struct ClassificationClient {
    service: Arc<dyn AssistantService>,
    poller: RunPoller,
    assistant_id: String,
}

impl ClassificationClient {
    pub fn new(
        service: Arc<dyn AssistantService>,
        assistant_id: impl Into<String>,
        poller: RunPoller,
    ) -> Self {
        Self {
            service,
            poller,
            assistant_id: assistant_id.into(),
        }
    }

    /// Classify one message.
    ///
    /// A run that fails or times out is not an error: it comes back with
    /// `label: None`. Errors are reserved for calls that could not be made
    /// or that the service rejected.
    pub async fn classify(&self, message: &str) -> Result<Classification, ClassifierError> {
        let thread_id = self.service.create_thread().await?;
        debug!(thread_id = %thread_id, "Conversation thread created");

        self.service
            .create_message(&thread_id, &frame_query(message))
            .await?;

        let created = self
            .service
            .create_run(&thread_id, &self.assistant_id)
            .await?;
        debug!(
            thread_id = %thread_id,
            run_id = %created.id,
            status = ?created.status,
            "Classification run started"
        );

        let run = self.poller.wait(self.service.as_ref(), created).await?;

        let label = match run.status {
            RunState::Completed => {
                let messages = self.service.list_messages(&run.conversation_id).await?;
                let label = extract_label(&messages);
                info!(run_id = %run.run_id, bucket = %label, "Message classified");
                Some(label)
            }
            status => {
                warn!(
                    run_id = %run.run_id,
                    thread_id = %run.conversation_id,
                    status = %status,
                    "Classification run ended without a label"
                );
                None
            }
        };

        Ok(Classification { run, label })
    }
}

/// Wrap the inbound message in the classifier's instruction frame.
fn frame_query(message: &str) -> String {
    format!("{QUERY_FRAME}{message}")
}

/// Pick the label from a newest-first message list.
///
/// Reads the first text segment of the most recent assistant message.
/// Falls back to `DEFAULT_BUCKET` when there is nothing usable.
pub fn extract_label(messages: &[ThreadMessage]) -> String {
    messages
        .iter()
        .find(|m| m.role == "assistant")
        .and_then(|m| {
            m.content.iter().find_map(|c| match c {
                MessageContent::Text { text } => Some(text.value.trim()),
                MessageContent::Other => None,
            })
        })
        .filter(|label| !label.is_empty())
        .unwrap_or(DEFAULT_BUCKET)
        .to_string()
}

// ── Test doubles ────────────────────────────────────────────────────
