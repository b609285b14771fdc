//! Shared types for the message pipeline: request bodies, outcomes, and the
//! response envelope.

use serde::{Deserialize, Serialize};

use crate::error::{Error, PipelineError};

// ── Request bodies ──────────────────────────────────────────────────

/// Body of `POST /send-message`.
///
/// Both fields are optional at the wire level. A request missing either one
/// is answered with success and does nothing. A field that is not a string
/// counts as missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundRequest {
    #[serde(default, deserialize_with = "string_or_none")]
    pub message: Option<String>,
    /// Older clients send this as `hash`.
    #[serde(
        default,
        rename = "tenantHash",
        alias = "hash",
        deserialize_with = "string_or_none"
    )]
    pub tenant_hash: Option<String>,
}

/// An inbound request with both fields present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRequest {
    pub message: String,
    pub tenant_hash: String,
}

impl InboundRequest {
    pub fn new(message: impl Into<String>, tenant_hash: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            tenant_hash: Some(tenant_hash.into()),
        }
    }

    /// `None` when either field is missing or empty.
    pub fn validate(self) -> Option<ValidRequest> {
        let message = self.message.filter(|m| !m.is_empty())?;
        let tenant_hash = self.tenant_hash.filter(|h| !h.is_empty())?;
        Some(ValidRequest {
            message,
            tenant_hash,
        })
    }
}

/// Body of `POST /create-user-tables`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisionRequest {
    #[serde(default, deserialize_with = "string_or_none")]
    pub hash: Option<String>,
}

/// Accept any JSON value, keeping it only when it is a string.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// Decode a JSON request body. Only input that is not JSON at all, or not
/// a JSON object, is rejected.
pub fn parse_body<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(bytes).map_err(|e| PipelineError::InvalidBody(e.to_string()).into())
}

// ── Outcome ─────────────────────────────────────────────────────────

/// What the send-message pipeline did with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationOutcome {
    /// Classified and written to the tenant table.
    Stored { bucket: String },
    /// The run ended without producing a label; nothing written.
    SkippedNoLabel,
    /// The run did not finish before the deadline; nothing written.
    SkippedTimedOut,
    /// `message` or `tenantHash` missing; nothing attempted.
    SkippedInvalidRequest,
}

impl ClassificationOutcome {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stored { .. } => "stored",
            Self::SkippedNoLabel => "skipped_no_label",
            Self::SkippedTimedOut => "skipped_timed_out",
            Self::SkippedInvalidRequest => "skipped_invalid_request",
        }
    }
}

// ── Envelope ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    Success,
    Error,
}

/// Uniform `{status, code, message}` body returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseEnvelope {
    pub status: EnvelopeStatus,
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ClassificationOutcome>,
}

impl ResponseEnvelope {
    pub fn success() -> Self {
        Self {
            status: EnvelopeStatus::Success,
            code: 200,
            message: String::new(),
            outcome: None,
        }
    }

    pub fn with_outcome(mut self, outcome: ClassificationOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Error,
            code,
            message: message.into(),
            outcome: None,
        }
    }

    pub fn from_error(err: &Error) -> Self {
        Self::error(err.status_code(), err.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.status == EnvelopeStatus::Success
    }
}
