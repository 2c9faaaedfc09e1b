//! Live-channel message types and parser.
//!
//! The backend pushes JSON envelopes over WebSocket with the shape
//! `{"type": "<kind>", ...kind-specific fields}`.  This module
//! deserializes them into a strongly-typed [`SocketMessage`] enum over a
//! closed set of kinds.  Unknown kinds are reported separately from
//! malformed payloads so the transport can stay forward-compatible.

use serde::Deserialize;

use easel_core::job::{Job, JobStatus};
use easel_core::params::GenerationParams;
use easel_core::results::GenerationResult;
use easel_core::status::SystemStatus;
use easel_core::types::{JobId, Timestamp};

/// All known live-channel message kinds.
///
/// Deserialized via the internally-tagged `"type"` field; the remaining
/// envelope fields are the variant payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum SocketMessage {
    /// Progress update for a single job.
    #[serde(rename = "progress")]
    Progress(ProgressUpdate),

    /// A job finished and produced a result.
    #[serde(rename = "completed")]
    Completed(CompletionPayload),

    /// A job failed with an error.
    #[serde(rename = "error")]
    Error(FailurePayload),

    /// Bulk snapshot of the backend's active queue.
    #[serde(rename = "queue_update")]
    QueueUpdate(QueueSnapshot),

    /// Backend health/load broadcast.
    #[serde(rename = "system_status")]
    SystemStatus(SystemStatus),

    /// A job began executing.  Informational only.
    #[serde(rename = "job_started")]
    JobStarted(JobStarted),
}

/// Payload for `progress` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressUpdate {
    pub job_id: JobId,
    /// Completion percentage (0-100).
    pub progress: u8,
    /// Updated status, when the backend includes one.
    #[serde(default)]
    pub status: Option<JobStatus>,
}

/// Payload for `completed` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionPayload {
    pub job_id: JobId,
    /// Identifier of the persisted result record.
    pub result_id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default = "default_created_at")]
    pub created_at: Timestamp,
    #[serde(default)]
    pub params: GenerationParams,
}

fn default_created_at() -> Timestamp {
    chrono::Utc::now()
}

impl CompletionPayload {
    /// Build the display record for this completion.
    pub fn into_result(self) -> GenerationResult {
        GenerationResult {
            id: self.result_id,
            job_id: self.job_id,
            prompt: self.prompt,
            image_url: self.image_url,
            created_at: self.created_at,
            params: self.params,
        }
    }
}

/// Payload for `error` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct FailurePayload {
    pub job_id: JobId,
    /// Backend-supplied error description.
    #[serde(default)]
    pub message: String,
}

/// Payload for `queue_update` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSnapshot {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

/// Payload for `job_started` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStarted {
    pub job_id: JobId,
}

/// Why an inbound frame could not be turned into a [`SocketMessage`].
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Bad JSON, or a known kind whose payload did not match.
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Well-formed envelope with a kind this client does not recognize.
    /// Callers log these and continue.
    #[error("Unknown message kind: {0}")]
    UnknownKind(String),
}

/// Kinds this client understands; anything else is [`ParseError::UnknownKind`].
const KNOWN_KINDS: &[&str] = &[
    "progress",
    "completed",
    "error",
    "queue_update",
    "system_status",
    "job_started",
];

/// Parse a live-channel text frame into a typed message.
pub fn parse_message(text: &str) -> Result<SocketMessage, ParseError> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    if let Some(kind) = value.get("type").and_then(serde_json::Value::as_str) {
        if !KNOWN_KINDS.contains(&kind) {
            return Err(ParseError::UnknownKind(kind.to_string()));
        }
    }

    Ok(serde_json::from_value(value)?)
}
