//! Job snapshots tracked in the active queue.
//!
//! A [`Job`] is created on queue-submission acknowledgement from the
//! backend, mutated by live progress messages or snapshot reconciliation,
//! and removed the instant it reaches a terminal state.

use serde::{Deserialize, Serialize};

use crate::types::{JobId, Timestamp};

/// Lifecycle state of a generation job.
///
/// Transitions are monotone: `Queued -> Processing -> {Completed | Failed}`,
/// with `Cancelled` reachable from `Queued` or `Processing` by user action
/// only.  Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// `true` once no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// `true` while a user-initiated cancel is still permitted.
    pub fn is_cancellable(self) -> bool {
        matches!(self, Self::Queued | Self::Processing)
    }
}

/// Snapshot of a single in-flight generation job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    /// Completion percentage (0-100).
    #[serde(default)]
    pub progress: u8,
    pub created_at: Timestamp,
    #[serde(default)]
    pub prompt: String,
}

impl Job {
    /// `true` once the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
