//! Last known health snapshot of the remote system.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Coarse health classification reported by (or inferred about) the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unavailable,
}

/// Snapshot of backend-side load and capacity figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub queue_length: u32,
    pub gpu_available: bool,
    pub vram_used_mb: u64,
    pub vram_total_mb: u64,
    pub health: HealthState,
    #[serde(default = "default_last_updated")]
    pub last_updated: Timestamp,
}

fn default_last_updated() -> Timestamp {
    chrono::Utc::now()
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self {
            queue_length: 0,
            gpu_available: false,
            vram_used_mb: 0,
            vram_total_mb: 0,
            health: HealthState::Unavailable,
            last_updated: chrono::Utc::now(),
        }
    }
}

/// Poller-owned view of the remote system: the latest status plus the
/// hydration and availability flags the UI keys its placeholders on.
#[derive(Debug, Clone)]
pub struct SystemState {
    pub status: SystemStatus,
    /// `true` once at least one status fetch has settled (successfully or
    /// not); clears any loading placeholder.
    pub hydrated: bool,
    /// `false` once the status endpoint reported "not found" — a permanent
    /// feature-absence signal for the session.
    pub api_available: bool,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            status: SystemStatus::default(),
            hydrated: false,
            api_available: true,
        }
    }
}

impl SystemState {
    /// Replace the status from a fresh payload.
    ///
    /// Does not touch `api_available`: that flag describes the REST status
    /// endpoint and is owned by the poller.
    pub fn apply_status(&mut self, status: SystemStatus) {
        self.status = status;
        self.hydrated = true;
    }

    /// A transient fetch failure: data may be stale or defaulted, but the
    /// loading placeholder still clears.
    pub fn mark_degraded(&mut self) {
        self.status.health = HealthState::Degraded;
        self.hydrated = true;
    }

    /// The status endpoint does not exist on this deployment.
    pub fn mark_unavailable(&mut self) {
        self.status.health = HealthState::Unavailable;
        self.api_available = false;
        self.hydrated = true;
    }
}
