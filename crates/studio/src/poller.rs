//! Fallback status poller.
//!
//! Periodic request-based refresh of the backend's status snapshot, used
//! when the live transport is degraded or the deployment lacks the push
//! channel.  One poller instance is shared by all UI consumers through
//! reference-counted activation: the periodic task starts with the first
//! [`StatusPoller::acquire`] and stops when the last guard is released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use easel_backend::api::{ApiError, GenerationBackend};
use easel_core::status::SystemState;

use crate::tokens::TokenIssuer;

/// Shared handle to the fallback poller.
pub struct StatusPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    backend: Arc<dyn GenerationBackend>,
    state: Arc<RwLock<SystemState>>,
    interval: Duration,
    /// Single in-flight-request guard: concurrent hydration callers wait
    /// here and observe the first caller's outcome; periodic ticks skip.
    fetch_gate: tokio::sync::Mutex<()>,
    tokens: TokenIssuer,
    /// Set once the status endpoint reported "not found"; never cleared.
    disabled: AtomicBool,
    activation: std::sync::Mutex<Activation>,
}

#[derive(Default)]
struct Activation {
    consumers: usize,
    cancel: Option<CancellationToken>,
}

impl StatusPoller {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        state: Arc<RwLock<SystemState>>,
        interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                backend,
                state,
                interval,
                fetch_gate: tokio::sync::Mutex::new(()),
                tokens: TokenIssuer::new(),
                disabled: AtomicBool::new(false),
                activation: std::sync::Mutex::new(Activation::default()),
            }),
        }
    }

    /// Register a consumer.  The periodic task starts with the first
    /// registration and stops when the last [`PollerGuard`] drops.
    pub fn acquire(&self) -> PollerGuard {
        let mut activation = self
            .inner
            .activation
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        activation.consumers += 1;

        if activation.consumers == 1 && !self.inner.disabled.load(Ordering::SeqCst) {
            let cancel = CancellationToken::new();
            tokio::spawn(poll_loop(Arc::clone(&self.inner), cancel.clone()));
            activation.cancel = Some(cancel);
            tracing::debug!(
                interval_ms = self.inner.interval.as_millis() as u64,
                "Status polling started",
            );
        }

        PollerGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Perform one status fetch if none has settled yet.
    ///
    /// Idempotent and safe to call from multiple independent consumers:
    /// concurrent callers await the same pending request rather than
    /// issuing duplicates.
    pub async fn ensure_hydrated(&self) {
        if self.inner.state.read().await.hydrated {
            return;
        }

        let _gate = self.inner.fetch_gate.lock().await;
        if self.inner.state.read().await.hydrated {
            // A concurrent caller hydrated while we waited for the gate.
            return;
        }
        self.inner.fetch_status().await;
    }

    /// Snapshot of the current system state.
    pub async fn state(&self) -> SystemState {
        self.inner.state.read().await.clone()
    }

    /// `true` while the periodic task is active.
    pub fn is_polling(&self) -> bool {
        self.inner
            .activation
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cancel
            .as_ref()
            .is_some_and(|cancel| !cancel.is_cancelled())
    }
}

/// RAII registration for one poller consumer.
pub struct PollerGuard {
    inner: Arc<PollerInner>,
}

impl Drop for PollerGuard {
    fn drop(&mut self) {
        let mut activation = self.inner.activation.lock().unwrap_or_else(|e| e.into_inner());
        activation.consumers = activation.consumers.saturating_sub(1);
        if activation.consumers == 0 {
            if let Some(cancel) = activation.cancel.take() {
                cancel.cancel();
                tracing::debug!("Status polling stopped (last consumer released)");
            }
        }
    }
}

/// Periodic task: fetch on a fixed interval until cancelled.
async fn poll_loop(inner: Arc<PollerInner>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(inner.interval);
    // The first tick fires immediately; hydration owns the initial fetch.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => inner.poll_tick().await,
        }
    }
}

impl PollerInner {
    /// One periodic refresh.  Skips (never queues) when a fetch is
    /// already in flight.
    async fn poll_tick(&self) {
        let Ok(_gate) = self.fetch_gate.try_lock() else {
            tracing::debug!("Status fetch already in flight; skipping tick");
            return;
        };
        self.fetch_status().await;
    }

    /// Fetch the status snapshot and fold the outcome into the shared
    /// state.  Callers must hold the fetch gate.
    async fn fetch_status(&self) {
        if self.disabled.load(Ordering::SeqCst) {
            return;
        }

        let token = self.tokens.issue();
        let result = self.backend.system_status().await;

        if !self.tokens.is_current(token) {
            tracing::debug!("Discarding superseded status response");
            return;
        }

        let mut state = self.state.write().await;
        match result {
            Ok(status) => {
                state.apply_status(status);
                state.api_available = true;
            }
            Err(ApiError::NotFound) => {
                // Feature-absence signal, not a transient fault.
                tracing::warn!("Status endpoint not found; polling disabled for this session");
                state.mark_unavailable();
                self.disabled.store(true, Ordering::SeqCst);
                self.stop_polling();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Status fetch failed");
                state.mark_degraded();
            }
        }
    }

    fn stop_polling(&self) {
        let mut activation = self.activation.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cancel) = activation.cancel.take() {
            cancel.cancel();
        }
    }
}
