//! Live WebSocket transport with automatic reconnection.
//!
//! [`Transport`] owns one connection to the backend's progress endpoint:
//! it connects, decodes inbound frames into [`SocketMessage`]s, and on any
//! drop re-enters an exponential-backoff reconnect cycle until
//! [`Transport::stop`] is called.  Every state transition emits a
//! [`ConnectionSnapshot`] to an observer callback; that stream is the sole
//! mechanism by which other layers detect connectivity.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use easel_core::types::Timestamp;

use crate::messages::{parse_message, ParseError, SocketMessage};
use crate::reconnect::{delay_for_attempt, ReconnectConfig};

/// Fixed path suffix of the progress WebSocket endpoint.
pub const PROGRESS_PATH: &str = "/ws/progress";

// Snapshot event names, one per transition.
pub const EVENT_IDLE: &str = "idle";
pub const EVENT_CONNECTING: &str = "connecting";
pub const EVENT_CONNECTED: &str = "connected";
pub const EVENT_CONNECT_FAILED: &str = "connect_failed";
pub const EVENT_DISCONNECTED: &str = "disconnected";
pub const EVENT_RECONNECT_SCHEDULED: &str = "reconnect_scheduled";
pub const EVENT_STOPPED: &str = "stopped";

/// Connection state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    Idle,
    Connecting,
    Connected,
    Error,
    ReconnectScheduled,
}

/// Structured telemetry emitted on every transport state transition.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSnapshot {
    /// Transition name (`connected`, `reconnect_scheduled`, ...).
    pub event: &'static str,
    pub phase: ConnectionPhase,
    pub timestamp: Timestamp,
    /// The WebSocket endpoint this transport targets.
    pub endpoint: String,
    pub connected: bool,
    /// Reconnect attempts since the last successful open.
    pub attempts: u32,
    /// Delay before the next scheduled retry, when one is pending.
    pub next_retry_ms: Option<u64>,
    /// Cumulative downtime since the first unresolved failure.
    pub downtime_ms: u64,
    pub last_error: Option<String>,
}

impl ConnectionSnapshot {
    /// The snapshot before `start()` has ever run.
    pub fn idle(endpoint: impl Into<String>) -> Self {
        Self {
            event: EVENT_IDLE,
            phase: ConnectionPhase::Idle,
            timestamp: chrono::Utc::now(),
            endpoint: endpoint.into(),
            connected: false,
            attempts: 0,
            next_retry_ms: None,
            downtime_ms: 0,
            last_error: None,
        }
    }
}

/// Observer invoked with every [`ConnectionSnapshot`].  Decoupled from any
/// logging sink; the orchestration layer feeds these into its own state.
pub type SnapshotObserver = Arc<dyn Fn(ConnectionSnapshot) + Send + Sync>;

/// Connection configuration for the live transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// HTTP base URL of the backend (e.g. `http://host:7860`).
    pub base_url: String,
    pub reconnect: ReconnectConfig,
}

impl TransportConfig {
    /// The WebSocket endpoint derived from the HTTP base URL: scheme
    /// upgraded (`http` -> `ws`, `https` -> `wss`) and the fixed progress
    /// path appended.
    pub fn endpoint(&self) -> String {
        socket_endpoint(&self.base_url)
    }
}

/// Derive the progress WebSocket URL from an HTTP base URL.
pub fn socket_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    let upgraded = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        trimmed.to_string()
    };
    format!("{upgraded}{PROGRESS_PATH}")
}

/// Owns the live connection, its reconnection policy, and inbound decoding.
///
/// Decoded messages are forwarded over the channel given to [`Transport::new`];
/// the timer and socket handle are private to the connection task.
pub struct Transport {
    config: Arc<TransportConfig>,
    message_tx: mpsc::UnboundedSender<SocketMessage>,
    observer: SnapshotObserver,
    retry_now: Arc<Notify>,
    running: std::sync::Mutex<Option<RunningSession>>,
}

struct RunningSession {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

impl Transport {
    /// Create a transport.  Nothing connects until [`Transport::start`].
    pub fn new(
        config: TransportConfig,
        message_tx: mpsc::UnboundedSender<SocketMessage>,
        observer: impl Fn(ConnectionSnapshot) + Send + Sync + 'static,
    ) -> Self {
        Self {
            config: Arc::new(config),
            message_tx,
            observer: Arc::new(observer),
            retry_now: Arc::new(Notify::new()),
            running: std::sync::Mutex::new(None),
        }
    }

    /// Open the connection and keep it alive until [`Transport::stop`].
    ///
    /// Idempotent: calling `start` while the session task is alive is a
    /// no-op.
    pub fn start(&self) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = running.as_ref() {
            if !session.handle.is_finished() {
                tracing::debug!("Transport already running");
                return;
            }
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(session_loop(
            Arc::clone(&self.config),
            self.message_tx.clone(),
            Arc::clone(&self.observer),
            Arc::clone(&self.retry_now),
            cancel.clone(),
        ));

        *running = Some(RunningSession { cancel, handle });
    }

    /// Close intentionally.  Cancels any pending backoff timer and
    /// suppresses reconnection; a later [`Transport::start`] begins a fresh
    /// session.
    pub fn stop(&self) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = running.take() {
            tracing::info!(endpoint = %self.config.endpoint(), "Stopping transport");
            session.cancel.cancel();
        }
    }

    /// Force an immediate retry, skipping a pending backoff sleep.
    /// No-op while connected or stopped.
    pub fn reconnect(&self) {
        self.retry_now.notify_waiters();
    }

    /// `true` while the session task is alive.
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }
}

// ---------------------------------------------------------------------------
// Session loop
// ---------------------------------------------------------------------------

/// Telemetry bookkeeping for one session task.
struct Telemetry {
    observer: SnapshotObserver,
    endpoint: String,
    attempts: u32,
    downtime_ms: u64,
    down_since: Option<Instant>,
    last_error: Option<String>,
}

impl Telemetry {
    fn emit(
        &self,
        event: &'static str,
        phase: ConnectionPhase,
        connected: bool,
        next_retry_ms: Option<u64>,
    ) {
        let downtime_ms = self.downtime_ms
            + self
                .down_since
                .map_or(0, |since| since.elapsed().as_millis() as u64);

        (self.observer)(ConnectionSnapshot {
            event,
            phase,
            timestamp: chrono::Utc::now(),
            endpoint: self.endpoint.clone(),
            connected,
            attempts: self.attempts,
            next_retry_ms,
            downtime_ms,
            last_error: self.last_error.clone(),
        });
    }

    /// The downtime clock starts at the first unresolved failure and runs
    /// until a successful open folds it into the cumulative total.
    fn mark_down(&mut self) {
        if self.down_since.is_none() {
            self.down_since = Some(Instant::now());
        }
    }

    fn mark_up(&mut self) {
        if let Some(since) = self.down_since.take() {
            self.downtime_ms += since.elapsed().as_millis() as u64;
        }
    }
}

/// How one connected session ended.
enum SessionEnd {
    Cancelled,
    Closed,
    Failed(String),
}

/// Core loop: connect -> read frames -> backoff -> reconnect, until
/// cancelled.  A construction-time connect failure takes the same path as
/// a post-connect drop.
async fn session_loop(
    config: Arc<TransportConfig>,
    message_tx: mpsc::UnboundedSender<SocketMessage>,
    observer: SnapshotObserver,
    retry_now: Arc<Notify>,
    cancel: CancellationToken,
) {
    let endpoint = config.endpoint();
    let mut telemetry = Telemetry {
        observer,
        endpoint: endpoint.clone(),
        attempts: 0,
        downtime_ms: 0,
        down_since: None,
        last_error: None,
    };

    loop {
        let client_id = uuid::Uuid::new_v4();
        let url = format!("{endpoint}?clientId={client_id}");

        telemetry.emit(EVENT_CONNECTING, ConnectionPhase::Connecting, false, None);

        let connect = tokio::select! {
            _ = cancel.cancelled() => {
                telemetry.emit(EVENT_STOPPED, ConnectionPhase::Idle, false, None);
                return;
            }
            result = connect_async(&url) => result,
        };

        match connect {
            Ok((ws_stream, _response)) => {
                tracing::info!(endpoint = %endpoint, client_id = %client_id, "Live channel connected");
                telemetry.attempts = 0;
                telemetry.last_error = None;
                telemetry.mark_up();
                telemetry.emit(EVENT_CONNECTED, ConnectionPhase::Connected, true, None);

                let end = drive_session(ws_stream, &message_tx, &cancel).await;

                telemetry.mark_down();
                match end {
                    SessionEnd::Cancelled => {
                        telemetry.emit(EVENT_STOPPED, ConnectionPhase::Idle, false, None);
                        return;
                    }
                    SessionEnd::Closed => {
                        telemetry.last_error = Some("connection closed".to_string());
                    }
                    SessionEnd::Failed(error) => {
                        telemetry.last_error = Some(error);
                    }
                }
                telemetry.emit(EVENT_DISCONNECTED, ConnectionPhase::Error, false, None);
            }
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "Live channel connect failed");
                telemetry.mark_down();
                telemetry.last_error = Some(e.to_string());
                telemetry.emit(EVENT_CONNECT_FAILED, ConnectionPhase::Error, false, None);
            }
        }

        if cancel.is_cancelled() {
            telemetry.emit(EVENT_STOPPED, ConnectionPhase::Idle, false, None);
            return;
        }

        // Schedule the next attempt.
        telemetry.attempts += 1;
        let delay = delay_for_attempt(telemetry.attempts, &config.reconnect);
        tracing::info!(
            endpoint = %endpoint,
            attempt = telemetry.attempts,
            delay_ms = delay.as_millis() as u64,
            "Reconnect scheduled",
        );
        telemetry.emit(
            EVENT_RECONNECT_SCHEDULED,
            ConnectionPhase::ReconnectScheduled,
            false,
            Some(delay.as_millis() as u64),
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                telemetry.emit(EVENT_STOPPED, ConnectionPhase::Idle, false, None);
                return;
            }
            _ = tokio::time::sleep(delay) => {}
            _ = retry_now.notified() => {
                tracing::info!(endpoint = %endpoint, "Immediate reconnect requested");
            }
        }
    }
}

/// Read frames until the socket closes, errors, or the task is cancelled.
async fn drive_session(
    mut ws_stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    message_tx: &mpsc::UnboundedSender<SocketMessage>,
    cancel: &CancellationToken,
) -> SessionEnd {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return SessionEnd::Cancelled,
            frame = ws_stream.next() => match frame {
                Some(Ok(Message::Text(text))) => dispatch_frame(&text, message_tx),
                Some(Ok(Message::Binary(_))) => {
                    // Preview payloads; not part of the progress protocol.
                    tracing::trace!("Ignoring binary frame");
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    // Handled automatically by tungstenite.
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "Live channel closed by backend");
                    return SessionEnd::Closed;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Live channel receive error");
                    return SessionEnd::Failed(e.to_string());
                }
                None => return SessionEnd::Closed,
            }
        }
    }
}

/// Decode one text frame and forward it.  Malformed payloads are dropped
/// with a diagnostic; unknown kinds are ignored for forward compatibility.
fn dispatch_frame(text: &str, message_tx: &mpsc::UnboundedSender<SocketMessage>) {
    match parse_message(text) {
        Ok(message) => {
            if message_tx.send(message).is_err() {
                tracing::debug!("Message receiver dropped; discarding frame");
            }
        }
        Err(ParseError::UnknownKind(kind)) => {
            tracing::debug!(kind = %kind, "Ignoring unknown message kind");
        }
        Err(ParseError::Malformed(e)) => {
            tracing::debug!(error = %e, raw_message = %text, "Dropping malformed message");
        }
    }
}
