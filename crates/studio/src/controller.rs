//! The studio controller: reconciles transport events, poll results, and
//! user actions into the core state containers.
//!
//! Owns Queue State and Results State exclusively, and enforces update
//! precedence between the two channels: a transport message is
//! authoritative for its job the instant it arrives, and a concurrent
//! poll-based refresh never resurrects a job the transport already marked
//! terminal.  Precedence is decided by a job's presence in Queue State
//! plus a bounded set of transport-resolved ids — never by timestamps,
//! since arrival order across the two channels is not globally ordered.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch, OnceCell, RwLock};
use tokio_util::sync::CancellationToken;

use easel_backend::api::{ApiError, GenerationBackend};
use easel_backend::messages::{ProgressUpdate, SocketMessage};
use easel_backend::transport::{ConnectionSnapshot, Transport, TransportConfig};
use easel_core::error::CoreError;
use easel_core::job::{Job, JobStatus};
use easel_core::notification::Notification;
use easel_core::params::GenerationParams;
use easel_core::queue::JobQueue;
use easel_core::results::{GenerationResult, ResultHistory};
use easel_core::status::SystemState;
use easel_core::types::JobId;

use crate::config::StudioConfig;
use crate::confirm::ConfirmDialog;
use crate::poller::{PollerGuard, StatusPoller};
use crate::tokens::TokenIssuer;

/// Broadcast capacity for user-facing notifications.
const NOTIFICATION_CHANNEL_CAPACITY: usize = 64;

/// Bound on the remembered set of transport-resolved job ids.
const RESOLVED_CAPACITY: usize = 64;

/// Invoked after a successful submission, e.g. to persist last-used
/// parameters.
pub type AfterStartHook = Box<dyn Fn(&GenerationParams) + Send + Sync>;

/// Errors surfaced by controller operations.
///
/// Every error has already been reported through the notification channel
/// by the time it is returned; callers only need the `Result` for control
/// flow.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error(transparent)]
    Backend(#[from] ApiError),
}

/// Coordinates the transport, the fallback poller, and the state
/// containers.  Created via [`StudioController::new`], shared as an `Arc`.
pub struct StudioController {
    config: StudioConfig,
    backend: Arc<dyn GenerationBackend>,
    queue: RwLock<JobQueue>,
    results: RwLock<ResultHistory>,
    system: Arc<RwLock<SystemState>>,
    resolved: RwLock<ResolvedJobs>,
    generating: AtomicBool,
    notifications: broadcast::Sender<Notification>,
    connection: Arc<watch::Sender<ConnectionSnapshot>>,
    poller: StatusPoller,
    poller_guard: tokio::sync::Mutex<Option<PollerGuard>>,
    transport: Transport,
    message_rx: tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<SocketMessage>>>,
    shutdown_token: CancellationToken,
    init: OnceCell<()>,
    refresh_tokens: TokenIssuer,
    after_start: std::sync::Mutex<Option<AfterStartHook>>,
}

impl StudioController {
    /// Build a controller.  Nothing touches the network until
    /// [`StudioController::initialize`].
    pub fn new(config: StudioConfig, backend: Arc<dyn GenerationBackend>) -> Arc<Self> {
        let system = Arc::new(RwLock::new(SystemState::default()));
        let poller = StatusPoller::new(
            Arc::clone(&backend),
            Arc::clone(&system),
            config.poll_interval,
        );

        let transport_config = TransportConfig {
            base_url: config.base_url.clone(),
            reconnect: config.reconnect.clone(),
        };
        let (connection, _) = watch::channel(ConnectionSnapshot::idle(transport_config.endpoint()));
        let connection = Arc::new(connection);

        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let observer = Arc::clone(&connection);
        let transport = Transport::new(transport_config, message_tx, move |snapshot| {
            // send_replace stores the snapshot even while nothing subscribes.
            observer.send_replace(snapshot);
        });

        let (notifications, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);

        Arc::new(Self {
            results: RwLock::new(ResultHistory::new(config.results_capacity)),
            config,
            backend,
            queue: RwLock::new(JobQueue::new()),
            system,
            resolved: RwLock::new(ResolvedJobs::new(RESOLVED_CAPACITY)),
            generating: AtomicBool::new(false),
            notifications,
            connection,
            poller,
            poller_guard: tokio::sync::Mutex::new(None),
            transport,
            message_rx: tokio::sync::Mutex::new(Some(message_rx)),
            shutdown_token: CancellationToken::new(),
            init: OnceCell::new(),
            refresh_tokens: TokenIssuer::new(),
            after_start: std::sync::Mutex::new(None),
        })
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Hydrate system status, fetch current jobs and results once, then
    /// start the live transport.
    ///
    /// Safe to invoke from several independent UI attachment points
    /// concurrently: all callers await the same in-flight initialization
    /// and no network call is duplicated.
    pub async fn initialize(self: &Arc<Self>) {
        let controller = Arc::clone(self);
        self.init
            .get_or_init(|| async move {
                controller.run_initialization().await;
            })
            .await;
    }

    async fn run_initialization(self: &Arc<Self>) {
        tracing::info!(base_url = %self.config.base_url, "Initializing studio controller");

        {
            let mut guard = self.poller_guard.lock().await;
            if guard.is_none() {
                *guard = Some(self.poller.acquire());
            }
        }
        self.poller.ensure_hydrated().await;

        match self.backend.active_jobs().await {
            Ok(jobs) => self.reconcile_jobs(jobs).await,
            Err(e) => tracing::warn!(error = %e, "Failed to fetch active jobs"),
        }

        if let Err(e) = self.fetch_results().await {
            tracing::warn!(error = %e, "Failed to fetch recent results");
        }

        if let Some(rx) = self.message_rx.lock().await.take() {
            tokio::spawn(pump_messages(Arc::clone(self), rx));
        }
        self.transport.start();
    }

    /// Stop the transport, the message pump, and release this
    /// controller's poller registration.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down studio controller");
        self.shutdown_token.cancel();
        self.transport.stop();
        *self.poller_guard.lock().await = None;
    }

    // -----------------------------------------------------------------
    // User actions
    // -----------------------------------------------------------------

    /// Submit a new generation.
    ///
    /// The prompt is validated locally first; an empty trimmed prompt
    /// raises a validation notification and returns without any backend
    /// call.  The generating flag is cleared on every exit path.
    pub async fn start_generation(
        &self,
        params: GenerationParams,
    ) -> Result<JobId, ControllerError> {
        if let Err(e) = params.validate() {
            self.notify(Notification::validation(e.to_string()));
            return Err(e.into());
        }

        let _generating = GeneratingGuard::engage(&self.generating);

        let response = match self.backend.submit(&params).await {
            Ok(response) => response,
            Err(e) => {
                self.notify(Notification::error(format!(
                    "Failed to start generation: {e}"
                )));
                return Err(e.into());
            }
        };

        let job = Job {
            id: response.job_id.clone(),
            status: JobStatus::Queued,
            progress: 0,
            created_at: chrono::Utc::now(),
            prompt: params.prompt.trim().to_string(),
        };
        self.queue.write().await.upsert(job);

        if let Some(hook) = self
            .after_start
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            hook(&params);
        }

        tracing::info!(job_id = %response.job_id, "Generation submitted");
        Ok(response.job_id)
    }

    /// Cancel a job while it is still queued or processing.
    ///
    /// On backend success the job is removed from Queue State
    /// optimistically, without waiting for a confirming transport
    /// message.  On failure the job is left untouched.  A terminal or
    /// untracked job makes this a no-op with no backend call.
    pub async fn cancel_job(&self, job_id: &str) -> Result<(), ControllerError> {
        let status = self.queue.read().await.get(job_id).map(|job| job.status);
        let Some(status) = status else {
            tracing::debug!(job_id = %job_id, "Cancel requested for untracked job");
            return Ok(());
        };
        if !status.is_cancellable() {
            tracing::debug!(job_id = %job_id, ?status, "Cancel requested for terminal job");
            return Ok(());
        }

        match self.backend.cancel(job_id).await {
            Ok(()) => {
                self.queue.write().await.remove(job_id);
                self.resolved.write().await.mark(job_id.to_string());
                tracing::info!(job_id = %job_id, "Job cancelled");
                Ok(())
            }
            Err(e) => {
                self.notify(Notification::error(format!("Failed to cancel job: {e}")));
                Err(e.into())
            }
        }
    }

    /// Cancel all non-terminal jobs after explicit user confirmation.
    pub async fn clear_queue(&self, confirm: &dyn ConfirmDialog) -> Result<(), ControllerError> {
        if !confirm.confirm("Cancel all queued generations?").await {
            return Ok(());
        }

        let ids = self.queue.read().await.ids();
        for id in ids {
            // Keep going when one cancel fails; each failure has already
            // surfaced its own notification.
            let _ = self.cancel_job(&id).await;
        }
        Ok(())
    }

    /// Re-fetch recent results and replace Results State wholesale.
    pub async fn refresh_results(&self, notify_success: bool) -> Result<(), ControllerError> {
        self.fetch_results().await.map_err(|e| {
            self.notify(Notification::error(format!(
                "Failed to refresh results: {e}"
            )));
            e
        })?;

        if notify_success {
            self.notify(Notification::success("Results refreshed"));
        }
        Ok(())
    }

    /// Delete a stored result, removing it locally only on success.
    pub async fn delete_result(&self, result_id: &str) -> Result<(), ControllerError> {
        match self.backend.delete_result(result_id).await {
            Ok(()) => {
                self.results.write().await.remove(result_id);
                Ok(())
            }
            Err(e) => {
                self.notify(Notification::error(format!("Failed to delete result: {e}")));
                Err(e.into())
            }
        }
    }

    /// Force an immediate live-channel retry, skipping a pending backoff.
    pub fn reconnect(&self) {
        self.transport.reconnect();
    }

    // -----------------------------------------------------------------
    // Channel reconciliation
    // -----------------------------------------------------------------

    /// Apply one live-channel message to the state containers.
    pub async fn apply_message(&self, message: SocketMessage) {
        match message {
            SocketMessage::Progress(update) => self.apply_progress(update).await,

            SocketMessage::Completed(payload) => {
                self.queue.write().await.remove(&payload.job_id);
                self.resolved.write().await.mark(payload.job_id.clone());
                self.results.write().await.add(payload.into_result());
                self.notify(Notification::success("Generation completed"));
            }

            SocketMessage::Error(failure) => {
                self.queue.write().await.remove(&failure.job_id);
                self.resolved.write().await.mark(failure.job_id.clone());
                let message = if failure.message.is_empty() {
                    "Generation failed".to_string()
                } else {
                    failure.message
                };
                self.notify(Notification::error(message));
            }

            SocketMessage::QueueUpdate(snapshot) => self.reconcile_jobs(snapshot.jobs).await,

            SocketMessage::SystemStatus(status) => {
                self.system.write().await.apply_status(status);
            }

            SocketMessage::JobStarted(started) => {
                tracing::debug!(job_id = %started.job_id, "Job started");
            }
        }
    }

    /// Apply a bulk job snapshot (live queue update, poll reconciliation,
    /// or the initial fetch).
    ///
    /// Additive/overwrite-by-id only: ids absent from the snapshot are
    /// never deleted, transport-resolved ids are skipped so a stale
    /// snapshot cannot resurrect them, and terminal-status entries remove
    /// the job rather than inserting it.
    pub async fn reconcile_jobs(&self, jobs: Vec<Job>) {
        let resolved = self.resolved.read().await;
        let mut queue = self.queue.write().await;
        for job in jobs {
            if resolved.contains(&job.id) {
                tracing::debug!(job_id = %job.id, "Skipping snapshot entry for resolved job");
                continue;
            }
            if job.is_terminal() {
                queue.remove(&job.id);
                continue;
            }
            queue.upsert(job);
        }
    }

    async fn apply_progress(&self, update: ProgressUpdate) {
        let mut queue = self.queue.write().await;
        let Some(job) = queue.get(&update.job_id) else {
            // Either foreign or already resolved; presence decides.
            tracing::debug!(job_id = %update.job_id, "Progress for untracked job");
            return;
        };

        let mut job = job.clone();
        job.progress = update.progress.min(100);
        match update.status {
            Some(status) if !status.is_terminal() => job.status = status,
            Some(status) => {
                // Terminal transitions arrive via completed/error messages.
                tracing::debug!(job_id = %job.id, ?status, "Ignoring terminal status on progress message");
            }
            None => {}
        }
        queue.upsert(job);
    }

    async fn fetch_results(&self) -> Result<(), ControllerError> {
        let token = self.refresh_tokens.issue();
        let fetched = self
            .backend
            .recent_results(self.config.results_capacity)
            .await?;

        if !self.refresh_tokens.is_current(token) {
            tracing::debug!("Discarding superseded results response");
            return Ok(());
        }

        self.results.write().await.replace_all(fetched);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Read views and subscriptions
    // -----------------------------------------------------------------

    /// Active jobs in display order (ascending submission time).
    pub async fn active_jobs(&self) -> Vec<Job> {
        self.queue.read().await.display_order()
    }

    /// Snapshot of a single tracked job.
    pub async fn job(&self, job_id: &str) -> Option<Job> {
        self.queue.read().await.get(job_id).cloned()
    }

    /// Retained results, newest first.
    pub async fn recent_results(&self) -> Vec<GenerationResult> {
        self.results.read().await.entries().to_vec()
    }

    /// Last known system state.
    pub async fn system_state(&self) -> SystemState {
        self.system.read().await.clone()
    }

    /// Latest connection snapshot.
    pub fn connection(&self) -> ConnectionSnapshot {
        self.connection.borrow().clone()
    }

    /// Watch connection snapshots as they change.
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.connection.subscribe()
    }

    /// Subscribe to user-facing notifications.
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// `true` while a submission is in flight.
    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst)
    }

    /// Install the hook invoked after each successful submission.
    pub fn set_after_start(&self, hook: impl Fn(&GenerationParams) + Send + Sync + 'static) {
        *self.after_start.lock().unwrap_or_else(|e| e.into_inner()) = Some(Box::new(hook));
    }

    fn notify(&self, notification: Notification) {
        // No receivers is fine; notifications are fire-and-forget.
        let _ = self.notifications.send(notification);
    }
}

/// Drains transport messages into the controller until shutdown.
async fn pump_messages(
    controller: Arc<StudioController>,
    mut rx: mpsc::UnboundedReceiver<SocketMessage>,
) {
    loop {
        tokio::select! {
            _ = controller.shutdown_token.cancelled() => break,
            message = rx.recv() => match message {
                Some(message) => controller.apply_message(message).await,
                None => break,
            }
        }
    }
    tracing::debug!("Message pump exited");
}

/// Scoped-release guarantee for the generating flag: engaged before the
/// submit call, cleared on drop along every exit path.
struct GeneratingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> GeneratingGuard<'a> {
    fn engage(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self { flag }
    }
}

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Bounded FIFO set of job ids the transport has resolved.  Snapshot
/// reconciliation consults it so a stale poll response cannot resurrect a
/// job that already reached a terminal state.
struct ResolvedJobs {
    order: VecDeque<JobId>,
    ids: HashSet<JobId>,
    capacity: usize,
}

impl ResolvedJobs {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            ids: HashSet::new(),
            capacity,
        }
    }

    fn mark(&mut self, id: JobId) {
        if self.ids.insert(id.clone()) {
            self.order.push_back(id);
            if self.order.len() > self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.ids.remove(&evicted);
                }
            }
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }
}
