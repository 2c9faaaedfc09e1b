//! Scripted [`GenerationBackend`] used by the orchestrator and poller
//! integration tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use easel_backend::api::{ApiError, GenerationBackend, SubmitResponse};
use easel_core::job::{Job, JobStatus};
use easel_core::params::GenerationParams;
use easel_core::results::GenerationResult;
use easel_core::status::{HealthState, SystemStatus};

/// Backend double with per-operation call counters and scripted outcomes.
#[derive(Default)]
pub struct MockBackend {
    pub submit_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub jobs_calls: AtomicUsize,
    pub results_calls: AtomicUsize,
    pub status_calls: AtomicUsize,

    pub fail_submit: AtomicBool,
    pub fail_cancel: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_results: AtomicBool,
    pub status_not_found: AtomicBool,
    pub status_error: AtomicBool,

    /// Artificial latency on status fetches, for overlap tests.
    pub status_delay: Mutex<Option<Duration>>,
    /// Job id returned by the next submit; generated when empty.
    pub next_job_id: Mutex<String>,

    pub jobs: Mutex<Vec<Job>>,
    pub results: Mutex<Vec<GenerationResult>>,
}

fn transient_error() -> ApiError {
    ApiError::Api {
        status: 500,
        body: "backend unavailable".to_string(),
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn submit(&self, _params: &GenerationParams) -> Result<SubmitResponse, ApiError> {
        let call = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(transient_error());
        }
        let configured = self.next_job_id.lock().unwrap().clone();
        let job_id = if configured.is_empty() {
            format!("job-{call}")
        } else {
            configured
        };
        Ok(SubmitResponse { job_id })
    }

    async fn cancel(&self, _job_id: &str) -> Result<(), ApiError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(transient_error());
        }
        Ok(())
    }

    async fn delete_result(&self, _result_id: &str) -> Result<(), ApiError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(transient_error());
        }
        Ok(())
    }

    async fn active_jobs(&self) -> Result<Vec<Job>, ApiError> {
        self.jobs_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.jobs.lock().unwrap().clone())
    }

    async fn recent_results(&self, limit: usize) -> Result<Vec<GenerationResult>, ApiError> {
        self.results_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_results.load(Ordering::SeqCst) {
            return Err(transient_error());
        }
        let mut results = self.results.lock().unwrap().clone();
        results.truncate(limit);
        Ok(results)
    }

    async fn system_status(&self) -> Result<SystemStatus, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.status_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.status_not_found.load(Ordering::SeqCst) {
            return Err(ApiError::NotFound);
        }
        if self.status_error.load(Ordering::SeqCst) {
            return Err(transient_error());
        }
        Ok(SystemStatus {
            queue_length: 1,
            gpu_available: true,
            vram_used_mb: 1024,
            vram_total_mb: 8192,
            health: HealthState::Healthy,
            last_updated: Utc::now(),
        })
    }
}

/// A non-terminal job snapshot with a deterministic timestamp.
pub fn job(id: &str, status: JobStatus, created_secs: i64) -> Job {
    Job {
        id: id.to_string(),
        status,
        progress: 0,
        created_at: Utc.timestamp_opt(created_secs, 0).unwrap(),
        prompt: format!("prompt for {id}"),
    }
}

/// A result snapshot with a deterministic timestamp.
pub fn result(id: &str, job_id: &str, created_secs: i64) -> GenerationResult {
    GenerationResult {
        id: id.to_string(),
        job_id: job_id.to_string(),
        prompt: String::new(),
        image_url: format!("outputs/{id}.png"),
        created_at: Utc.timestamp_opt(created_secs, 0).unwrap(),
        params: GenerationParams::default(),
    }
}
