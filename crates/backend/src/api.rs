//! REST client for the generation backend's HTTP endpoints.
//!
//! [`HttpBackend`] wraps the backend API (submission, cancellation, result
//! deletion, job/result listing, system status) using [`reqwest`].  The
//! [`GenerationBackend`] trait is the seam the orchestration layer depends
//! on, so it can be exercised against a scripted implementation in tests.

use async_trait::async_trait;
use serde::Deserialize;

use easel_core::job::Job;
use easel_core::params::GenerationParams;
use easel_core::results::GenerationResult;
use easel_core::status::SystemStatus;

/// Response returned by the submit endpoint after queuing a job.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    /// Backend-assigned identifier for the queued job.
    pub job_id: String,
}

/// Errors from the backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The endpoint does not exist on this deployment.  Distinct from a
    /// transient [`ApiError::Api`] failure: callers treat it as a permanent
    /// feature-absence signal.
    #[error("Endpoint not found")]
    NotFound,
}

/// Contract-level operations consumed from the generation backend.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Submit a generation job.  Returns the acknowledged job id.
    async fn submit(&self, params: &GenerationParams) -> Result<SubmitResponse, ApiError>;

    /// Cancel a queued or running job.
    async fn cancel(&self, job_id: &str) -> Result<(), ApiError>;

    /// Delete a stored result by id.
    async fn delete_result(&self, result_id: &str) -> Result<(), ApiError>;

    /// List currently active (non-terminal) jobs.
    async fn active_jobs(&self) -> Result<Vec<Job>, ApiError>;

    /// List the most recent results, newest first.
    async fn recent_results(&self, limit: usize) -> Result<Vec<GenerationResult>, ApiError>;

    /// Fetch the backend's status snapshot.
    async fn system_status(&self) -> Result<SystemStatus, ApiError>;
}

/// HTTP implementation of [`GenerationBackend`].
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a new client for the given HTTP base URL
    /// (e.g. `http://host:7860`). A trailing slash is stripped.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    /// HTTP base URL this client targets.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code.  A 404 maps to
    /// [`ApiError::NotFound`]; any other failure status is returned with
    /// its body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn submit(&self, params: &GenerationParams) -> Result<SubmitResponse, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(params)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn cancel(&self, job_id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(format!("{}/api/jobs/{job_id}/cancel", self.base_url))
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn delete_result(&self, result_id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(format!("{}/api/results/{result_id}", self.base_url))
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn active_jobs(&self) -> Result<Vec<Job>, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/jobs", self.base_url))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn recent_results(&self, limit: usize) -> Result<Vec<GenerationResult>, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/results", self.base_url))
            .query(&[("limit", limit)])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn system_status(&self) -> Result<SystemStatus, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/status", self.base_url))
            .send()
            .await?;

        Self::parse_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let backend = HttpBackend::new("http://localhost:7860/");
        assert_eq!(backend.base_url(), "http://localhost:7860");
    }

    #[test]
    fn submit_response_parses() {
        let response: SubmitResponse =
            serde_json::from_str(r#"{"job_id":"j1","queue_position":2}"#).unwrap();
        assert_eq!(response.job_id, "j1");
    }
}
