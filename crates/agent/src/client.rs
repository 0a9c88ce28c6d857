//! HTTP client for the authority's `/api/v1/agent` endpoints.
//!
//! Every request carries the printer's key in `X-API-Key`. Successful JSON
//! bodies arrive in a `{ "data": … }` envelope which is unwrapped here;
//! error bodies are `{ "error": …, "code": … }` and are classified so
//! callers can tell "not ready yet" apart from real failures.

use std::time::Duration;

use jigprint_core::agent_protocol::{
    AgentJob, DeliveryConfirmation, DeliveryConfirmed, HeartbeatAck, HeartbeatRequest, PrintInfo,
    QueueStatus,
};
use jigprint_core::api_keys::API_KEY_HEADER;
use jigprint_core::types::DbId;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Error code the authority uses for a job that is not in the expected
/// state yet.
const NOT_READY_CODE: &str = "NOT_READY";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, timeout, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The agent key was rejected.
    #[error("Agent key rejected by the authority")]
    Unauthorized,

    /// The job is gone, belongs to another printer, or a hot-folder
    /// mapping is missing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The job exists but is not in the state the call requires.
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Any other non-2xx response.
    #[error("Authority error ({status}): {body}")]
    Api { status: u16, body: String },
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Client bound to one authority and one printer key.
#[derive(Clone)]
pub struct AuthorityClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AuthorityClient {
    /// * `api_url` - Authority base URL without the `/api/v1` suffix.
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: format!("{}/api/v1/agent", api_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }

    /// `POST /heartbeat`
    pub async fn heartbeat(&self, printer_id: Option<DbId>) -> Result<HeartbeatAck, ClientError> {
        let response = self
            .post("/heartbeat")
            .json(&HeartbeatRequest { printer_id })
            .send()
            .await?;
        Self::parse_data(response).await
    }

    /// `GET /queue-status`
    pub async fn queue_status(&self) -> Result<QueueStatus, ClientError> {
        let response = self.get("/queue-status").send().await?;
        Self::parse_data(response).await
    }

    /// `GET /jobs`: jobs waiting to be downloaded, in queue order.
    pub async fn ready_jobs(&self) -> Result<Vec<AgentJob>, ClientError> {
        let response = self.get("/jobs").send().await?;
        Self::parse_data(response).await
    }

    /// `GET /jobs/local`: jobs the authority believes this agent holds.
    pub async fn local_jobs(&self) -> Result<Vec<AgentJob>, ClientError> {
        let response = self.get("/jobs/local").send().await?;
        Self::parse_data(response).await
    }

    /// `GET /jobs/{id}/download`: the composed PDF.
    pub async fn download(&self, job_id: DbId) -> Result<Vec<u8>, ClientError> {
        let response = self
            .get(&format!("/jobs/{job_id}/download"))
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// `POST /jobs/{id}/mark-downloaded`
    pub async fn mark_downloaded(&self, job_id: DbId) -> Result<AgentJob, ClientError> {
        let response = self
            .post(&format!("/jobs/{job_id}/mark-downloaded"))
            .send()
            .await?;
        Self::parse_data(response).await
    }

    /// `POST /jobs/{id}/release`: give a queued job back to discovery.
    pub async fn release(&self, job_id: DbId) -> Result<AgentJob, ClientError> {
        let response = self
            .post(&format!("/jobs/{job_id}/release"))
            .send()
            .await?;
        Self::parse_data(response).await
    }

    /// `GET /jobs/{id}/print-info`. A job not yet sent to the printer
    /// yields [`ClientError::NotReady`].
    pub async fn print_info(&self, job_id: DbId) -> Result<PrintInfo, ClientError> {
        let response = self
            .get(&format!("/jobs/{job_id}/print-info"))
            .send()
            .await?;
        Self::parse_data(response).await
    }

    /// `POST /jobs/{id}/confirm-sent`
    pub async fn confirm_sent(
        &self,
        job_id: DbId,
        confirmation: &DeliveryConfirmation,
    ) -> Result<DeliveryConfirmed, ClientError> {
        let response = self
            .post(&format!("/jobs/{job_id}/confirm-sent"))
            .json(confirmation)
            .send()
            .await?;
        Self::parse_data(response).await
    }

    // ---- private helpers ----

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{path}", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
    }

    /// Return the response unchanged on success, or classify the failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(classify(status, body))
    }

    async fn parse_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<Envelope<T>>().await?.data)
    }
}

/// Map a non-2xx status and its body to a [`ClientError`].
fn classify(status: StatusCode, body: String) -> ClientError {
    let parsed: Option<ErrorBody> = serde_json::from_str(&body).ok();
    let message = parsed
        .as_ref()
        .and_then(|b| b.error.clone())
        .unwrap_or_else(|| body.clone());
    let code = parsed.and_then(|b| b.code);

    match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::CONFLICT if code.as_deref() == Some(NOT_READY_CODE) => {
            ClientError::NotReady(message)
        }
        _ => ClientError::Api {
            status: status.as_u16(),
            body,
        },
    }
}
