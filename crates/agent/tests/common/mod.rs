//! In-process stand-in for the authority's agent endpoints.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use jigprint_agent::client::AuthorityClient;
use jigprint_core::agent_protocol::{
    AgentJob, DeliveryConfirmation, HeartbeatAck, PrintInfo, QueueStatus,
};
use jigprint_core::hot_folder::delivered_filename;
use jigprint_core::job_status::{JobStatus, LOCAL_QUEUE_STATUSES};
use jigprint_core::types::DbId;
use serde_json::json;

pub const GOOD_KEY: &str = "jp_test_key";
pub const PRINTER_ID: DbId = 3;

#[derive(Default)]
pub struct FakeState {
    pub jobs: Vec<AgentJob>,
    pub artifacts: HashMap<DbId, Vec<u8>>,
    /// Hot folder for every job; `None` simulates a missing mapping.
    pub hot_folder: Option<PathBuf>,
    pub heartbeats: usize,
    pub downloads: usize,
    pub print_info_calls: usize,
    pub releases: Vec<DbId>,
    pub confirmations: Vec<(DbId, DeliveryConfirmation)>,
    /// `mark-downloaded` commits but answers 500, like a response lost
    /// on the way back.
    pub lose_mark_downloaded_response: bool,
}

#[derive(Clone, Default)]
pub struct FakeAuthority {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeAuthority {
    pub fn add_job(&self, id: DbId, status: JobStatus, artifact: Option<&[u8]>) {
        let mut s = self.state.lock().unwrap();
        s.jobs.push(AgentJob {
            id,
            status,
            job_name: Some(format!("Favours {id}")),
            event_name: Some("Smith Wedding".into()),
            priority: 0,
            copies: 2,
            authority_queue_position: Some(id as i32),
            local_queue_position: None,
        });
        if let Some(bytes) = artifact {
            s.artifacts.insert(id, bytes.to_vec());
        }
    }

    pub fn set_status(&self, id: DbId, status: JobStatus) {
        let mut s = self.state.lock().unwrap();
        if let Some(job) = s.jobs.iter_mut().find(|j| j.id == id) {
            job.status = status;
        }
    }

    pub fn status(&self, id: DbId) -> JobStatus {
        let s = self.state.lock().unwrap();
        s.jobs.iter().find(|j| j.id == id).unwrap().status
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Serve on an ephemeral port and return a client pointed at it.
    pub async fn serve(&self) -> AuthorityClient {
        let url = self.listen().await;
        self.client(&url, GOOD_KEY)
    }

    /// Serve on an ephemeral port and return the base URL.
    pub async fn listen(&self) -> String {
        let app = Router::new()
            .route("/api/v1/agent/heartbeat", post(heartbeat))
            .route("/api/v1/agent/queue-status", get(queue_status))
            .route("/api/v1/agent/jobs", get(ready_jobs))
            .route("/api/v1/agent/jobs/local", get(local_jobs))
            .route("/api/v1/agent/jobs/{id}/download", get(download))
            .route("/api/v1/agent/jobs/{id}/mark-downloaded", post(mark_downloaded))
            .route("/api/v1/agent/jobs/{id}/release", post(release))
            .route("/api/v1/agent/jobs/{id}/print-info", get(print_info))
            .route("/api/v1/agent/jobs/{id}/confirm-sent", post(confirm_sent))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}")
    }

    pub fn client(&self, url: &str, key: &str) -> AuthorityClient {
        AuthorityClient::new(url, key, std::time::Duration::from_secs(5)).unwrap()
    }
}

fn error(status: StatusCode, code: &str, msg: &str) -> Response {
    (status, Json(json!({ "error": msg, "code": code }))).into_response()
}

fn authorized(headers: &HeaderMap) -> Result<(), Response> {
    match headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        Some(GOOD_KEY) => Ok(()),
        _ => Err(error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Invalid API key")),
    }
}

fn data<T: serde::Serialize>(value: T) -> Response {
    Json(json!({ "data": value })).into_response()
}

async fn heartbeat(State(fake): State<FakeAuthority>, headers: HeaderMap) -> Response {
    if let Err(r) = authorized(&headers) {
        return r;
    }
    fake.with(|s| s.heartbeats += 1);
    data(HeartbeatAck {
        status: "ok".into(),
        printer_id: PRINTER_ID,
        printer_name: "Mimaki UJF".into(),
        server_time: Utc::now(),
    })
}

async fn queue_status(State(fake): State<FakeAuthority>, headers: HeaderMap) -> Response {
    if let Err(r) = authorized(&headers) {
        return r;
    }
    let rows: Vec<(JobStatus, i64)> = fake.with(|s| s.jobs.iter().map(|j| (j.status, 1)).collect());
    data(QueueStatus::from_counts(PRINTER_ID, "Mimaki UJF".into(), true, rows))
}

async fn ready_jobs(State(fake): State<FakeAuthority>, headers: HeaderMap) -> Response {
    if let Err(r) = authorized(&headers) {
        return r;
    }
    let jobs: Vec<AgentJob> = fake.with(|s| {
        s.jobs
            .iter()
            .filter(|j| j.status == JobStatus::ReadyForPrint)
            .cloned()
            .collect()
    });
    data(jobs)
}

async fn local_jobs(State(fake): State<FakeAuthority>, headers: HeaderMap) -> Response {
    if let Err(r) = authorized(&headers) {
        return r;
    }
    let jobs: Vec<AgentJob> = fake.with(|s| {
        s.jobs
            .iter()
            .filter(|j| LOCAL_QUEUE_STATUSES.contains(&j.status))
            .cloned()
            .collect()
    });
    data(jobs)
}

async fn download(
    State(fake): State<FakeAuthority>,
    headers: HeaderMap,
    Path(id): Path<DbId>,
) -> Response {
    if let Err(r) = authorized(&headers) {
        return r;
    }
    fake.with(|s| {
        s.downloads += 1;
        match s.artifacts.get(&id) {
            Some(bytes) => bytes.clone().into_response(),
            None => error(StatusCode::NOT_FOUND, "NOT_FOUND", "Artifact missing"),
        }
    })
}

async fn mark_downloaded(
    State(fake): State<FakeAuthority>,
    headers: HeaderMap,
    Path(id): Path<DbId>,
) -> Response {
    if let Err(r) = authorized(&headers) {
        return r;
    }
    fake.with(|s| {
        let next = s
            .jobs
            .iter()
            .filter_map(|j| j.local_queue_position)
            .max()
            .unwrap_or(0)
            + 1;
        let lose_response = s.lose_mark_downloaded_response;
        match s.jobs.iter_mut().find(|j| j.id == id) {
            Some(job) if job.status == JobStatus::ReadyForPrint => {
                job.status = JobStatus::QueuedLocal;
                job.local_queue_position = Some(next);
                if lose_response {
                    return error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Lost");
                }
                data(job.clone())
            }
            Some(_) => error(StatusCode::BAD_REQUEST, "INVALID_TRANSITION", "Bad transition"),
            None => error(StatusCode::NOT_FOUND, "NOT_FOUND", "Job not found"),
        }
    })
}

async fn release(
    State(fake): State<FakeAuthority>,
    headers: HeaderMap,
    Path(id): Path<DbId>,
) -> Response {
    if let Err(r) = authorized(&headers) {
        return r;
    }
    fake.with(|s| {
        s.releases.push(id);
        match s.jobs.iter_mut().find(|j| j.id == id) {
            Some(job) if job.status == JobStatus::QueuedLocal => {
                job.status = JobStatus::ReadyForPrint;
                job.local_queue_position = None;
                data(job.clone())
            }
            Some(_) => error(StatusCode::BAD_REQUEST, "INVALID_TRANSITION", "Bad transition"),
            None => error(StatusCode::NOT_FOUND, "NOT_FOUND", "Job not found"),
        }
    })
}

async fn print_info(
    State(fake): State<FakeAuthority>,
    headers: HeaderMap,
    Path(id): Path<DbId>,
) -> Response {
    if let Err(r) = authorized(&headers) {
        return r;
    }
    fake.with(|s| {
        s.print_info_calls += 1;
        let Some(job) = s.jobs.iter().find(|j| j.id == id) else {
            return error(StatusCode::NOT_FOUND, "NOT_FOUND", "Job not found");
        };
        if job.status != JobStatus::SentToPrinter {
            return error(StatusCode::CONFLICT, "NOT_READY", "Job is not sent_to_printer");
        }
        let Some(folder) = &s.hot_folder else {
            return error(StatusCode::NOT_FOUND, "NOT_FOUND", "No hot folder configured");
        };
        data(PrintInfo {
            job_id: id,
            hot_folder_path: folder.to_string_lossy().into_owned(),
            filename: delivered_filename(id, job.event_name.as_deref()),
            local_artifact_path: None,
            copies: job.copies,
        })
    })
}

async fn confirm_sent(
    State(fake): State<FakeAuthority>,
    headers: HeaderMap,
    Path(id): Path<DbId>,
    Json(body): Json<DeliveryConfirmation>,
) -> Response {
    if let Err(r) = authorized(&headers) {
        return r;
    }
    fake.with(|s| s.confirmations.push((id, body)));
    data(json!({ "status": "confirmed", "job_id": id }))
}
