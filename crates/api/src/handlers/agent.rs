//! Handlers for the printer-agent endpoints under `/agent`.
//!
//! Every endpoint is scoped to the printer resolved by [`AgentPrinter`].
//! A job belonging to another printer is reported as not found.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use jigprint_core::agent_protocol::{
    DeliveryConfirmation, DeliveryConfirmed, HeartbeatAck, HeartbeatRequest, PrintInfo,
    QueueStatus,
};
use jigprint_core::error::CoreError;
use jigprint_core::hot_folder::delivered_filename;
use jigprint_core::job_status::JobStatus;
use jigprint_core::notes::delivery_note;
use jigprint_core::types::DbId;
use jigprint_db::models::job::Job;
use jigprint_db::repositories::{JobRepo, PrinterRepo, TemplateRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::agent_auth::AgentPrinter;
use crate::response::DataResponse;
use crate::state::AppState;

async fn find_own_job(state: &AppState, job_id: DbId, printer_id: DbId) -> AppResult<Job> {
    JobRepo::find_for_printer(&state.pool, job_id, printer_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))
}

/// POST /api/v1/agent/heartbeat
///
/// Marks the printer online and stamps `last_seen_at`.
pub async fn heartbeat(
    AgentPrinter(printer): AgentPrinter,
    State(state): State<AppState>,
    body: Option<Json<HeartbeatRequest>>,
) -> AppResult<impl IntoResponse> {
    if let Some(claimed) = body.and_then(|Json(b)| b.printer_id) {
        if claimed != printer.id {
            tracing::warn!(
                printer_id = printer.id,
                claimed_printer_id = claimed,
                "Heartbeat names a different printer than its key"
            );
        }
    }

    let printer = PrinterRepo::record_heartbeat(&state.pool, printer.id).await?;
    tracing::debug!(printer_id = printer.id, "Heartbeat received");

    Ok(Json(DataResponse {
        data: HeartbeatAck {
            status: "ok".to_string(),
            printer_id: printer.id,
            printer_name: printer.name,
            server_time: Utc::now(),
        },
    }))
}

/// GET /api/v1/agent/jobs
///
/// Jobs in `ready_for_print`, priority desc then authority position asc.
pub async fn list_ready(
    AgentPrinter(printer): AgentPrinter,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let jobs = JobRepo::list_ready_for_printer(&state.pool, printer.id).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/agent/jobs/local
///
/// Jobs the agent holds locally (queued, awaiting operator, sent).
pub async fn list_local(
    AgentPrinter(printer): AgentPrinter,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let jobs = JobRepo::local_queue(&state.pool, printer.id).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/agent/jobs/{id}/download
///
/// Streams the composed PDF. Only jobs in `ready_for_print` are served;
/// anything else is reported as not found.
pub async fn download(
    AgentPrinter(printer): AgentPrinter,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<Response> {
    let job = find_own_job(&state, job_id, printer.id).await?;
    if job.status != JobStatus::ReadyForPrint {
        return Err(AppError::NotFound(format!(
            "Job {job_id} is not available for download ({})",
            job.status
        )));
    }
    let path = job.composed_artifact_path.as_deref().ok_or_else(|| {
        AppError::NotFound(format!("Job {job_id} has no composed artifact"))
    })?;

    let data = tokio::fs::read(path).await.map_err(|e| {
        tracing::error!(job_id, path, error = %e, "Composed artifact unreadable");
        AppError::NotFound(format!("Artifact for job {job_id} is missing"))
    })?;

    let filename = delivered_filename(job.id, job.event_name.as_deref());
    tracing::info!(job_id, printer_id = printer.id, bytes = data.len(), "Serving artifact");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, data.len().to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(data))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

/// POST /api/v1/agent/jobs/{id}/mark-downloaded
///
/// `ready_for_print → queued_local`, assigning the next local position.
pub async fn mark_downloaded(
    AgentPrinter(printer): AgentPrinter,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::mark_downloaded(&state.pool, job_id, printer.id).await?;
    tracing::info!(
        job_id,
        printer_id = printer.id,
        local_queue_position = ?job.local_queue_position,
        "Job downloaded by agent"
    );
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/agent/jobs/{id}/release
///
/// Agent-side rollback: `queued_local → ready_for_print`.
pub async fn release(
    AgentPrinter(printer): AgentPrinter,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::release(&state.pool, job_id, printer.id).await?;
    tracing::info!(job_id, printer_id = printer.id, "Job released back to ready_for_print");
    Ok(Json(DataResponse { data: job }))
}

/// GET /api/v1/agent/jobs/{id}/print-info
///
/// Delivery instructions for a job the operator has sent. A job in any
/// other state answers 409 `NOT_READY`; a template type with no hot-folder
/// mapping on this printer answers 404.
pub async fn print_info(
    AgentPrinter(printer): AgentPrinter,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_own_job(&state, job_id, printer.id).await?;
    if job.status != JobStatus::SentToPrinter {
        return Err(AppError::Core(CoreError::NotReady(format!(
            "Job {job_id} is {}, not sent_to_printer",
            job.status
        ))));
    }

    let template = TemplateRepo::find_by_id(&state.pool, job.template_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Template",
            id: job.template_id,
        }))?;

    let hot_folder = PrinterRepo::find_hot_folder(&state.pool, printer.id, &template.hot_folder_type)
        .await?
        .ok_or_else(|| {
            tracing::warn!(
                job_id,
                printer_id = printer.id,
                hot_folder_type = %template.hot_folder_type,
                "No hot folder configured for template type"
            );
            AppError::NotFound(format!(
                "No hot folder configured for type '{}' on printer {}",
                template.hot_folder_type, printer.id
            ))
        })?;

    Ok(Json(DataResponse {
        data: PrintInfo {
            job_id: job.id,
            hot_folder_path: hot_folder.path,
            filename: delivered_filename(job.id, job.event_name.as_deref()),
            local_artifact_path: job.composed_artifact_path,
            copies: job.copies,
        },
    }))
}

/// POST /api/v1/agent/jobs/{id}/confirm-sent
///
/// Advisory: records an audit note, no status change.
pub async fn confirm_sent(
    AgentPrinter(printer): AgentPrinter,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(input): Json<DeliveryConfirmation>,
) -> AppResult<impl IntoResponse> {
    let note = delivery_note(&input.filename, input.sent_at);
    JobRepo::append_note_if_status(
        &state.pool,
        job_id,
        printer.id,
        JobStatus::SentToPrinter,
        &note,
    )
    .await?;

    tracing::info!(job_id, printer_id = printer.id, filename = %input.filename, "Delivery confirmed");

    Ok(Json(DataResponse {
        data: DeliveryConfirmed {
            status: "confirmed".to_string(),
            job_id,
        },
    }))
}

/// GET /api/v1/agent/queue-status
pub async fn queue_status(
    AgentPrinter(printer): AgentPrinter,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let counts = JobRepo::count_by_status(&state.pool, printer.id).await?;
    Ok(Json(DataResponse {
        data: QueueStatus::from_counts(printer.id, printer.name, printer.is_online, counts),
    }))
}
