//! Handlers for the operator console under `/operator`.
//!
//! The operator works one printer's local queue: reorder it, confirm the
//! jig is loaded, send to the printer, then record the outcome.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use jigprint_core::error::CoreError;
use jigprint_core::job_status::JobStatus;
use jigprint_core::notes::failure_note;
use jigprint_core::types::DbId;
use jigprint_db::models::job::{FailRequest, OperatorNote, ReorderRequest};
use jigprint_db::repositories::{JobRepo, PrinterRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

async fn ensure_printer(state: &AppState, printer_id: DbId) -> AppResult<()> {
    PrinterRepo::find_by_id(&state.pool, printer_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Printer",
            id: printer_id,
        }))?;
    Ok(())
}

/// GET /api/v1/operator/printers/{id}/queue
pub async fn local_queue(
    State(state): State<AppState>,
    Path(printer_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_printer(&state, printer_id).await?;
    let jobs = JobRepo::local_queue(&state.pool, printer_id).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/operator/printers/{id}/history
pub async fn history(
    State(state): State<AppState>,
    Path(printer_id): Path<DbId>,
    Query(params): Query<HistoryQuery>,
) -> AppResult<impl IntoResponse> {
    ensure_printer(&state, printer_id).await?;
    let jobs = JobRepo::history(&state.pool, printer_id, params.limit).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// POST /api/v1/operator/printers/{id}/reorder
///
/// Positions follow the submitted order. Ids that are not reorderable on
/// this printer are ignored.
pub async fn reorder(
    State(state): State<AppState>,
    Path(printer_id): Path<DbId>,
    Json(input): Json<ReorderRequest>,
) -> AppResult<impl IntoResponse> {
    ensure_printer(&state, printer_id).await?;
    let jobs = JobRepo::reorder(&state.pool, printer_id, &input.job_ids).await?;
    tracing::info!(printer_id, requested = input.job_ids.len(), "Local queue reordered");
    Ok(Json(DataResponse { data: jobs }))
}

/// POST /api/v1/operator/jobs/{id}/jig-loaded
///
/// `queued_local → awaiting_operator`.
pub async fn jig_loaded(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::transition(&state.pool, job_id, None, JobStatus::AwaitingOperator).await?;
    tracing::info!(job_id, "Jig loaded");
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/operator/jobs/{id}/print
///
/// `awaiting_operator → sent_to_printer`. The agent picks this up on its
/// next print-trigger tick.
pub async fn print(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::transition(&state.pool, job_id, None, JobStatus::SentToPrinter).await?;
    tracing::info!(job_id, "Print requested");
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/operator/jobs/{id}/complete
///
/// `sent_to_printer → printed`, with an optional note.
pub async fn complete(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    body: Option<Json<OperatorNote>>,
) -> AppResult<impl IntoResponse> {
    let note = body.and_then(|Json(b)| b.notes).filter(|n| !n.trim().is_empty());
    let job =
        JobRepo::transition_with_note(&state.pool, job_id, JobStatus::Printed, note.as_deref())
            .await?;
    tracing::info!(job_id, "Job printed");
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/operator/jobs/{id}/fail
///
/// `awaiting_operator | sent_to_printer → failed`; the reason is appended
/// to the operator notes as `Failed: <reason>`.
pub async fn fail(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(input): Json<FailRequest>,
) -> AppResult<impl IntoResponse> {
    let reason = input.reason.trim();
    if reason.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Failure reason is required".into(),
        )));
    }
    let job = JobRepo::transition_with_note(
        &state.pool,
        job_id,
        JobStatus::Failed,
        Some(&failure_note(reason)),
    )
    .await?;
    tracing::warn!(job_id, reason, "Job failed");
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/operator/jobs/{id}/return-to-queue
///
/// `awaiting_operator → queued_local`.
pub async fn return_to_queue(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::find_by_id(&state.pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;
    if job.status != JobStatus::AwaitingOperator {
        return Err(AppError::Core(CoreError::InvalidTransition {
            from: job.status.as_str(),
            to: JobStatus::QueuedLocal.as_str(),
        }));
    }
    let job = JobRepo::transition(&state.pool, job_id, None, JobStatus::QueuedLocal).await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/operator/jobs/{id}/requeue
///
/// `failed → ready_for_print`; the agent downloads it again.
pub async fn requeue(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::requeue(&state.pool, job_id).await?;
    tracing::info!(job_id, "Failed job re-queued");
    Ok(Json(DataResponse { data: job }))
}
