//! Handlers for the designer-facing `/jobs` resource.
//!
//! Editing (fields, slot artwork) is only allowed while a job is `draft`
//! or `pending_review`; deletion only while `draft`. Submission composes
//! the page first and only then asks for `ready_for_print`.

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jigprint_compose::CompositionReport;
use jigprint_core::error::CoreError;
use jigprint_core::hot_folder::delivered_filename;
use jigprint_core::job::{validate_copies, validate_priority, validate_submission, validate_text};
use jigprint_core::job_status::{ensure_editable, JobStatus};
use jigprint_core::types::DbId;
use jigprint_db::models::job::{
    CreateJob, Job, JobListQuery, JobWithSlots, ReprintRequest, UpdateJob,
};
use jigprint_db::repositories::{JobRepo, PrinterRepo, TemplateRepo};
use serde::Serialize;

use crate::composition::{build_request, compose_job};
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Response for `POST /jobs/{id}/submit`.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job: Job,
    pub composition: CompositionReport,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_job(state: &AppState, job_id: DbId) -> AppResult<Job> {
    JobRepo::find_by_id(&state.pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))
}

fn validate_fields(
    copies: Option<i32>,
    priority: Option<i32>,
    texts: &[(&str, Option<&str>)],
) -> Result<(), CoreError> {
    if let Some(copies) = copies {
        validate_copies(copies)?;
    }
    if let Some(priority) = priority {
        validate_priority(priority)?;
    }
    for (field, value) in texts {
        validate_text(field, *value)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs
///
/// Optional `printer_id`, `status`, `limit` (default 50, max 100) and
/// `offset`. Ordered priority desc, authority position asc, created asc.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = JobRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// POST /api/v1/jobs
///
/// Create a draft job for a published template. Returns 201.
pub async fn create_job(
    State(state): State<AppState>,
    Json(input): Json<CreateJob>,
) -> AppResult<impl IntoResponse> {
    validate_fields(
        input.copies,
        input.priority,
        &[
            ("job_name", input.job_name.as_deref()),
            ("event_name", input.event_name.as_deref()),
        ],
    )?;
    for slot in &input.slots {
        validate_fields(
            None,
            None,
            &[
                ("guest_name", slot.guest_name.as_deref()),
                ("recipient", slot.recipient.as_deref()),
                ("product_sku", slot.product_sku.as_deref()),
                ("product_name", slot.product_name.as_deref()),
            ],
        )?;
    }

    PrinterRepo::find_by_id(&state.pool, input.printer_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Printer",
            id: input.printer_id,
        }))?;

    let template = TemplateRepo::find_by_id(&state.pool, input.template_id)
        .await?
        .filter(|t| t.is_active)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Template",
            id: input.template_id,
        }))?;
    if template.published_at.is_none() {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Template {} must be published before jobs can use it",
            template.id
        ))));
    }

    let template_slots = TemplateRepo::list_slots(&state.pool, template.id).await?;
    let created = JobRepo::create(&state.pool, &input, &template_slots).await?;

    tracing::info!(
        job_id = created.job.id,
        printer_id = created.job.printer_id,
        template_id = created.job.template_id,
        slots = created.slots.len(),
        authority_queue_position = ?created.job.authority_queue_position,
        "Job created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::find_with_slots(&state.pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;
    Ok(Json(DataResponse { data: job }))
}

/// PUT /api/v1/jobs/{id}
pub async fn update_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(input): Json<UpdateJob>,
) -> AppResult<impl IntoResponse> {
    validate_fields(
        input.copies,
        input.priority,
        &[
            ("job_name", input.job_name.as_deref()),
            ("event_name", input.event_name.as_deref()),
        ],
    )?;
    let job = JobRepo::update(&state.pool, job_id, &input).await?;
    Ok(Json(DataResponse { data: job }))
}

/// DELETE /api/v1/jobs/{id}
///
/// Drafts only. Returns 204.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<StatusCode> {
    JobRepo::delete(&state.pool, job_id).await?;
    tracing::info!(job_id, "Job deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/jobs/{id}/slots/{slot_id}/asset
///
/// Multipart upload with a `file` field. Editable jobs only.
pub async fn upload_slot_asset(
    State(state): State<AppState>,
    Path((job_id, slot_id)): Path<(DbId, DbId)>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state, job_id).await?;
    ensure_editable(job.status)?;

    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("label.png").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            file = Some((filename, data.to_vec()));
        }
    }
    let (filename, data) =
        file.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;

    let path = state
        .storage
        .save_label(job_id, slot_id, &filename, &data)
        .await?;
    let slot = JobRepo::set_slot_asset(&state.pool, job_id, slot_id, &path.to_string_lossy())
        .await?;

    tracing::info!(job_id, slot_id, path = %path.display(), "Label artwork uploaded");
    Ok(Json(DataResponse { data: slot }))
}

// ---------------------------------------------------------------------------
// Editing-stage transitions
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/submit-for-review
///
/// `draft → pending_review`.
pub async fn submit_for_review(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state, job_id).await?;
    if job.status != JobStatus::Draft {
        return Err(AppError::Core(CoreError::InvalidTransition {
            from: job.status.as_str(),
            to: JobStatus::PendingReview.as_str(),
        }));
    }
    let job = JobRepo::transition(&state.pool, job_id, None, JobStatus::PendingReview).await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/jobs/{id}/return-to-draft
///
/// `pending_review → draft`.
pub async fn return_to_draft(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::transition(&state.pool, job_id, None, JobStatus::Draft).await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/jobs/{id}/submit
///
/// Compose the page, then move the job to `ready_for_print` with the
/// artifact recorded. Slots with missing or unreadable artwork are
/// skipped by the composer and listed in the response.
pub async fn submit_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let JobWithSlots { job, slots } = JobRepo::find_with_slots(&state.pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;
    ensure_editable(job.status)?;

    let missing: Vec<String> = slots
        .iter()
        .filter(|s| s.label_asset_path.is_none())
        .map(|s| s.display_name().to_string())
        .collect();
    validate_submission(slots.len(), &missing)?;

    let template = TemplateRepo::find_by_id(&state.pool, job.template_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Template",
            id: job.template_id,
        }))?;
    let template_slots = TemplateRepo::list_slots(&state.pool, template.id).await?;

    let request = build_request(&template, &template_slots, &slots);
    let (artifact, report) = compose_job(&state.storage, job_id, request).await?;

    let job = JobRepo::submit(&state.pool, job_id, &artifact.to_string_lossy()).await?;

    tracing::info!(
        job_id,
        artifact = %artifact.display(),
        placed = report.placed,
        placeholders = report.placeholders,
        skipped = report.skipped.len(),
        "Job submitted for printing"
    );

    Ok(Json(DataResponse {
        data: SubmitResponse {
            job,
            composition: report,
        },
    }))
}

// ---------------------------------------------------------------------------
// Reprint and artifact
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/reprint
///
/// Create a new `ready_for_print` job from a printed or failed one,
/// reusing its artifact. Returns 201.
pub async fn reprint_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(input): Json<ReprintRequest>,
) -> AppResult<impl IntoResponse> {
    let reason = input.reason.trim();
    if reason.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Reprint reason is required".into(),
        )));
    }
    validate_text("reason", Some(reason))?;

    let (created, plan) = JobRepo::reprint(&state.pool, job_id, reason).await?;
    if plan.artifact_may_be_stale {
        tracing::warn!(
            original_job_id = job_id,
            new_job_id = created.job.id,
            template_id = created.job.template_id,
            "Template changed since the original was composed; reprint reuses the old artifact"
        );
    }

    tracing::info!(
        original_job_id = job_id,
        new_job_id = created.job.id,
        priority = created.job.priority,
        "Job reprinted"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/jobs/{id}/artifact
///
/// Download the composed PDF for review.
pub async fn download_artifact(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<Response> {
    let job = find_job(&state, job_id).await?;
    let path = job
        .composed_artifact_path
        .as_deref()
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} has not been composed")))?;

    let data = tokio::fs::read(path)
        .await
        .map_err(|_| AppError::NotFound(format!("Artifact for job {job_id} is missing")))?;
    let filename = delivered_filename(job.id, job.event_name.as_deref());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, data.len().to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{filename}\""),
        )
        .body(Body::from(data))
        .map_err(|e| AppError::InternalError(e.to_string()))
}
