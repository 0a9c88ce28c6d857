//! Handlers for the `/templates` resource (jig layouts).

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use jigprint_core::error::CoreError;
use jigprint_core::geometry::BedSize;
use jigprint_core::template::{ensure_unpublished, validate_hot_folder_type};
use jigprint_core::types::DbId;
use jigprint_db::models::template::{
    resolve_slots, CreateTemplate, Template, VisualLayout, VisualSlot,
};
use jigprint_db::repositories::TemplateRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

async fn find_template(state: &AppState, id: DbId) -> AppResult<Template> {
    TemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Template",
            id,
        }))
}

/// POST /api/v1/templates
pub async fn create_template(
    State(state): State<AppState>,
    Json(input): Json<CreateTemplate>,
) -> AppResult<impl IntoResponse> {
    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Template name is required".into(),
        )));
    }
    validate_hot_folder_type(&input.hot_folder_type)?;
    let bed = BedSize::new(input.bed_width_mm, input.bed_height_mm)?;
    let slots = resolve_slots(&bed, &input.slots)?;

    let created = TemplateRepo::create(&state.pool, &input, &slots).await?;
    tracing::info!(
        template_id = created.template.id,
        slots = created.slots.len(),
        hot_folder_type = %created.template.hot_folder_type,
        "Template created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/templates
pub async fn list_templates(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let templates = TemplateRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// GET /api/v1/templates/{id}
pub async fn get_template(
    State(state): State<AppState>,
    Path(template_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let template = TemplateRepo::find_with_slots(&state.pool, template_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Template",
            id: template_id,
        }))?;
    Ok(Json(DataResponse { data: template }))
}

/// POST /api/v1/templates/{id}/publish
///
/// After publishing, slots and base artwork are frozen.
pub async fn publish_template(
    State(state): State<AppState>,
    Path(template_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let template = TemplateRepo::publish(&state.pool, template_id).await?;
    tracing::info!(template_id, "Template published");
    Ok(Json(DataResponse { data: template }))
}

/// POST /api/v1/templates/{id}/base-artwork
///
/// Multipart upload with a `file` field holding a PDF.
pub async fn upload_base_artwork(
    State(state): State<AppState>,
    Path(template_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let template = find_template(&state, template_id).await?;
    ensure_unpublished(template.published_at)?;

    let mut data: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            data = Some(bytes.to_vec());
        }
    }
    let data = data.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;

    let path = state.storage.save_base_artwork(template_id, &data).await?;
    let template =
        TemplateRepo::set_base_artwork(&state.pool, template_id, &path.to_string_lossy()).await?;

    tracing::info!(template_id, path = %path.display(), bytes = data.len(), "Base artwork stored");
    Ok(Json(DataResponse { data: template }))
}

/// GET /api/v1/templates/{id}/slots/visual
///
/// Slots as percentages of the bed, for the visual editor.
pub async fn get_visual_slots(
    State(state): State<AppState>,
    Path(template_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let template = find_template(&state, template_id).await?;
    let slots = TemplateRepo::list_slots(&state.pool, template_id).await?;
    let bed = template.bed();

    Ok(Json(DataResponse {
        data: VisualLayout {
            template_id,
            bed_width_mm: template.bed_width_mm,
            bed_height_mm: template.bed_height_mm,
            published: template.published_at.is_some(),
            base_artwork_available: template.base_artwork_path.is_some(),
            slots: slots.iter().map(|s| VisualSlot::from_slot(s, &bed)).collect(),
        },
    }))
}

/// PUT /api/v1/templates/{id}/slots/visual
///
/// Replace every slot from percentages. Unpublished templates only.
pub async fn replace_visual_slots(
    State(state): State<AppState>,
    Path(template_id): Path<DbId>,
    Json(input): Json<Vec<VisualSlot>>,
) -> AppResult<impl IntoResponse> {
    let template = find_template(&state, template_id).await?;
    ensure_unpublished(template.published_at)?;

    let bed = template.bed();
    let slots: Vec<_> = input.iter().map(|s| s.to_create(&bed)).collect();
    let resolved = resolve_slots(&bed, &slots)?;

    let updated = TemplateRepo::replace_slots(&state.pool, template_id, &resolved).await?;
    tracing::info!(template_id, slots = updated.slots.len(), "Template slots replaced");
    Ok(Json(DataResponse { data: updated }))
}
