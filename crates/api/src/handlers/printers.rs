//! Handlers for printer registration and hot-folder mappings.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use jigprint_core::api_keys::generate_api_key;
use jigprint_core::error::CoreError;
use jigprint_core::template::validate_hot_folder_type;
use jigprint_core::types::DbId;
use jigprint_db::models::printer::{
    CreateHotFolder, CreatePrinter, Printer, PrinterCreatedResponse, PrinterWithHotFolders,
};
use jigprint_db::repositories::PrinterRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

async fn find_printer(state: &AppState, id: DbId) -> AppResult<Printer> {
    PrinterRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Printer",
            id,
        }))
}

/// POST /api/v1/printers
///
/// The response carries the plaintext agent key. It is not retrievable
/// afterwards.
pub async fn create_printer(
    State(state): State<AppState>,
    Json(input): Json<CreatePrinter>,
) -> AppResult<impl IntoResponse> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Printer name is required".into(),
        )));
    }

    let key = generate_api_key();
    let printer = PrinterRepo::create(
        &state.pool,
        name,
        input.location.as_deref(),
        input.model.as_deref(),
        &key.hash,
        &key.prefix,
    )
    .await?;

    tracing::info!(printer_id = printer.id, key_prefix = %printer.api_key_prefix, "Printer registered");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: PrinterCreatedResponse {
                printer,
                api_key: key.plaintext,
            },
        }),
    ))
}

/// GET /api/v1/printers
pub async fn list_printers(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let printers = PrinterRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: printers }))
}

/// GET /api/v1/printers/{id}
pub async fn get_printer(
    State(state): State<AppState>,
    Path(printer_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let printer = find_printer(&state, printer_id).await?;
    let hot_folders = PrinterRepo::list_hot_folders(&state.pool, printer_id).await?;
    Ok(Json(DataResponse {
        data: PrinterWithHotFolders {
            printer,
            hot_folders,
        },
    }))
}

/// POST /api/v1/printers/{id}/hot-folders
///
/// One mapping per hot-folder type; a duplicate type is a 409.
pub async fn add_hot_folder(
    State(state): State<AppState>,
    Path(printer_id): Path<DbId>,
    Json(input): Json<CreateHotFolder>,
) -> AppResult<impl IntoResponse> {
    validate_hot_folder_type(&input.hot_folder_type)?;
    if input.path.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Hot folder path is required".into(),
        )));
    }
    find_printer(&state, printer_id).await?;

    let folder = PrinterRepo::add_hot_folder(&state.pool, printer_id, &input).await?;
    tracing::info!(
        printer_id,
        hot_folder_type = %folder.hot_folder_type,
        path = %folder.path,
        "Hot folder mapped"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: folder })))
}
