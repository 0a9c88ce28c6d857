//! Printer-agent authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jigprint_core::api_keys::{hash_api_key, API_KEY_HEADER};
use jigprint_core::error::CoreError;
use jigprint_db::models::printer::Printer;
use jigprint_db::repositories::PrinterRepo;

use crate::error::AppError;
use crate::state::AppState;

/// The printer whose agent key was presented in the `X-API-Key` header.
///
/// Unknown or missing keys are rejected before any job data is read:
///
/// ```ignore
/// async fn my_handler(AgentPrinter(printer): AgentPrinter) -> AppResult<Json<()>> {
///     tracing::info!(printer_id = printer.id, "handling agent request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AgentPrinter(pub Printer);

impl FromRequestParts<AppState> for AgentPrinter {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(format!(
                    "Missing {API_KEY_HEADER} header"
                )))
            })?;

        let printer = PrinterRepo::find_by_key_hash(&state.pool, &hash_api_key(key))
            .await?
            .ok_or_else(|| {
                tracing::warn!("Rejected agent request with unknown key");
                AppError::Core(CoreError::Unauthorized("Invalid agent key".into()))
            })?;

        Ok(AgentPrinter(printer))
    }
}
