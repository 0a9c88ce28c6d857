//! Route definitions for the `/printers` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::printers;
use crate::state::AppState;

/// Routes mounted at `/printers`.
///
/// ```text
/// GET    /                  -> list_printers
/// POST   /                  -> create_printer
/// GET    /{id}              -> get_printer
/// POST   /{id}/hot-folders  -> add_hot_folder
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(printers::list_printers).post(printers::create_printer),
        )
        .route("/{id}", get(printers::get_printer))
        .route("/{id}/hot-folders", post(printers::add_hot_folder))
}
