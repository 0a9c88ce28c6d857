//! Route definitions for the `/templates` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::templates;
use crate::state::AppState;

/// Routes mounted at `/templates`.
///
/// ```text
/// GET    /                    -> list_templates
/// POST   /                    -> create_template
/// GET    /{id}                -> get_template
/// POST   /{id}/publish        -> publish_template
/// POST   /{id}/base-artwork   -> upload_base_artwork
/// GET    /{id}/slots/visual   -> get_visual_slots
/// PUT    /{id}/slots/visual   -> replace_visual_slots
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(templates::list_templates).post(templates::create_template),
        )
        .route("/{id}", get(templates::get_template))
        .route("/{id}/publish", post(templates::publish_template))
        .route("/{id}/base-artwork", post(templates::upload_base_artwork))
        .route(
            "/{id}/slots/visual",
            get(templates::get_visual_slots).put(templates::replace_visual_slots),
        )
}
