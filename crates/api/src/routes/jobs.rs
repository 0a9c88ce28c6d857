//! Route definitions for the `/jobs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                          -> list_jobs
/// POST   /                          -> create_job
/// GET    /{id}                      -> get_job
/// PUT    /{id}                      -> update_job
/// DELETE /{id}                      -> delete_job
/// POST   /{id}/slots/{slot_id}/asset -> upload_slot_asset
/// POST   /{id}/submit-for-review    -> submit_for_review
/// POST   /{id}/return-to-draft      -> return_to_draft
/// POST   /{id}/submit               -> submit_job
/// POST   /{id}/reprint              -> reprint_job
/// GET    /{id}/artifact             -> download_artifact
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::create_job))
        .route(
            "/{id}",
            get(jobs::get_job)
                .put(jobs::update_job)
                .delete(jobs::delete_job),
        )
        .route(
            "/{id}/slots/{slot_id}/asset",
            post(jobs::upload_slot_asset),
        )
        .route("/{id}/submit-for-review", post(jobs::submit_for_review))
        .route("/{id}/return-to-draft", post(jobs::return_to_draft))
        .route("/{id}/submit", post(jobs::submit_job))
        .route("/{id}/reprint", post(jobs::reprint_job))
        .route("/{id}/artifact", get(jobs::download_artifact))
}
