//! Route definitions for the printer agent.
//!
//! Every endpoint requires a printer's `X-API-Key`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::agent;
use crate::state::AppState;

/// Routes mounted at `/agent`.
///
/// ```text
/// POST   /heartbeat                 -> heartbeat
/// GET    /queue-status              -> queue_status
/// GET    /jobs                      -> list_ready
/// GET    /jobs/local                -> list_local
/// GET    /jobs/{id}/download        -> download
/// POST   /jobs/{id}/mark-downloaded -> mark_downloaded
/// POST   /jobs/{id}/release         -> release
/// GET    /jobs/{id}/print-info      -> print_info
/// POST   /jobs/{id}/confirm-sent    -> confirm_sent
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/heartbeat", post(agent::heartbeat))
        .route("/queue-status", get(agent::queue_status))
        .route("/jobs", get(agent::list_ready))
        .route("/jobs/local", get(agent::list_local))
        .route("/jobs/{id}/download", get(agent::download))
        .route("/jobs/{id}/mark-downloaded", post(agent::mark_downloaded))
        .route("/jobs/{id}/release", post(agent::release))
        .route("/jobs/{id}/print-info", get(agent::print_info))
        .route("/jobs/{id}/confirm-sent", post(agent::confirm_sent))
}
