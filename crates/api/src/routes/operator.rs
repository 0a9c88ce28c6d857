//! Route definitions for the operator console.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::operator;
use crate::state::AppState;

/// Routes mounted at `/operator`.
///
/// ```text
/// GET    /printers/{id}/queue       -> local_queue
/// GET    /printers/{id}/history     -> history
/// POST   /printers/{id}/reorder     -> reorder
/// POST   /jobs/{id}/jig-loaded      -> jig_loaded
/// POST   /jobs/{id}/print           -> print
/// POST   /jobs/{id}/complete        -> complete
/// POST   /jobs/{id}/fail            -> fail
/// POST   /jobs/{id}/return-to-queue -> return_to_queue
/// POST   /jobs/{id}/requeue         -> requeue
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/printers/{id}/queue", get(operator::local_queue))
        .route("/printers/{id}/history", get(operator::history))
        .route("/printers/{id}/reorder", post(operator::reorder))
        .route("/jobs/{id}/jig-loaded", post(operator::jig_loaded))
        .route("/jobs/{id}/print", post(operator::print))
        .route("/jobs/{id}/complete", post(operator::complete))
        .route("/jobs/{id}/fail", post(operator::fail))
        .route("/jobs/{id}/return-to-queue", post(operator::return_to_queue))
        .route("/jobs/{id}/requeue", post(operator::requeue))
}
