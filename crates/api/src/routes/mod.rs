pub mod agent;
pub mod health;
pub mod jobs;
pub mod operator;
pub mod printers;
pub mod templates;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /agent/...        printer agent (X-API-Key)
/// /jobs/...         designer job lifecycle
/// /operator/...     local queue and print outcome
/// /templates/...    jig layouts
/// /printers/...     registration and hot folders
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/agent", agent::router())
        .nest("/jobs", jobs::router())
        .nest("/operator", operator::router())
        .nest("/templates", templates::router())
        .nest("/printers", printers::router())
}
