//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope. The printer agent
//! unwraps the same envelope on its side.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: jobs }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
