//! Printer and hot-folder models and DTOs.

use jigprint_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `printers` table.
///
/// `api_key_hash` is never serialized; `api_key_prefix` identifies the key
/// in listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Printer {
    pub id: DbId,
    pub name: String,
    pub location: Option<String>,
    pub model: Option<String>,
    #[serde(skip_serializing)]
    pub api_key_hash: String,
    pub api_key_prefix: String,
    pub is_online: bool,
    pub last_seen_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `hot_folders` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct HotFolder {
    pub id: DbId,
    pub printer_id: DbId,
    pub hot_folder_type: String,
    pub path: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A printer with its hot-folder mappings.
#[derive(Debug, Clone, Serialize)]
pub struct PrinterWithHotFolders {
    #[serde(flatten)]
    pub printer: Printer,
    pub hot_folders: Vec<HotFolder>,
}

/// Returned once at registration: includes the plaintext agent key.
#[derive(Debug, Clone, Serialize)]
pub struct PrinterCreatedResponse {
    #[serde(flatten)]
    pub printer: Printer,
    /// Shown **once** and never stored.
    pub api_key: String,
}

/// DTO for `POST /api/v1/printers`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrinter {
    pub name: String,
    pub location: Option<String>,
    pub model: Option<String>,
}

/// DTO for `POST /api/v1/printers/{id}/hot-folders`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateHotFolder {
    pub hot_folder_type: String,
    pub path: String,
    pub description: Option<String>,
}
