//! Repository for the `printers` and `hot_folders` tables.

use jigprint_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::printer::{CreateHotFolder, HotFolder, Printer};

const COLUMNS: &str = "\
    id, name, location, model, api_key_hash, api_key_prefix, \
    is_online, last_seen_at, created_at, updated_at";

const HOT_FOLDER_COLUMNS: &str = "\
    id, printer_id, hot_folder_type, path, description, created_at, updated_at";

pub struct PrinterRepo;

impl PrinterRepo {
    /// Register a printer. The caller generates the key and passes its
    /// hash and prefix.
    pub async fn create(
        pool: &PgPool,
        name: &str,
        location: Option<&str>,
        model: Option<&str>,
        api_key_hash: &str,
        api_key_prefix: &str,
    ) -> Result<Printer, sqlx::Error> {
        let query = format!(
            "INSERT INTO printers (name, location, model, api_key_hash, api_key_prefix) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Printer>(&query)
            .bind(name)
            .bind(location)
            .bind(model)
            .bind(api_key_hash)
            .bind(api_key_prefix)
            .fetch_one(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Printer>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM printers ORDER BY name, id");
        sqlx::query_as::<_, Printer>(&query).fetch_all(pool).await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Printer>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM printers WHERE id = $1");
        sqlx::query_as::<_, Printer>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Look up the printer owning an agent key, by the key's SHA-256 hash.
    pub async fn find_by_key_hash(
        pool: &PgPool,
        api_key_hash: &str,
    ) -> Result<Option<Printer>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM printers WHERE api_key_hash = $1");
        sqlx::query_as::<_, Printer>(&query)
            .bind(api_key_hash)
            .fetch_optional(pool)
            .await
    }

    /// Record a heartbeat: mark online and stamp last-seen.
    pub async fn record_heartbeat(pool: &PgPool, id: DbId) -> Result<Printer, sqlx::Error> {
        let query = format!(
            "UPDATE printers SET is_online = true, last_seen_at = NOW(), updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Printer>(&query)
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Mark printers offline whose last heartbeat is older than `cutoff`.
    /// Returns the number of printers changed.
    pub async fn mark_stale_offline(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE printers SET is_online = false, updated_at = NOW() \
             WHERE is_online = true AND (last_seen_at IS NULL OR last_seen_at < $1)",
        )
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Hot folders
    // -----------------------------------------------------------------------

    pub async fn add_hot_folder(
        pool: &PgPool,
        printer_id: DbId,
        input: &CreateHotFolder,
    ) -> Result<HotFolder, sqlx::Error> {
        let query = format!(
            "INSERT INTO hot_folders (printer_id, hot_folder_type, path, description) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {HOT_FOLDER_COLUMNS}"
        );
        sqlx::query_as::<_, HotFolder>(&query)
            .bind(printer_id)
            .bind(&input.hot_folder_type)
            .bind(&input.path)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    pub async fn list_hot_folders(
        pool: &PgPool,
        printer_id: DbId,
    ) -> Result<Vec<HotFolder>, sqlx::Error> {
        let query = format!(
            "SELECT {HOT_FOLDER_COLUMNS} FROM hot_folders \
             WHERE printer_id = $1 ORDER BY hot_folder_type"
        );
        sqlx::query_as::<_, HotFolder>(&query)
            .bind(printer_id)
            .fetch_all(pool)
            .await
    }

    /// The delivery path for a template's hot-folder type on one printer.
    pub async fn find_hot_folder(
        pool: &PgPool,
        printer_id: DbId,
        hot_folder_type: &str,
    ) -> Result<Option<HotFolder>, sqlx::Error> {
        let query = format!(
            "SELECT {HOT_FOLDER_COLUMNS} FROM hot_folders \
             WHERE printer_id = $1 AND hot_folder_type = $2"
        );
        sqlx::query_as::<_, HotFolder>(&query)
            .bind(printer_id)
            .bind(hot_folder_type)
            .fetch_optional(pool)
            .await
    }
}
