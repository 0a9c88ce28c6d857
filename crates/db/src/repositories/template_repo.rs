//! Repository for the `templates` and `template_slots` tables.
//!
//! Slot edits and base-artwork changes bump `templates.updated_at`, which
//! reprints compare against the original job's submission time.

use jigprint_core::error::CoreError;
use jigprint_core::template::ensure_unpublished;
use jigprint_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::RepoError;
use crate::models::template::{
    CreateTemplate, NewTemplateSlot, Template, TemplateSlot, TemplateWithSlots,
};

const COLUMNS: &str = "\
    id, name, description, bed_width_mm, bed_height_mm, hot_folder_type, \
    base_artwork_path, published_at, is_active, created_at, updated_at";

const SLOT_COLUMNS: &str = "\
    id, template_id, slot_key, name, slot_position, x_mm, y_mm, width_mm, height_mm, \
    rotation_deg, product_type, display_order, created_at";

pub struct TemplateRepo;

impl TemplateRepo {
    /// Insert a template with already-validated slots.
    pub async fn create(
        pool: &PgPool,
        input: &CreateTemplate,
        slots: &[NewTemplateSlot],
    ) -> Result<TemplateWithSlots, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO templates (name, description, bed_width_mm, bed_height_mm, hot_folder_type) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let template = sqlx::query_as::<_, Template>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.bed_width_mm)
            .bind(input.bed_height_mm)
            .bind(&input.hot_folder_type)
            .fetch_one(&mut *tx)
            .await?;

        let slots = Self::insert_slots(&mut tx, template.id, slots).await?;
        tx.commit().await?;

        Ok(TemplateWithSlots { template, slots })
    }

    /// Active templates, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Template>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM templates WHERE is_active = true ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Template>(&query).fetch_all(pool).await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Template>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM templates WHERE id = $1");
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_with_slots(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TemplateWithSlots>, sqlx::Error> {
        let Some(template) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let slots = Self::list_slots(pool, id).await?;
        Ok(Some(TemplateWithSlots { template, slots }))
    }

    pub async fn list_slots(
        pool: &PgPool,
        template_id: DbId,
    ) -> Result<Vec<TemplateSlot>, sqlx::Error> {
        let query = format!(
            "SELECT {SLOT_COLUMNS} FROM template_slots \
             WHERE template_id = $1 ORDER BY display_order, id"
        );
        sqlx::query_as::<_, TemplateSlot>(&query)
            .bind(template_id)
            .fetch_all(pool)
            .await
    }

    /// Freeze a template. Requires at least one slot; publishing twice is
    /// a conflict.
    pub async fn publish(pool: &PgPool, id: DbId) -> Result<Template, RepoError> {
        let mut tx = pool.begin().await?;
        let template = Self::lock(&mut tx, id).await?;
        ensure_unpublished(template.published_at)?;

        let slot_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM template_slots WHERE template_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if slot_count == 0 {
            return Err(CoreError::Validation(
                "Template must define at least one slot before publishing".to_string(),
            )
            .into());
        }

        let query = format!(
            "UPDATE templates SET published_at = NOW(), updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let template = sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(template)
    }

    /// Point an unpublished template at newly stored base artwork.
    pub async fn set_base_artwork(
        pool: &PgPool,
        id: DbId,
        path: &str,
    ) -> Result<Template, RepoError> {
        let mut tx = pool.begin().await?;
        let template = Self::lock(&mut tx, id).await?;
        ensure_unpublished(template.published_at)?;

        let query = format!(
            "UPDATE templates SET base_artwork_path = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let template = sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .bind(path)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(template)
    }

    /// Replace every slot of an unpublished template.
    pub async fn replace_slots(
        pool: &PgPool,
        id: DbId,
        slots: &[NewTemplateSlot],
    ) -> Result<TemplateWithSlots, RepoError> {
        let mut tx = pool.begin().await?;
        let template = Self::lock(&mut tx, id).await?;
        ensure_unpublished(template.published_at)?;

        sqlx::query("DELETE FROM template_slots WHERE template_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let slots = Self::insert_slots(&mut tx, id, slots).await?;

        let query = format!("UPDATE templates SET updated_at = NOW() WHERE id = $1 RETURNING {COLUMNS}");
        let template = sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(TemplateWithSlots { template, slots })
    }

    async fn lock(tx: &mut Transaction<'_, Postgres>, id: DbId) -> Result<Template, RepoError> {
        let query = format!("SELECT {COLUMNS} FROM templates WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "Template",
                    id,
                }
                .into()
            })
    }

    async fn insert_slots(
        tx: &mut Transaction<'_, Postgres>,
        template_id: DbId,
        slots: &[NewTemplateSlot],
    ) -> Result<Vec<TemplateSlot>, sqlx::Error> {
        let query = format!(
            "INSERT INTO template_slots \
                (template_id, slot_key, name, slot_position, x_mm, y_mm, width_mm, height_mm, \
                 rotation_deg, product_type, display_order) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {SLOT_COLUMNS}"
        );

        let mut inserted = Vec::with_capacity(slots.len());
        for slot in slots {
            let row = sqlx::query_as::<_, TemplateSlot>(&query)
                .bind(template_id)
                .bind(&slot.slot_key)
                .bind(&slot.name)
                .bind(&slot.slot_position)
                .bind(slot.rect.x_mm)
                .bind(slot.rect.y_mm)
                .bind(slot.rect.width_mm)
                .bind(slot.rect.height_mm)
                .bind(slot.rotation_deg)
                .bind(&slot.product_type)
                .bind(slot.display_order)
                .fetch_one(&mut **tx)
                .await?;
            inserted.push(row);
        }
        Ok(inserted)
    }
}
