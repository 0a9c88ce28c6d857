//! Repository for the `jobs` and `job_slots` tables.
//!
//! Status changes follow one pattern: lock the job row with
//! `SELECT … FOR UPDATE`, apply [`Lifecycle::transition`] plus any field
//! changes in memory, then write the mutable columns back with
//! [`JobRepo::persist`]. Two concurrent requests therefore can never both
//! observe the same stale status and both succeed.
//!
//! Queue positions use `MAX + 1` inside the same transaction. Duplicates
//! under contention are tolerated; display order breaks ties.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use jigprint_core::error::CoreError;
use jigprint_core::job::validate_submission;
use jigprint_core::job_status::{
    ensure_deletable, ensure_editable, JobStatus, HISTORY_STATUSES, LOCAL_QUEUE_STATUSES,
    REORDERABLE_STATUSES,
};
use jigprint_core::notes::append_note;
use jigprint_core::queue::{next_position, plan_reorder, sort_for_display, QueueDimension};
use jigprint_core::reprint::{plan_reprint, ReprintPlan, ReprintSource};
use jigprint_core::types::{DbId, StatusId, Timestamp};
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::RepoError;
use crate::models::job::{CreateJob, Job, JobListQuery, JobSlot, JobWithSlots, UpdateJob};
use crate::models::template::TemplateSlot;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, printer_id, template_id, status_id, authority_queue_position, local_queue_position, \
    priority, job_name, event_name, event_date, copies, composed_artifact_path, \
    reprint_of, reprint_reason, operator_notes, designer_notes, \
    created_at, updated_at, submitted_at, downloaded_at, printed_at";

const SLOT_COLUMNS: &str = "\
    id, job_id, template_slot_key, slot_position, slot_label, label_asset_path, \
    guest_name, recipient, product_sku, product_name, product_type, created_at, updated_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// Default number of history entries.
pub const DEFAULT_HISTORY_LIMIT: i64 = 20;

/// Display order for authority-side lists.
const AUTHORITY_ORDER: &str =
    "ORDER BY priority DESC, authority_queue_position ASC NULLS LAST, created_at ASC, id ASC";

fn status_ids(statuses: &[JobStatus]) -> Vec<StatusId> {
    statuses.iter().map(|s| s.id()).collect()
}

fn not_found(id: DbId) -> CoreError {
    CoreError::NotFound { entity: "Job", id }
}

pub struct JobRepo;

impl JobRepo {
    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Create a draft job with its slots.
    ///
    /// Every slot must name a slot of the job's template; position letter,
    /// label and product type default from that template slot. The job
    /// gets the next authority position for its printer.
    pub async fn create(
        pool: &PgPool,
        input: &CreateJob,
        template_slots: &[TemplateSlot],
    ) -> Result<JobWithSlots, RepoError> {
        let by_key: HashMap<&str, &TemplateSlot> = template_slots
            .iter()
            .map(|s| (s.slot_key.as_str(), s))
            .collect();
        let mut seen = HashSet::new();
        for slot in &input.slots {
            if !by_key.contains_key(slot.template_slot_key.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Template {} has no slot '{}'",
                    input.template_id, slot.template_slot_key
                ))
                .into());
            }
            if !seen.insert(slot.template_slot_key.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Slot '{}' is filled more than once",
                    slot.template_slot_key
                ))
                .into());
            }
        }

        let mut tx = pool.begin().await?;

        let position = Self::next_authority_position(&mut tx, input.printer_id).await?;
        let query = format!(
            "INSERT INTO jobs \
                (printer_id, template_id, status_id, authority_queue_position, priority, \
                 job_name, event_name, event_date, copies, designer_notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(input.printer_id)
            .bind(input.template_id)
            .bind(JobStatus::Draft.id())
            .bind(position)
            .bind(input.priority.unwrap_or(0))
            .bind(&input.job_name)
            .bind(&input.event_name)
            .bind(input.event_date)
            .bind(input.copies.unwrap_or(1))
            .bind(&input.designer_notes)
            .fetch_one(&mut *tx)
            .await?;

        let slot_query = format!(
            "INSERT INTO job_slots \
                (job_id, template_slot_key, slot_position, slot_label, label_asset_path, \
                 guest_name, recipient, product_sku, product_name, product_type) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {SLOT_COLUMNS}"
        );
        let mut slots = Vec::with_capacity(input.slots.len());
        for slot in &input.slots {
            let template_slot = by_key[slot.template_slot_key.as_str()];
            let row = sqlx::query_as::<_, JobSlot>(&slot_query)
                .bind(job.id)
                .bind(&slot.template_slot_key)
                .bind(&template_slot.slot_position)
                .bind(slot.slot_label.as_deref().unwrap_or(&template_slot.name))
                .bind(&slot.label_asset_path)
                .bind(&slot.guest_name)
                .bind(&slot.recipient)
                .bind(&slot.product_sku)
                .bind(&slot.product_name)
                .bind(slot.product_type.as_ref().or(template_slot.product_type.as_ref()))
                .fetch_one(&mut *tx)
                .await?;
            slots.push(row);
        }

        tx.commit().await?;
        Ok(JobWithSlots { job, slots })
    }

    /// Create a reprint of a finished job.
    ///
    /// The new job reuses the original's artifact and a verbatim copy of
    /// its slots, enters at `ready_for_print` with priority + 1 and gets a
    /// fresh authority position. The returned plan says whether the
    /// template changed since the original was composed.
    pub async fn reprint(
        pool: &PgPool,
        source_id: DbId,
        reason: &str,
    ) -> Result<(JobWithSlots, ReprintPlan), RepoError> {
        let mut tx = pool.begin().await?;
        let source = Self::lock(&mut tx, source_id, None).await?;

        let template_updated_at: Option<Timestamp> =
            sqlx::query_scalar("SELECT updated_at FROM templates WHERE id = $1")
                .bind(source.template_id)
                .fetch_optional(&mut *tx)
                .await?;

        let plan = plan_reprint(
            &ReprintSource {
                id: source.id,
                status: source.status,
                priority: source.priority,
                job_name: source.job_name.as_deref(),
                composed_artifact_path: source.composed_artifact_path.as_deref(),
                submitted_at: source.submitted_at,
            },
            template_updated_at,
        )?;

        let position = Self::next_authority_position(&mut tx, source.printer_id).await?;
        let query = format!(
            "INSERT INTO jobs \
                (printer_id, template_id, status_id, authority_queue_position, priority, \
                 job_name, event_name, event_date, copies, composed_artifact_path, \
                 reprint_of, reprint_reason, designer_notes, submitted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW()) \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(source.printer_id)
            .bind(source.template_id)
            .bind(plan.status.id())
            .bind(position)
            .bind(plan.priority)
            .bind(&plan.job_name)
            .bind(&source.event_name)
            .bind(source.event_date)
            .bind(source.copies)
            .bind(&plan.composed_artifact_path)
            .bind(plan.reprint_of)
            .bind(reason)
            .bind(&source.designer_notes)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO job_slots \
                (job_id, template_slot_key, slot_position, slot_label, label_asset_path, \
                 guest_name, recipient, product_sku, product_name, product_type) \
             SELECT $1, template_slot_key, slot_position, slot_label, label_asset_path, \
                    guest_name, recipient, product_sku, product_name, product_type \
             FROM job_slots WHERE job_id = $2 ORDER BY id",
        )
        .bind(job.id)
        .bind(source.id)
        .execute(&mut *tx)
        .await?;

        let slot_query =
            format!("SELECT {SLOT_COLUMNS} FROM job_slots WHERE job_id = $1 ORDER BY id");
        let slots = sqlx::query_as::<_, JobSlot>(&slot_query)
            .bind(job.id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((JobWithSlots { job, slots }, plan))
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job only if it belongs to `printer_id`.
    pub async fn find_for_printer(
        pool: &PgPool,
        id: DbId,
        printer_id: DbId,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1 AND printer_id = $2");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(printer_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_with_slots(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<JobWithSlots>, sqlx::Error> {
        let Some(job) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let slots = Self::list_slots(pool, id).await?;
        Ok(Some(JobWithSlots { job, slots }))
    }

    pub async fn list_slots(pool: &PgPool, job_id: DbId) -> Result<Vec<JobSlot>, sqlx::Error> {
        let query = format!("SELECT {SLOT_COLUMNS} FROM job_slots WHERE job_id = $1 ORDER BY id");
        sqlx::query_as::<_, JobSlot>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }

    /// Filtered, paginated list in authority display order.
    pub async fn list(pool: &PgPool, params: &JobListQuery) -> Result<Vec<Job>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE ($1::BIGINT IS NULL OR printer_id = $1) \
               AND ($2::SMALLINT IS NULL OR status_id = $2) \
             {AUTHORITY_ORDER} \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(params.printer_id)
            .bind(params.status.map(JobStatus::id))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Jobs waiting for the agent: `ready_for_print`, priority desc then
    /// authority position asc.
    pub async fn list_ready_for_printer(
        pool: &PgPool,
        printer_id: DbId,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs WHERE printer_id = $1 AND status_id = $2 {AUTHORITY_ORDER}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(printer_id)
            .bind(JobStatus::ReadyForPrint.id())
            .fetch_all(pool)
            .await
    }

    /// The printer's local queue, sorted for the operator.
    pub async fn local_queue(pool: &PgPool, printer_id: DbId) -> Result<Vec<Job>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM jobs WHERE printer_id = $1 AND status_id = ANY($2)");
        let mut jobs = sqlx::query_as::<_, Job>(&query)
            .bind(printer_id)
            .bind(status_ids(&LOCAL_QUEUE_STATUSES))
            .fetch_all(pool)
            .await?;
        sort_for_display(&mut jobs, QueueDimension::Local);
        Ok(jobs)
    }

    /// Finished jobs (printed or failed), most recent first.
    pub async fn history(
        pool: &PgPool,
        printer_id: DbId,
        limit: Option<i64>,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_LIMIT);
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE printer_id = $1 AND status_id = ANY($2) \
             ORDER BY COALESCE(printed_at, updated_at) DESC, id DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(printer_id)
            .bind(status_ids(&HISTORY_STATUSES))
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// `(status, count)` for every status present on the printer.
    pub async fn count_by_status(
        pool: &PgPool,
        printer_id: DbId,
    ) -> Result<Vec<(JobStatus, i64)>, sqlx::Error> {
        let rows: Vec<(StatusId, i64)> = sqlx::query_as(
            "SELECT status_id, COUNT(*) FROM jobs WHERE printer_id = $1 GROUP BY status_id",
        )
        .bind(printer_id)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, count)| JobStatus::from_id(id).map(|s| (s, count)))
            .collect())
    }

    // -----------------------------------------------------------------------
    // Editing phase
    // -----------------------------------------------------------------------

    /// Update descriptive fields. Only allowed while editable.
    pub async fn update(pool: &PgPool, id: DbId, input: &UpdateJob) -> Result<Job, RepoError> {
        let mut tx = pool.begin().await?;
        let job = Self::lock(&mut tx, id, None).await?;
        ensure_editable(job.status)?;

        let query = format!(
            "UPDATE jobs SET \
                 job_name = COALESCE($2, job_name), \
                 event_name = COALESCE($3, event_name), \
                 event_date = COALESCE($4, event_date), \
                 copies = COALESCE($5, copies), \
                 priority = COALESCE($6, priority), \
                 designer_notes = COALESCE($7, designer_notes), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(&input.job_name)
            .bind(&input.event_name)
            .bind(input.event_date)
            .bind(input.copies)
            .bind(input.priority)
            .bind(&input.designer_notes)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(job)
    }

    /// Delete a draft job and its slots.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<(), RepoError> {
        let mut tx = pool.begin().await?;
        let job = Self::lock(&mut tx, id, None).await?;
        ensure_deletable(job.status)?;

        sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Attach label artwork to one slot. Only allowed while editable.
    pub async fn set_slot_asset(
        pool: &PgPool,
        job_id: DbId,
        slot_id: DbId,
        path: &str,
    ) -> Result<JobSlot, RepoError> {
        let mut tx = pool.begin().await?;
        let job = Self::lock(&mut tx, job_id, None).await?;
        ensure_editable(job.status)?;

        let query = format!(
            "UPDATE job_slots SET label_asset_path = $3, updated_at = NOW() \
             WHERE id = $1 AND job_id = $2 \
             RETURNING {SLOT_COLUMNS}"
        );
        let slot = sqlx::query_as::<_, JobSlot>(&query)
            .bind(slot_id)
            .bind(job_id)
            .bind(path)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "JobSlot",
                id: slot_id,
            })?;

        sqlx::query("UPDATE jobs SET updated_at = NOW() WHERE id = $1")
            .bind(job_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(slot)
    }

    /// Record the composed artifact and move the job to `ready_for_print`.
    ///
    /// Composition has already succeeded by the time this is called; the
    /// slot rule is re-checked under the row lock.
    pub async fn submit(pool: &PgPool, id: DbId, artifact_path: &str) -> Result<Job, RepoError> {
        let mut tx = pool.begin().await?;
        let mut job = Self::lock(&mut tx, id, None).await?;
        ensure_editable(job.status)?;

        let missing: Vec<String> = sqlx::query_scalar(
            "SELECT COALESCE(slot_position, template_slot_key) FROM job_slots \
             WHERE job_id = $1 AND label_asset_path IS NULL ORDER BY id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        let slot_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_slots WHERE job_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        validate_submission(slot_count as usize, &missing)?;

        Self::transition_locked(&mut job, JobStatus::ReadyForPrint)?;
        job.composed_artifact_path = Some(artifact_path.to_string());

        let job = Self::persist(&mut tx, &job).await?;
        tx.commit().await?;
        Ok(job)
    }

    // -----------------------------------------------------------------------
    // Status transitions
    // -----------------------------------------------------------------------

    /// Plain transition with no field changes beyond the lifecycle stamps.
    ///
    /// `printer_scope` restricts the lookup to one printer's jobs; a job
    /// owned by another printer is reported as not found.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        printer_scope: Option<DbId>,
        target: JobStatus,
    ) -> Result<Job, RepoError> {
        Self::transition_with(pool, id, printer_scope, target, |_| Ok(())).await
    }

    /// Agent download acknowledgement: `ready_for_print → queued_local`
    /// and the next local position among the printer's unsent local jobs.
    pub async fn mark_downloaded(
        pool: &PgPool,
        id: DbId,
        printer_id: DbId,
    ) -> Result<Job, RepoError> {
        let mut tx = pool.begin().await?;
        let mut job = Self::lock(&mut tx, id, Some(printer_id)).await?;
        Self::transition_locked(&mut job, JobStatus::QueuedLocal)?;

        let max: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(local_queue_position) FROM jobs \
             WHERE printer_id = $1 AND status_id = ANY($2) AND id <> $3",
        )
        .bind(printer_id)
        .bind(status_ids(&REORDERABLE_STATUSES))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        job.local_queue_position = Some(next_position(max));

        let job = Self::persist(&mut tx, &job).await?;
        tx.commit().await?;
        Ok(job)
    }

    /// Agent rollback: `queued_local → ready_for_print`, local position cleared.
    pub async fn release(pool: &PgPool, id: DbId, printer_id: DbId) -> Result<Job, RepoError> {
        Self::transition_with(
            pool,
            id,
            Some(printer_id),
            JobStatus::ReadyForPrint,
            |job| {
                if job.status != JobStatus::QueuedLocal {
                    return Err(CoreError::InvalidTransition {
                        from: job.status.as_str(),
                        to: JobStatus::ReadyForPrint.as_str(),
                    });
                }
                job.local_queue_position = None;
                Ok(())
            },
        )
        .await
    }

    /// Operator re-queue of a failed job: `failed → ready_for_print`.
    pub async fn requeue(pool: &PgPool, id: DbId) -> Result<Job, RepoError> {
        Self::transition_with(pool, id, None, JobStatus::ReadyForPrint, |job| {
            if job.status != JobStatus::Failed {
                return Err(CoreError::InvalidTransition {
                    from: job.status.as_str(),
                    to: JobStatus::ReadyForPrint.as_str(),
                });
            }
            job.local_queue_position = None;
            Ok(())
        })
        .await
    }

    /// Transition and append a note in the same unit of work.
    pub async fn transition_with_note(
        pool: &PgPool,
        id: DbId,
        target: JobStatus,
        note: Option<&str>,
    ) -> Result<Job, RepoError> {
        let note = note.map(str::to_string);
        Self::transition_with(pool, id, None, target, move |job| {
            if let Some(note) = &note {
                job.operator_notes = append_note(job.operator_notes.as_deref(), note);
            }
            Ok(())
        })
        .await
    }

    /// Append an audit note to a job that must currently be in `expected`.
    /// A job in any other state is reported as [`CoreError::NotReady`].
    pub async fn append_note_if_status(
        pool: &PgPool,
        id: DbId,
        printer_id: DbId,
        expected: JobStatus,
        note: &str,
    ) -> Result<Job, RepoError> {
        let mut tx = pool.begin().await?;
        let mut job = Self::lock(&mut tx, id, Some(printer_id)).await?;
        if job.status != expected {
            return Err(CoreError::NotReady(format!(
                "Job {id} is {}, expected {expected}",
                job.status
            ))
            .into());
        }
        job.operator_notes = append_note(job.operator_notes.as_deref(), note);
        job.updated_at = Utc::now();

        let job = Self::persist(&mut tx, &job).await?;
        tx.commit().await?;
        Ok(job)
    }

    /// Apply an operator-requested order to the printer's reorderable
    /// local jobs. Ids that are unknown, on another printer or no longer
    /// reorderable are skipped. Returns the resulting local queue.
    pub async fn reorder(
        pool: &PgPool,
        printer_id: DbId,
        ordered_ids: &[DbId],
    ) -> Result<Vec<Job>, RepoError> {
        let mut tx = pool.begin().await?;

        let eligible: Vec<DbId> = sqlx::query_scalar(
            "SELECT id FROM jobs \
             WHERE printer_id = $1 AND status_id = ANY($2) AND id = ANY($3) \
             FOR UPDATE",
        )
        .bind(printer_id)
        .bind(status_ids(&REORDERABLE_STATUSES))
        .bind(ordered_ids)
        .fetch_all(&mut *tx)
        .await?;
        let eligible: HashSet<DbId> = eligible.into_iter().collect();

        for (id, position) in plan_reorder(ordered_ids, &eligible) {
            sqlx::query(
                "UPDATE jobs SET local_queue_position = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(id)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(Self::local_queue(pool, printer_id).await?)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn transition_with<F>(
        pool: &PgPool,
        id: DbId,
        printer_scope: Option<DbId>,
        target: JobStatus,
        modify: F,
    ) -> Result<Job, RepoError>
    where
        F: FnOnce(&mut Job) -> Result<(), CoreError>,
    {
        let mut tx = pool.begin().await?;
        let mut job = Self::lock(&mut tx, id, printer_scope).await?;
        modify(&mut job)?;
        Self::transition_locked(&mut job, target)?;

        let job = Self::persist(&mut tx, &job).await?;
        tx.commit().await?;
        Ok(job)
    }

    fn transition_locked(job: &mut Job, target: JobStatus) -> Result<(), CoreError> {
        let mut lifecycle = job.lifecycle();
        lifecycle.transition(target, Utc::now())?;
        job.apply_lifecycle(lifecycle);
        Ok(())
    }

    async fn lock(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        printer_scope: Option<DbId>,
    ) -> Result<Job, RepoError> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE id = $1 AND ($2::BIGINT IS NULL OR printer_id = $2) \
             FOR UPDATE"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(printer_scope)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| not_found(id).into())
    }

    /// Write back every column a transition or note may change.
    async fn persist(tx: &mut Transaction<'_, Postgres>, job: &Job) -> Result<Job, sqlx::Error> {
        let query = format!(
            "UPDATE jobs SET \
                 status_id = $2, updated_at = $3, submitted_at = $4, downloaded_at = $5, \
                 printed_at = $6, local_queue_position = $7, composed_artifact_path = $8, \
                 operator_notes = $9 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(job.id)
            .bind(job.status.id())
            .bind(job.updated_at)
            .bind(job.submitted_at)
            .bind(job.downloaded_at)
            .bind(job.printed_at)
            .bind(job.local_queue_position)
            .bind(&job.composed_artifact_path)
            .bind(&job.operator_notes)
            .fetch_one(&mut **tx)
            .await
    }

    async fn next_authority_position(
        tx: &mut Transaction<'_, Postgres>,
        printer_id: DbId,
    ) -> Result<i32, sqlx::Error> {
        let max: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(authority_queue_position) FROM jobs WHERE printer_id = $1",
        )
        .bind(printer_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(next_position(max))
    }
}
