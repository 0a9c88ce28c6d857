//! Print job and job slot models and DTOs.

use jigprint_core::job_status::{JobStatus, Lifecycle};
use jigprint_core::queue::{QueueDimension, Queued};
use jigprint_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `jobs` table.
///
/// `status_id` is decoded into [`JobStatus`] and serialized by name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub printer_id: DbId,
    pub template_id: DbId,
    #[sqlx(rename = "status_id", try_from = "i16")]
    pub status: JobStatus,
    pub authority_queue_position: Option<i32>,
    pub local_queue_position: Option<i32>,
    pub priority: i32,
    pub job_name: Option<String>,
    pub event_name: Option<String>,
    pub event_date: Option<Timestamp>,
    pub copies: i32,
    pub composed_artifact_path: Option<String>,
    pub reprint_of: Option<DbId>,
    pub reprint_reason: Option<String>,
    pub operator_notes: Option<String>,
    pub designer_notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub submitted_at: Option<Timestamp>,
    pub downloaded_at: Option<Timestamp>,
    pub printed_at: Option<Timestamp>,
}

impl Job {
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle {
            status: self.status,
            updated_at: self.updated_at,
            submitted_at: self.submitted_at,
            downloaded_at: self.downloaded_at,
            printed_at: self.printed_at,
        }
    }

    pub fn apply_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.status = lifecycle.status;
        self.updated_at = lifecycle.updated_at;
        self.submitted_at = lifecycle.submitted_at;
        self.downloaded_at = lifecycle.downloaded_at;
        self.printed_at = lifecycle.printed_at;
    }
}

impl Queued for Job {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn position(&self, dimension: QueueDimension) -> Option<i32> {
        match dimension {
            QueueDimension::Authority => self.authority_queue_position,
            QueueDimension::Local => self.local_queue_position,
        }
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

/// A row from the `job_slots` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobSlot {
    pub id: DbId,
    pub job_id: DbId,
    pub template_slot_key: String,
    pub slot_position: Option<String>,
    pub slot_label: Option<String>,
    pub label_asset_path: Option<String>,
    pub guest_name: Option<String>,
    pub recipient: Option<String>,
    pub product_sku: Option<String>,
    pub product_name: Option<String>,
    pub product_type: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl JobSlot {
    /// Human-readable name for messages: the position letter, else the key.
    pub fn display_name(&self) -> &str {
        self.slot_position
            .as_deref()
            .unwrap_or(&self.template_slot_key)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobWithSlots {
    #[serde(flatten)]
    pub job: Job,
    pub slots: Vec<JobSlot>,
}

/// DTO for `POST /api/v1/jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateJob {
    pub printer_id: DbId,
    pub template_id: DbId,
    pub job_name: Option<String>,
    pub event_name: Option<String>,
    pub event_date: Option<Timestamp>,
    pub copies: Option<i32>,
    pub priority: Option<i32>,
    pub designer_notes: Option<String>,
    #[serde(default)]
    pub slots: Vec<CreateJobSlot>,
}

/// One slot of a new job. Position and product type default from the
/// template slot named by `template_slot_key`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateJobSlot {
    pub template_slot_key: String,
    pub slot_label: Option<String>,
    pub label_asset_path: Option<String>,
    pub guest_name: Option<String>,
    pub recipient: Option<String>,
    pub product_sku: Option<String>,
    pub product_name: Option<String>,
    pub product_type: Option<String>,
}

/// DTO for `PUT /api/v1/jobs/{id}`. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateJob {
    pub job_name: Option<String>,
    pub event_name: Option<String>,
    pub event_date: Option<Timestamp>,
    pub copies: Option<i32>,
    pub priority: Option<i32>,
    pub designer_notes: Option<String>,
}

/// Query parameters for `GET /api/v1/jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    pub printer_id: Option<DbId>,
    pub status: Option<JobStatus>,
    /// Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// DTO for `POST /api/v1/jobs/{id}/reprint`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReprintRequest {
    pub reason: String,
}

/// DTO for `POST /api/v1/operator/printers/{id}/reorder`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReorderRequest {
    pub job_ids: Vec<DbId>,
}

/// Body for operator complete / fail actions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperatorNote {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FailRequest {
    pub reason: String,
}
