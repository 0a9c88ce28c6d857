//! Wire types exchanged between the authority and the printer agent.
//!
//! The authority wraps every JSON body in a `{ "data": … }` envelope; the
//! types here describe the inner payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::job_status::{JobStatus, ALL_STATUSES, LOCAL_QUEUE_STATUSES};
use crate::types::{DbId, Timestamp};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    /// Printer id the agent believes it is, if known from an earlier ack.
    #[serde(default)]
    pub printer_id: Option<DbId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatAck {
    pub status: String,
    pub printer_id: DbId,
    pub printer_name: String,
    pub server_time: Timestamp,
}

/// The part of a job the agent needs. The authority sends the full job
/// record; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentJob {
    pub id: DbId,
    pub status: JobStatus,
    #[serde(default)]
    pub job_name: Option<String>,
    #[serde(default)]
    pub event_name: Option<String>,
    pub priority: i32,
    pub copies: i32,
    #[serde(default)]
    pub authority_queue_position: Option<i32>,
    #[serde(default)]
    pub local_queue_position: Option<i32>,
}

impl AgentJob {
    pub fn display_name(&self) -> String {
        self.job_name
            .clone()
            .unwrap_or_else(|| format!("Job {}", self.id))
    }
}

/// Delivery instructions for a job in `sent_to_printer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintInfo {
    pub job_id: DbId,
    pub hot_folder_path: String,
    pub filename: String,
    pub local_artifact_path: Option<String>,
    pub copies: i32,
}

/// Advisory acknowledgement that the artifact reached the hot folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryConfirmation {
    pub filename: String,
    pub sent_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryConfirmed {
    pub status: String,
    pub job_id: DbId,
}

/// Per-status job counts for one printer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub printer_id: DbId,
    pub printer_name: String,
    pub is_online: bool,
    pub status_counts: BTreeMap<JobStatus, i64>,
    pub total_pending: i64,
    pub total_local_queue: i64,
}

impl QueueStatus {
    /// Build from sparse `(status, count)` rows; missing statuses count 0.
    pub fn from_counts(
        printer_id: DbId,
        printer_name: String,
        is_online: bool,
        rows: impl IntoIterator<Item = (JobStatus, i64)>,
    ) -> Self {
        let mut status_counts: BTreeMap<JobStatus, i64> =
            ALL_STATUSES.into_iter().map(|s| (s, 0)).collect();
        for (status, count) in rows {
            *status_counts.entry(status).or_default() += count;
        }

        let total_pending = status_counts[&JobStatus::ReadyForPrint];
        let total_local_queue = LOCAL_QUEUE_STATUSES
            .iter()
            .map(|s| status_counts[s])
            .sum();

        Self {
            printer_id,
            printer_name,
            is_online,
            status_counts,
            total_pending,
            total_local_queue,
        }
    }

    pub fn count(&self, status: JobStatus) -> i64 {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    /// The per-job print-info scan is only worth running when something
    /// is waiting to be sent.
    pub fn has_jobs_to_deliver(&self) -> bool {
        self.count(JobStatus::SentToPrinter) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_status_fills_missing_and_totals() {
        let status = QueueStatus::from_counts(
            3,
            "Mimaki UJF".into(),
            true,
            [
                (JobStatus::ReadyForPrint, 2),
                (JobStatus::QueuedLocal, 1),
                (JobStatus::SentToPrinter, 4),
                (JobStatus::Printed, 10),
            ],
        );
        assert_eq!(status.status_counts.len(), ALL_STATUSES.len());
        assert_eq!(status.count(JobStatus::Draft), 0);
        assert_eq!(status.total_pending, 2);
        assert_eq!(status.total_local_queue, 5);
        assert!(status.has_jobs_to_deliver());
    }

    #[test]
    fn nothing_to_deliver_without_sent_jobs() {
        let status =
            QueueStatus::from_counts(1, "p".into(), false, [(JobStatus::QueuedLocal, 3)]);
        assert!(!status.has_jobs_to_deliver());
    }

    #[test]
    fn status_counts_serialize_with_status_names() {
        let status = QueueStatus::from_counts(1, "p".into(), true, [(JobStatus::SentToPrinter, 1)]);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status_counts"]["sent_to_printer"], 1);

        let back: QueueStatus = serde_json::from_value(json).unwrap();
        assert_eq!(back, status);
    }

    #[test]
    fn agent_job_ignores_extra_fields() {
        let job: AgentJob = serde_json::from_value(serde_json::json!({
            "id": 42,
            "status": "ready_for_print",
            "priority": 1,
            "copies": 2,
            "printer_id": 9,
            "designer_notes": "matte"
        }))
        .unwrap();
        assert_eq!(job.id, 42);
        assert_eq!(job.display_name(), "Job 42");
        assert_eq!(job.event_name, None);
    }
}
