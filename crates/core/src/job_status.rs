//! Job status state machine.
//!
//! A job moves through a mostly linear pipeline:
//!
//! ```text
//! draft ⇄ pending_review → ready_for_print → queued_local → awaiting_operator → sent_to_printer → printed
//!   └──────────────────────────↗      ↑            │                │    ↑                │
//!                                     │            └── rollback ────┘    └─ return ───────┤
//!                                     └──────────────── failed ◄──────────────────────────┘
//! ```
//!
//! The allowed edges live in one constant table ([`TRANSITIONS`]). The
//! machine only validates and stamps timestamps; composition, file
//! delivery and notes are handled by callers before they request the
//! transition that depends on them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{StatusId, Timestamp};

/// Lifecycle state of a print job.
///
/// Discriminants match the seed rows of the `job_statuses` lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum JobStatus {
    Draft = 1,
    PendingReview = 2,
    ReadyForPrint = 3,
    QueuedLocal = 4,
    AwaitingOperator = 5,
    SentToPrinter = 6,
    Printed = 7,
    Failed = 8,
}

/// Every status, in pipeline order.
pub const ALL_STATUSES: [JobStatus; 8] = [
    JobStatus::Draft,
    JobStatus::PendingReview,
    JobStatus::ReadyForPrint,
    JobStatus::QueuedLocal,
    JobStatus::AwaitingOperator,
    JobStatus::SentToPrinter,
    JobStatus::Printed,
    JobStatus::Failed,
];

/// Adjacency table: current status -> statuses it may move to.
pub const TRANSITIONS: [(JobStatus, &[JobStatus]); 8] = [
    (
        JobStatus::Draft,
        &[JobStatus::PendingReview, JobStatus::ReadyForPrint],
    ),
    (
        JobStatus::PendingReview,
        &[JobStatus::ReadyForPrint, JobStatus::Draft],
    ),
    (JobStatus::ReadyForPrint, &[JobStatus::QueuedLocal]),
    (
        JobStatus::QueuedLocal,
        &[JobStatus::AwaitingOperator, JobStatus::ReadyForPrint],
    ),
    (
        JobStatus::AwaitingOperator,
        &[
            JobStatus::SentToPrinter,
            JobStatus::QueuedLocal,
            JobStatus::Failed,
        ],
    ),
    (
        JobStatus::SentToPrinter,
        &[JobStatus::Printed, JobStatus::Failed],
    ),
    (JobStatus::Printed, &[]),
    (JobStatus::Failed, &[JobStatus::ReadyForPrint]),
];

/// Statuses shown in the operator's local queue view.
pub const LOCAL_QUEUE_STATUSES: [JobStatus; 3] = [
    JobStatus::QueuedLocal,
    JobStatus::AwaitingOperator,
    JobStatus::SentToPrinter,
];

/// Local statuses whose position the operator may still reorder.
pub const REORDERABLE_STATUSES: [JobStatus; 2] =
    [JobStatus::QueuedLocal, JobStatus::AwaitingOperator];

/// Statuses shown in the print history view.
pub const HISTORY_STATUSES: [JobStatus; 2] = [JobStatus::Printed, JobStatus::Failed];

impl JobStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Look up a status by its database ID.
    pub fn from_id(id: StatusId) -> Option<Self> {
        ALL_STATUSES.into_iter().find(|s| s.id() == id)
    }

    /// Wire / display name (`snake_case`).
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Draft => "draft",
            JobStatus::PendingReview => "pending_review",
            JobStatus::ReadyForPrint => "ready_for_print",
            JobStatus::QueuedLocal => "queued_local",
            JobStatus::AwaitingOperator => "awaiting_operator",
            JobStatus::SentToPrinter => "sent_to_printer",
            JobStatus::Printed => "printed",
            JobStatus::Failed => "failed",
        }
    }

    /// Statuses this status may transition to, from [`TRANSITIONS`].
    pub fn allowed_targets(self) -> &'static [JobStatus] {
        TRANSITIONS
            .iter()
            .find(|(from, _)| *from == self)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }

    pub fn can_transition_to(self, target: JobStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// `printed` accepts no further transitions.
    pub fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }

    /// Slots, assets and job metadata may only change in these states.
    pub fn is_editable(self) -> bool {
        matches!(self, JobStatus::Draft | JobStatus::PendingReview)
    }

    pub fn is_deletable(self) -> bool {
        self == JobStatus::Draft
    }

    /// A finished run (successful or not) that may be reprinted.
    pub fn is_reprintable(self) -> bool {
        HISTORY_STATUSES.contains(&self)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_STATUSES
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown job status '{s}'")))
    }
}

impl TryFrom<StatusId> for JobStatus {
    type Error = CoreError;

    fn try_from(id: StatusId) -> Result<Self, Self::Error> {
        Self::from_id(id)
            .ok_or_else(|| CoreError::Internal(format!("Unknown job status id {id}")))
    }
}

impl From<JobStatus> for StatusId {
    fn from(value: JobStatus) -> Self {
        value.id()
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// The status-related fields of a job: current status plus the stamps a
/// transition may write.
#[derive(Debug, Clone, PartialEq)]
pub struct Lifecycle {
    pub status: JobStatus,
    pub updated_at: Timestamp,
    pub submitted_at: Option<Timestamp>,
    pub downloaded_at: Option<Timestamp>,
    pub printed_at: Option<Timestamp>,
}

impl Lifecycle {
    /// A fresh lifecycle in `status` with no stage stamps.
    pub fn new(status: JobStatus, now: Timestamp) -> Self {
        Self {
            status,
            updated_at: now,
            submitted_at: None,
            downloaded_at: None,
            printed_at: None,
        }
    }

    /// Move to `target` if the table allows it.
    ///
    /// On rejection nothing is modified. On acceptance the status and
    /// `updated_at` are set, and entering `ready_for_print`,
    /// `queued_local` or `printed` stamps the matching timestamp.
    pub fn transition(&mut self, target: JobStatus, now: Timestamp) -> Result<(), CoreError> {
        validate_transition(self.status, target)?;

        self.status = target;
        self.updated_at = now;
        match target {
            JobStatus::ReadyForPrint => self.submitted_at = Some(now),
            JobStatus::QueuedLocal => self.downloaded_at = Some(now),
            JobStatus::Printed => self.printed_at = Some(now),
            _ => {}
        }
        Ok(())
    }
}

/// Validate that `current -> target` is listed in [`TRANSITIONS`].
pub fn validate_transition(current: JobStatus, target: JobStatus) -> Result<(), CoreError> {
    if current.can_transition_to(target) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: current.as_str(),
            to: target.as_str(),
        })
    }
}

// ---------------------------------------------------------------------------
// Editing policy
// ---------------------------------------------------------------------------

/// Slot, asset and metadata edits are only allowed in draft / pending review.
pub fn ensure_editable(status: JobStatus) -> Result<(), CoreError> {
    if status.is_editable() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Cannot edit job in {status} status"
        )))
    }
}

/// Jobs may only be deleted while still a draft.
pub fn ensure_deletable(status: JobStatus) -> Result<(), CoreError> {
    if status.is_deletable() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Can only delete jobs in draft status (current: {status})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn table_covers_every_status_once() {
        for status in ALL_STATUSES {
            let rows = TRANSITIONS.iter().filter(|(from, _)| *from == status).count();
            assert_eq!(rows, 1, "{status} must appear exactly once");
        }
    }

    #[test]
    fn transition_succeeds_iff_target_is_in_table() {
        for from in ALL_STATUSES {
            for to in ALL_STATUSES {
                let mut lc = Lifecycle::new(from, t0());
                let before = lc.clone();
                let result = lc.transition(to, t0() + Duration::minutes(5));
                let listed = from.allowed_targets().contains(&to);

                assert_eq!(result.is_ok(), listed, "{from} -> {to}");
                if !listed {
                    assert_eq!(lc, before, "rejected {from} -> {to} must not mutate");
                }
            }
        }
    }

    #[test]
    fn rejection_reports_both_states() {
        let mut lc = Lifecycle::new(JobStatus::Printed, t0());
        assert_matches!(
            lc.transition(JobStatus::ReadyForPrint, t0()),
            Err(CoreError::InvalidTransition { from: "printed", to: "ready_for_print" })
        );
    }

    #[test]
    fn stage_stamps_are_written_on_entry() {
        let mut lc = Lifecycle::new(JobStatus::Draft, t0());
        let submit = t0() + Duration::minutes(1);
        let download = t0() + Duration::minutes(2);
        let printed = t0() + Duration::minutes(9);

        lc.transition(JobStatus::ReadyForPrint, submit).unwrap();
        assert_eq!(lc.submitted_at, Some(submit));
        assert_eq!(lc.downloaded_at, None);

        lc.transition(JobStatus::QueuedLocal, download).unwrap();
        assert_eq!(lc.downloaded_at, Some(download));

        lc.transition(JobStatus::AwaitingOperator, download).unwrap();
        lc.transition(JobStatus::SentToPrinter, download).unwrap();
        assert_eq!(lc.printed_at, None);

        lc.transition(JobStatus::Printed, printed).unwrap();
        assert_eq!(lc.printed_at, Some(printed));
        assert_eq!(lc.updated_at, printed);
        assert_eq!(lc.submitted_at, Some(submit));
    }

    #[test]
    fn jammed_job_fails_then_requeues_once() {
        let mut lc = Lifecycle::new(JobStatus::AwaitingOperator, t0());
        lc.transition(JobStatus::Failed, t0()).unwrap();
        assert_eq!(lc.status, JobStatus::Failed);

        let requeue = t0() + Duration::minutes(3);
        assert!(lc.transition(JobStatus::ReadyForPrint, requeue).is_ok());
        assert_eq!(lc.submitted_at, Some(requeue));
        assert!(lc.transition(JobStatus::ReadyForPrint, requeue).is_err());
    }

    #[test]
    fn printed_is_the_only_terminal_state() {
        let terminal: Vec<_> = ALL_STATUSES.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![JobStatus::Printed]);
    }

    #[test]
    fn editing_is_limited_to_draft_and_review() {
        for status in ALL_STATUSES {
            let expected = matches!(status, JobStatus::Draft | JobStatus::PendingReview);
            assert_eq!(ensure_editable(status).is_ok(), expected, "{status}");
        }
        assert!(ensure_editable(JobStatus::Printed).is_err());
    }

    #[test]
    fn only_drafts_are_deletable() {
        for status in ALL_STATUSES {
            assert_eq!(ensure_deletable(status).is_ok(), status == JobStatus::Draft);
        }
    }

    #[test]
    fn ids_round_trip_through_lookup() {
        for status in ALL_STATUSES {
            assert_eq!(JobStatus::from_id(status.id()), Some(status));
            assert_eq!(JobStatus::try_from(status.id()).unwrap(), status);
        }
        assert!(JobStatus::from_id(0).is_none());
        assert!(JobStatus::try_from(9).is_err());
    }

    #[test]
    fn names_parse_and_serialize_as_snake_case() {
        assert_eq!("sent_to_printer".parse::<JobStatus>().unwrap(), JobStatus::SentToPrinter);
        assert!("SENT".parse::<JobStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&JobStatus::QueuedLocal).unwrap(),
            "\"queued_local\""
        );
    }
}
