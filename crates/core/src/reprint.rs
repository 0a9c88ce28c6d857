//! Reprint planning.
//!
//! A reprint is a brand-new job that points back at a finished one. It
//! skips the editing phase, reuses the original's composed artifact and
//! slot data, and jumps the queue by one priority step.

use crate::error::CoreError;
use crate::job_status::JobStatus;
use crate::types::{DbId, Timestamp};

/// Suffix appended to the original job's name.
pub const REPRINT_SUFFIX: &str = " (Reprint)";

/// The fields of the original job a reprint is derived from.
#[derive(Debug, Clone)]
pub struct ReprintSource<'a> {
    pub id: DbId,
    pub status: JobStatus,
    pub priority: i32,
    pub job_name: Option<&'a str>,
    pub composed_artifact_path: Option<&'a str>,
    pub submitted_at: Option<Timestamp>,
}

/// What the new job should look like.
#[derive(Debug, Clone, PartialEq)]
pub struct ReprintPlan {
    pub reprint_of: DbId,
    pub status: JobStatus,
    pub priority: i32,
    pub job_name: String,
    pub composed_artifact_path: String,
    /// The template changed after the original was composed, so the
    /// reused artifact may no longer match its slots.
    pub artifact_may_be_stale: bool,
}

/// Plan a reprint of `source`.
///
/// The source must be finished (`printed` or `failed`) and must have a
/// composed artifact. Because the referenced job is already terminal and
/// the new job does not exist yet, the `reprint_of` link can never form a
/// cycle.
pub fn plan_reprint(
    source: &ReprintSource<'_>,
    template_updated_at: Option<Timestamp>,
) -> Result<ReprintPlan, CoreError> {
    if !source.status.is_reprintable() {
        return Err(CoreError::Validation(format!(
            "Can only reprint printed or failed jobs (job {} is {})",
            source.id, source.status
        )));
    }

    let artifact = source.composed_artifact_path.ok_or_else(|| {
        CoreError::Validation(format!("Job {} has no composed artifact to reuse", source.id))
    })?;

    let artifact_may_be_stale = match (template_updated_at, source.submitted_at) {
        (Some(changed), Some(composed)) => changed > composed,
        _ => false,
    };

    Ok(ReprintPlan {
        reprint_of: source.id,
        status: JobStatus::ReadyForPrint,
        priority: source.priority + 1,
        job_name: reprint_job_name(source.job_name, source.id),
        composed_artifact_path: artifact.to_string(),
        artifact_may_be_stale,
    })
}

pub fn reprint_job_name(original: Option<&str>, original_id: DbId) -> String {
    match original {
        Some(name) if !name.trim().is_empty() => format!("{name}{REPRINT_SUFFIX}"),
        _ => format!("Job {original_id}{REPRINT_SUFFIX}"),
    }
}
