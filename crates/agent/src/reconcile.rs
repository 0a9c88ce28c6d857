//! Reconciliation between the authority's view of this printer's local
//! queue and what is actually on disk. Runs at startup and periodically
//! from the discovery loop.
//!
//! A job the authority has as `queued_local` but whose directory is
//! missing (spool wiped, download interrupted after `mark-downloaded`) is
//! released back to `ready_for_print` so discovery fetches it again.

use jigprint_core::job_status::JobStatus;
use jigprint_core::types::DbId;

use crate::client::{AuthorityClient, ClientError};
use crate::spool::Spool;

/// Release every orphaned `queued_local` job. Returns the released ids.
pub async fn reconcile(client: &AuthorityClient, spool: &Spool) -> Result<Vec<DbId>, ClientError> {
    let jobs = client.local_jobs().await?;
    let mut released = Vec::new();

    for job in jobs.iter().filter(|j| j.status == JobStatus::QueuedLocal) {
        if spool.is_complete(job.id).await {
            continue;
        }
        match client.release(job.id).await {
            Ok(_) => {
                tracing::info!(job_id = job.id, "Released job missing from local queue");
                released.push(job.id);
            }
            Err(e) => tracing::warn!(job_id = job.id, error = %e, "Could not release job"),
        }
    }

    for job in jobs.iter().filter(|j| j.status != JobStatus::QueuedLocal) {
        if !spool.is_complete(job.id).await {
            tracing::warn!(
                job_id = job.id,
                status = %job.status,
                "Job is past the local queue but its files are missing"
            );
        }
    }

    Ok(released)
}
