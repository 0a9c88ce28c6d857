//! Job discovery: pull `ready_for_print` jobs into the local spool.
//!
//! A job's directory is claimed before anything is downloaded, so a job
//! that is already present locally is never fetched twice. Any failure
//! between the claim and `mark-downloaded` discards the directory and the
//! next tick starts over.
//!
//! The authority listing a job that is already held locally means the
//! local copy belongs to an earlier pass through the queue: a complete,
//! undelivered copy is queued again as is, anything else is discarded and
//! fetched fresh.

use std::time::Duration;

use jigprint_core::agent_protocol::AgentJob;
use tokio_util::sync::CancellationToken;

use crate::client::{AuthorityClient, ClientError};
use crate::reconcile;
use crate::spool::{Spool, SpoolError};

/// Every this many ticks the loop also reconciles the local queue.
pub const RECONCILE_EVERY_TICKS: u32 = 30;

/// What one discovery pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub downloaded: usize,
    pub already_local: usize,
    pub failed: usize,
    /// Jobs released back to `ready_for_print` by the reconciliation that
    /// follows a failed pass.
    pub released: usize,
}

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Spool(#[from] SpoolError),
}

/// Run discovery every `interval` until `cancel` is triggered.
pub async fn run(
    client: AuthorityClient,
    spool: Spool,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Job discovery started");
    let mut ticker = tokio::time::interval(interval);
    let mut ticks: u32 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job discovery stopping");
                break;
            }
            _ = ticker.tick() => {
                ticks = ticks.wrapping_add(1);
                match poll_once(&client, &spool).await {
                    Ok(report) if report.downloaded > 0 || report.failed > 0 => {
                        tracing::info!(
                            downloaded = report.downloaded,
                            failed = report.failed,
                            released = report.released,
                            "Job discovery pass finished"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "Job discovery: listing ready jobs failed"),
                }
                if ticks % RECONCILE_EVERY_TICKS == 0 {
                    release_orphans(&client, &spool).await;
                }
            }
        }
    }
}

/// One discovery pass. Only the listing call can fail the pass; each
/// job's failure is logged and counted.
///
/// A failed job may still have reached `queued_local` on the authority
/// (the `mark-downloaded` response can be lost after it commits), so any
/// failure is followed by a reconciliation that releases such jobs.
pub async fn poll_once(
    client: &AuthorityClient,
    spool: &Spool,
) -> Result<DiscoveryReport, ClientError> {
    let jobs = client.ready_jobs().await?;
    let mut report = DiscoveryReport::default();

    for job in jobs {
        if spool.contains(job.id).await {
            match requeue_local(client, spool, &job).await {
                Ok(true) => {
                    report.already_local += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(job_id = job.id, error = %e, "Could not queue local copy again");
                    report.failed += 1;
                    continue;
                }
            }
        }

        match fetch(client, spool, &job).await {
            Ok(local_queue_position) => {
                tracing::info!(
                    job_id = job.id,
                    job_name = %job.display_name(),
                    local_queue_position = ?local_queue_position,
                    "Job downloaded"
                );
                report.downloaded += 1;
            }
            Err(FetchError::Spool(SpoolError::AlreadySpooled(_))) => {
                report.already_local += 1;
            }
            Err(e) => {
                tracing::warn!(job_id = job.id, error = %e, "Job download failed");
                if let Err(cleanup) = spool.discard(job.id).await {
                    tracing::error!(
                        job_id = job.id,
                        error = %cleanup,
                        "Could not remove partial job directory"
                    );
                }
                report.failed += 1;
            }
        }
    }

    if report.failed > 0 {
        report.released = release_orphans(client, spool).await;
    }

    Ok(report)
}

/// Handle a `ready_for_print` job whose directory already exists.
///
/// Returns `true` when the complete, undelivered local copy was queued
/// again without a download, `false` when the stale directory was removed
/// and the job should be fetched.
async fn requeue_local(
    client: &AuthorityClient,
    spool: &Spool,
    job: &AgentJob,
) -> Result<bool, FetchError> {
    if spool.is_complete(job.id).await && !spool.is_delivered(job.id).await {
        let queued = client.mark_downloaded(job.id).await?;
        tracing::info!(
            job_id = job.id,
            local_queue_position = ?queued.local_queue_position,
            "Local copy queued again"
        );
        return Ok(true);
    }

    let delivered = spool.is_delivered(job.id).await;
    tracing::info!(
        job_id = job.id,
        delivered = delivered,
        "Discarding stale local copy"
    );
    spool.discard(job.id).await?;
    Ok(false)
}

/// Claim, download, persist, then tell the authority. Returns the local
/// queue position the authority assigned.
async fn fetch(
    client: &AuthorityClient,
    spool: &Spool,
    job: &AgentJob,
) -> Result<Option<i32>, FetchError> {
    spool.claim(job.id).await?;
    let artifact = client.download(job.id).await?;
    spool.store(job, &artifact).await?;
    let queued = client.mark_downloaded(job.id).await?;
    Ok(queued.local_queue_position)
}

async fn release_orphans(client: &AuthorityClient, spool: &Spool) -> usize {
    match reconcile::reconcile(client, spool).await {
        Ok(released) => released.len(),
        Err(e) => {
            tracing::warn!(error = %e, "Job discovery: reconciliation failed");
            0
        }
    }
}
