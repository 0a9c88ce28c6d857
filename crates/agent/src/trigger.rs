//! Print trigger: copy artifacts into the hot folder once the operator
//! has pressed print.
//!
//! The cheap `queue-status` call gates the per-job scan. The delivery
//! marker in each job directory is what prevents a second copy; the
//! `confirm-sent` call afterwards is advisory only.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use jigprint_core::agent_protocol::{DeliveryConfirmation, PrintInfo};
use jigprint_core::hot_folder::DeliveryMarker;
use jigprint_core::types::DbId;
use tokio_util::sync::CancellationToken;

use crate::client::{AuthorityClient, ClientError};
use crate::spool::{Spool, SpoolError};

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Spool(#[from] SpoolError),

    #[error("Copy to {path} failed: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Run the trigger every `interval` until `cancel` is triggered.
pub async fn run(
    client: AuthorityClient,
    spool: Spool,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Print trigger started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Print trigger stopping");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = check_once(&client, &spool).await {
                    tracing::warn!(error = %e, "Print trigger: tick failed");
                }
            }
        }
    }
}

/// One trigger pass. Returns the ids delivered to a hot folder.
pub async fn check_once(client: &AuthorityClient, spool: &Spool) -> Result<Vec<DbId>, ClientError> {
    let status = client.queue_status().await?;
    if !status.has_jobs_to_deliver() {
        return Ok(Vec::new());
    }

    let job_ids = match spool.job_ids().await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(error = %e, "Print trigger: cannot read queue directory");
            return Ok(Vec::new());
        }
    };

    let mut delivered = Vec::new();
    for job_id in job_ids {
        if !spool.is_complete(job_id).await || spool.is_delivered(job_id).await {
            continue;
        }

        let info = match client.print_info(job_id).await {
            Ok(info) => info,
            Err(ClientError::NotReady(_)) => {
                tracing::debug!(job_id, "Not sent to printer yet");
                continue;
            }
            Err(ClientError::NotFound(msg)) => {
                tracing::warn!(job_id, reason = %msg, "No delivery instructions for job");
                continue;
            }
            Err(e @ ClientError::Unauthorized) => return Err(e),
            Err(e) => {
                tracing::warn!(job_id, error = %e, "Print info request failed");
                continue;
            }
        };

        match deliver(spool, &info).await {
            Ok(dest) => {
                tracing::info!(
                    job_id,
                    destination = %dest.display(),
                    copies = info.copies,
                    "Artifact delivered to hot folder"
                );
                delivered.push(job_id);
                confirm(client, &info).await;
            }
            Err(DeliveryError::Spool(SpoolError::AlreadyDelivered(_))) => {
                tracing::debug!(job_id, "Delivered by an earlier pass");
            }
            Err(e) => tracing::error!(job_id, error = %e, "Hot folder delivery failed"),
        }
    }

    Ok(delivered)
}

/// Copy the spooled artifact into the hot folder and write the marker.
///
/// The file is written under a temporary name and renamed, so the print
/// software never picks up a partial PDF.
pub async fn deliver(spool: &Spool, info: &PrintInfo) -> Result<PathBuf, DeliveryError> {
    let spooled = spool.load(info.job_id).await?;
    let hot_folder = Path::new(&info.hot_folder_path);
    tokio::fs::create_dir_all(hot_folder)
        .await
        .map_err(|source| DeliveryError::Copy {
            path: hot_folder.to_path_buf(),
            source,
        })?;

    let dest = hot_folder.join(&info.filename);
    let partial = hot_folder.join(format!(".{}.part", info.filename));
    let copy = async {
        tokio::fs::copy(&spooled.artifact, &partial).await?;
        tokio::fs::rename(&partial, &dest).await
    };
    if let Err(source) = copy.await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(DeliveryError::Copy { path: dest, source });
    }

    spool
        .mark_delivered(
            info.job_id,
            &DeliveryMarker {
                sent_at: Utc::now(),
                copies: info.copies,
            },
        )
        .await?;
    Ok(dest)
}

async fn confirm(client: &AuthorityClient, info: &PrintInfo) {
    let confirmation = DeliveryConfirmation {
        filename: info.filename.clone(),
        sent_at: Utc::now(),
    };
    if let Err(e) = client.confirm_sent(info.job_id, &confirmation).await {
        tracing::warn!(job_id = info.job_id, error = %e, "Delivery confirmation not recorded");
    }
}
