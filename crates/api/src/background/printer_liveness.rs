//! Marks printers offline when their agent stops sending heartbeats.
//!
//! A heartbeat sets `is_online`; this sweep is the only thing that clears
//! it, so an agent that dies without notice still drops off the console.

use std::time::Duration;

use chrono::Utc;
use jigprint_db::repositories::PrinterRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// Run the liveness sweep until `cancel` is triggered.
///
/// Every `interval`, printers whose `last_seen_at` is older than
/// `offline_after` are marked offline.
pub async fn run(
    pool: PgPool,
    offline_after: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        offline_after_secs = offline_after.as_secs(),
        interval_secs = interval.as_secs(),
        "Printer liveness sweep started"
    );

    let offline_after = match chrono::Duration::from_std(offline_after) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!(error = %e, "Printer liveness: offline threshold out of range");
            return;
        }
    };
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Printer liveness sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                let cutoff = Utc::now() - offline_after;
                match PrinterRepo::mark_stale_offline(&pool, cutoff).await {
                    Ok(0) => tracing::debug!("Printer liveness: all printers current"),
                    Ok(marked) => tracing::info!(marked, "Printer liveness: marked printers offline"),
                    Err(e) => tracing::error!(error = %e, "Printer liveness: sweep failed"),
                }
            }
        }
    }
}
