//! Liveness reports to the authority.

use std::time::Duration;

use jigprint_core::agent_protocol::HeartbeatAck;
use jigprint_core::types::DbId;
use tokio_util::sync::CancellationToken;

use crate::client::{AuthorityClient, ClientError};

/// Send one heartbeat, logging the outcome.
pub async fn beat(
    client: &AuthorityClient,
    printer_id: Option<DbId>,
) -> Result<HeartbeatAck, ClientError> {
    let result = client.heartbeat(printer_id).await;
    match &result {
        Ok(ack) => tracing::debug!(
            printer_id = ack.printer_id,
            server_time = %ack.server_time,
            "Heartbeat acknowledged"
        ),
        Err(ClientError::Unauthorized) => {
            tracing::error!("Heartbeat rejected: agent key is not recognised")
        }
        Err(e) => tracing::warn!(error = %e, "Heartbeat failed"),
    }
    result
}

/// Send heartbeats every `interval` until `cancel` is triggered.
///
/// `printer_id` is the id from the startup acknowledgement, if any; it is
/// updated from each later one.
pub async fn run(
    client: AuthorityClient,
    mut printer_id: Option<DbId>,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Heartbeat started");
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Heartbeat stopping");
                break;
            }
            _ = ticker.tick() => {
                if let Ok(ack) = beat(&client, printer_id).await {
                    printer_id = Some(ack.printer_id);
                }
            }
        }
    }
}
