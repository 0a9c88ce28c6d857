//! The agent process: startup checks, then three independent loops.

use tokio_util::sync::CancellationToken;

use crate::client::{AuthorityClient, ClientError};
use crate::config::AgentConfig;
use crate::spool::{Spool, SpoolError};
use crate::{discovery, heartbeat, reconcile, trigger};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Spool(#[from] SpoolError),
}

pub struct Agent {
    config: AgentConfig,
    client: AuthorityClient,
    spool: Spool,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        let client = AuthorityClient::new(&config.api_url, &config.api_key, config.http_timeout)?;
        let spool = Spool::new(&config.queue_dir);
        Ok(Self {
            config,
            client,
            spool,
        })
    }

    /// Run until `cancel` is triggered.
    ///
    /// Only a queue directory that cannot be created stops the agent; every
    /// network failure is logged and retried on the next tick.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), AgentError> {
        let discarded = self.spool.prepare().await?;
        tracing::info!(
            queue_dir = %self.spool.root().display(),
            discarded = discarded.len(),
            "Local queue ready"
        );

        let printer_id = match heartbeat::beat(&self.client, None).await {
            Ok(ack) => {
                tracing::info!(
                    printer_id = ack.printer_id,
                    printer_name = %ack.printer_name,
                    "Connected to authority"
                );
                Some(ack.printer_id)
            }
            Err(_) => None,
        };

        match reconcile::reconcile(&self.client, &self.spool).await {
            Ok(released) if !released.is_empty() => {
                tracing::info!(released = released.len(), "Reconciled local queue");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Startup reconciliation skipped"),
        }

        let heartbeat_handle = tokio::spawn(heartbeat::run(
            self.client.clone(),
            printer_id,
            self.config.heartbeat_interval,
            cancel.clone(),
        ));
        let discovery_handle = tokio::spawn(discovery::run(
            self.client.clone(),
            self.spool.clone(),
            self.config.poll_interval,
            cancel.clone(),
        ));
        let trigger_handle = tokio::spawn(trigger::run(
            self.client.clone(),
            self.spool.clone(),
            self.config.trigger_interval,
            cancel,
        ));

        for (name, handle) in [
            ("heartbeat", heartbeat_handle),
            ("discovery", discovery_handle),
            ("print trigger", trigger_handle),
        ] {
            if let Err(e) = handle.await {
                tracing::error!(task = name, error = %e, "Agent task panicked or was aborted");
            }
        }

        tracing::info!("Agent stopped");
        Ok(())
    }
}
