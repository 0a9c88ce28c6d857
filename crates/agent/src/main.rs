use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jigprint_agent::agent::Agent;
use jigprint_agent::config::{AgentArgs, AgentConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jigprint_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::from(AgentArgs::parse());
    tracing::info!(
        api_url = %config.api_url,
        queue_dir = %config.queue_dir.display(),
        poll_interval_secs = config.poll_interval.as_secs(),
        "Agent starting"
    );

    let agent = Agent::new(config).expect("Failed to build HTTP client");

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    if let Err(e) = agent.run(cancel).await {
        tracing::error!(error = %e, "Agent failed");
        std::process::exit(1);
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), stopping agent"),
        () = terminate => tracing::info!("Received SIGTERM, stopping agent"),
    }
}
