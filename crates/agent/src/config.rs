//! Agent configuration: command-line flags with environment fallbacks.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Interval between heartbeats.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Interval between print-trigger checks. Operator action is waiting on
/// this one, so it runs much faster than discovery.
pub const TRIGGER_INTERVAL: Duration = Duration::from_secs(2);

/// Timeout applied to every request to the authority.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interval between job-discovery polls, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Print agent for one jig printer.
///
/// Downloads composed jobs from the authority into a local queue and drops
/// them into the printer's hot folder when the operator presses print.
#[derive(Debug, Clone, Parser)]
#[command(name = "jigprint-agent", version)]
pub struct AgentArgs {
    /// Base URL of the authority, e.g. `http://print-server:8000`.
    #[arg(long, env = "JIGPRINT_API_URL")]
    pub api_url: String,

    /// This printer's agent key.
    #[arg(long, env = "JIGPRINT_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Local directory for downloaded jobs.
    #[arg(long, env = "JIGPRINT_QUEUE_DIR", default_value = "./queue")]
    pub queue_dir: PathBuf,

    /// Seconds between job-discovery polls.
    #[arg(long, env = "JIGPRINT_POLL_INTERVAL", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval: u64,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub api_url: String,
    pub api_key: String,
    pub queue_dir: PathBuf,
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    pub trigger_interval: Duration,
    pub http_timeout: Duration,
}

impl From<AgentArgs> for AgentConfig {
    fn from(args: AgentArgs) -> Self {
        Self {
            api_url: args.api_url.trim_end_matches('/').to_string(),
            api_key: args.api_key,
            queue_dir: args.queue_dir,
            poll_interval: Duration::from_secs(args.poll_interval.max(1)),
            heartbeat_interval: HEARTBEAT_INTERVAL,
            trigger_interval: TRIGGER_INTERVAL,
            http_timeout: HTTP_TIMEOUT,
        }
    }
}
