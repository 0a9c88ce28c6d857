use std::path::PathBuf;
use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the
/// database URL, which `main` reads separately.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Largest accepted request body, for artwork uploads (default: 50 MiB).
    pub max_body_bytes: usize,
    /// Uploaded label artwork.
    pub upload_dir: PathBuf,
    /// Composed job PDFs.
    pub composed_dir: PathBuf,
    /// Template base artwork.
    pub template_dir: PathBuf,
    /// A printer with no heartbeat for this long is marked offline.
    pub printer_offline_after: Duration,
    /// How often the liveness sweep runs.
    pub liveness_sweep_interval: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                                        |
    /// |------------------------------|------------------------------------------------|
    /// | `HOST`                       | `0.0.0.0`                                      |
    /// | `PORT`                       | `8000`                                         |
    /// | `CORS_ORIGINS`               | `http://localhost:5173,http://localhost:3000`  |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                                           |
    /// | `MAX_BODY_MB`                | `50`                                           |
    /// | `UPLOAD_DIR`                 | `./uploads`                                    |
    /// | `COMPOSED_DIR`               | `./composed`                                   |
    /// | `TEMPLATE_DIR`               | `./templates`                                  |
    /// | `PRINTER_OFFLINE_AFTER_SECS` | `90`                                           |
    /// | `LIVENESS_SWEEP_SECS`        | `30`                                           |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_body_mb: usize = std::env::var("MAX_BODY_MB")
            .unwrap_or_else(|_| "50".into())
            .parse()
            .expect("MAX_BODY_MB must be a valid usize");

        let dir = |key: &str, default: &str| {
            PathBuf::from(std::env::var(key).unwrap_or_else(|_| default.into()))
        };

        let offline_after_secs: u64 = std::env::var("PRINTER_OFFLINE_AFTER_SECS")
            .unwrap_or_else(|_| "90".into())
            .parse()
            .expect("PRINTER_OFFLINE_AFTER_SECS must be a valid u64");

        let sweep_secs: u64 = std::env::var("LIVENESS_SWEEP_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("LIVENESS_SWEEP_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_body_bytes: max_body_mb * 1024 * 1024,
            upload_dir: dir("UPLOAD_DIR", "./uploads"),
            composed_dir: dir("COMPOSED_DIR", "./composed"),
            template_dir: dir("TEMPLATE_DIR", "./templates"),
            printer_offline_after: Duration::from_secs(offline_after_secs),
            liveness_sweep_interval: Duration::from_secs(sweep_secs.max(1)),
        }
    }
}
