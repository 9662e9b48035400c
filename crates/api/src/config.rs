use std::path::PathBuf;

use stagetrack_core::upload::AllowedExtensions;

/// Default cap on a whole multipart submission (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Root directory of the blob area (default: `./uploads`).
    pub upload_dir: PathBuf,
    /// Extensions accepted for attachments; others are skipped.
    pub allowed_extensions: AllowedExtensions,
    /// Maximum request body size for form submissions.
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                      |
    /// |-----------------------------|------------------------------|
    /// | `HOST`                      | `0.0.0.0`                    |
    /// | `PORT`                      | `3000`                       |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`      |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                         |
    /// | `UPLOAD_DIR`                | `./uploads`                  |
    /// | `ALLOWED_UPLOAD_EXTENSIONS` | `txt,pdf,png,jpg,jpeg,gif`   |
    /// | `MAX_UPLOAD_BYTES`          | `52428800`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        let allowed_extensions = std::env::var("ALLOWED_UPLOAD_EXTENSIONS")
            .map(|list| AllowedExtensions::parse(&list))
            .unwrap_or_default();

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .map(|v| v.parse().expect("MAX_UPLOAD_BYTES must be a valid usize"))
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            upload_dir,
            allowed_extensions,
            max_upload_bytes,
        }
    }
}
