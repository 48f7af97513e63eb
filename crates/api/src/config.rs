use std::path::PathBuf;
use std::str::FromStr;

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
    /// HTTP request timeout in seconds. Batch submission blocks until every
    /// job settles, so this is generous.
    pub request_timeout_secs: u64,
    /// Ceiling on simultaneously active jobs across all batches.
    pub max_workers: usize,
    /// Hard per-job fetch timeout in seconds.
    pub fetch_timeout_secs: u64,
    /// Root directory for processed images.
    pub output_dir: PathBuf,
    /// Directory holding one ledger record per batch.
    pub ledger_dir: PathBuf,
    pub resize_width: u32,
    pub resize_height: u32,
    pub grayscale: bool,
    /// Requests allowed per client per window. `0` disables rate limiting.
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            cors_origins: vec!["http://localhost:5173".into()],
            request_timeout_secs: 600,
            max_workers: imgbatch_worker::DEFAULT_MAX_WORKERS,
            fetch_timeout_secs: imgbatch_worker::DEFAULT_FETCH_TIMEOUT.as_secs(),
            output_dir: PathBuf::from("output"),
            ledger_dir: PathBuf::from("progress"),
            resize_width: imgbatch_pipeline::transform::DEFAULT_WIDTH,
            resize_height: imgbatch_pipeline::transform::DEFAULT_HEIGHT,
            grayscale: false,
            rate_limit_max: 100,
            rate_limit_window_secs: 15 * 60,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `HOST`                   | `0.0.0.0`               |
    /// | `PORT`                   | `3000`                  |
    /// | `CORS_ORIGINS`           | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | `600`                   |
    /// | `MAX_WORKERS`            | `5`                     |
    /// | `FETCH_TIMEOUT_SECS`     | `10`                    |
    /// | `OUTPUT_DIR`             | `output`                |
    /// | `LEDGER_DIR`             | `progress`              |
    /// | `RESIZE_WIDTH`           | `200`                   |
    /// | `RESIZE_HEIGHT`          | `200`                   |
    /// | `GRAYSCALE`              | `false`                 |
    /// | `RATE_LIMIT_MAX`         | `100`                   |
    /// | `RATE_LIMIT_WINDOW_SECS` | `900`                   |
    ///
    /// Panics on unparseable values; misconfiguration should fail at startup.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = match std::env::var("CORS_ORIGINS") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => defaults.cors_origins,
        };

        let max_workers: usize = env_or("MAX_WORKERS", defaults.max_workers);
        assert!(max_workers >= 1, "MAX_WORKERS must be at least 1");

        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            max_workers,
            fetch_timeout_secs: env_or("FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            ledger_dir: std::env::var("LEDGER_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.ledger_dir),
            resize_width: env_or("RESIZE_WIDTH", defaults.resize_width),
            resize_height: env_or("RESIZE_HEIGHT", defaults.resize_height),
            grayscale: env_or("GRAYSCALE", defaults.grayscale),
            rate_limit_max: env_or("RATE_LIMIT_MAX", defaults.rate_limit_max),
            rate_limit_window_secs: env_or(
                "RATE_LIMIT_WINDOW_SECS",
                defaults.rate_limit_window_secs,
            ),
        }
    }
}

/// Parse `key` from the environment, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}
