//! Application configuration loaded from environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use super::parse::{env_bool, env_or, env_parse, parse_duration};
use super::ConfigError;

/// Per-request handler timeout configuration.
#[derive(Clone, Copy, Debug)]
pub struct RequestTimeout(pub Option<Duration>);

impl RequestTimeout {
    /// Parse duration string (e.g., "30s", "2m", "off").
    pub fn parse(s: &str) -> Self {
        match parse_duration(s) {
            Ok(d) => Self(d),
            Err(_) => Self::default(),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    #[inline]
    pub fn as_secs(&self) -> u64 {
        self.0.map(|d| d.as_secs()).unwrap_or(0)
    }

    #[inline]
    pub fn as_duration(&self) -> Option<Duration> {
        self.0
    }
}

impl Default for RequestTimeout {
    fn default() -> Self {
        Self(Some(Duration::from_secs(30)))
    }
}

/// Application configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Listen address (default: 127.0.0.1:8080).
    pub listen_addr: SocketAddr,
    /// sqlx database URL (default: sqlite://todos.db).
    pub database_url: String,
    /// Directory the template glob starts from.
    pub templates_dir: PathBuf,
    /// Request body cap in bytes.
    pub max_body_size: usize,
    /// Per-request handler timeout.
    pub request_timeout: RequestTimeout,
    /// Graceful shutdown drain timeout.
    pub drain_timeout: Duration,
    /// Accept-loop workers (0 = one per CPU).
    pub workers: usize,
    /// Per-request access log lines (ACCESS_LOG=1).
    pub access_log: bool,
    /// Connection pool size.
    pub db_max_connections: u32,
    /// tracing filter directive.
    pub log_filter: String,
    /// Emit line-JSON logs instead of human-readable ones.
    pub log_json: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr: SocketAddr = env_or("LISTEN_ADDR", "127.0.0.1:8080")
            .parse()
            .map_err(|e| ConfigError::Parse {
                key: "LISTEN_ADDR".into(),
                value: env_or("LISTEN_ADDR", "127.0.0.1:8080"),
                error: format!("{}", e),
            })?;

        let drain_timeout_secs: u64 = env_parse("DRAIN_TIMEOUT_SECS", 30)?;

        Ok(Self {
            listen_addr,
            database_url: env_or("DATABASE_URL", "sqlite://todos.db"),
            templates_dir: PathBuf::from(env_or("TEMPLATES_DIR", "templates")),
            max_body_size: env_parse("MAX_BODY_SIZE", 64 * 1024)?,
            request_timeout: RequestTimeout::parse(&env_or("REQUEST_TIMEOUT", "30s")),
            drain_timeout: Duration::from_secs(drain_timeout_secs),
            workers: env_parse("WORKERS", 0)?,
            access_log: env_bool("ACCESS_LOG", false),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 5)?,
            log_filter: resolve_log_filter(),
            log_json: env_or("LOG_FORMAT", "text").eq_ignore_ascii_case("json"),
        })
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        info!("Configuration loaded:");
        info!("  Listen: {}", self.listen_addr);
        info!("  Database: {}", self.database_url);
        info!("  Templates: {}", self.templates_dir.display());
        info!("  Max body size: {} bytes", self.max_body_size);

        if self.request_timeout.is_enabled() {
            info!("  Request timeout: {}s", self.request_timeout.as_secs());
        } else {
            info!("  Request timeout: disabled");
        }

        if self.access_log {
            info!("  Access log: enabled");
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".parse().expect("static address"),
            database_url: "sqlite://todos.db".to_string(),
            templates_dir: PathBuf::from("templates"),
            max_body_size: 64 * 1024,
            request_timeout: RequestTimeout::default(),
            drain_timeout: Duration::from_secs(30),
            workers: 0,
            access_log: false,
            db_max_connections: 5,
            log_filter: default_log_filter(),
            log_json: false,
        }
    }
}

fn default_log_filter() -> String {
    concat!(env!("CARGO_PKG_NAME"), "=info").to_string()
}

/// Resolve log filter from environment.
///
/// Priority: LOG_LEVEL > RUST_LOG > default (info)
///
/// LOG_LEVEL accepts simple values: trace, debug, info, warn, error.
/// RUST_LOG accepts full tracing filter syntax.
fn resolve_log_filter() -> String {
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        let level = level.to_lowercase();
        match level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {
                return format!("{}={}", env!("CARGO_PKG_NAME"), level);
            }
            _ => {
                eprintln!(
                    "Warning: Invalid LOG_LEVEL '{}', expected: trace, debug, info, warn, error",
                    level
                );
            }
        }
    }

    if let Ok(filter) = std::env::var("RUST_LOG") {
        return filter;
    }

    default_log_filter()
}
