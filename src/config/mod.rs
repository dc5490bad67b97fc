//! Centralized configuration loading from environment variables.
//!
//! # Example
//!
//! ```rust,ignore
//! use tokio_todos::config::AppConfig;
//!
//! let config = AppConfig::from_env()?;
//! println!("Listen address: {}", config.listen_addr);
//! ```

mod app;
mod error;
mod parse;

pub use app::{AppConfig, RequestTimeout};
pub use error::ConfigError;
pub use parse::{env_bool, env_opt, env_or, env_parse, parse_duration};
