//! tokio_todos - a single-user todo application over SQLite.
//!
//! An async HTTP server built on Tokio and hyper with a hand-rolled
//! routing core: a route table matched in registration order with named
//! `:param` captures, a request adapter that lazily parses JSON or
//! form-encoded bodies (including the `_method` override), and a one-shot
//! responder that branches between redirect, template render, and JSON.
//!
//! # Architecture
//!
//! ```text
//! connection ─▶ Router::dispatch ─▶ controller ─▶ models (sqlx/SQLite)
//!                    │                   │
//!                    ▼                   ▼
//!            Request / Responder     Reply (redirect | template | JSON)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokio_todos::{config::AppConfig, controllers, db, server::Server, templates::Templates};
//!
//! let config = AppConfig::from_env()?;
//! let pool = db::connect(&config.database_url, config.db_max_connections).await?;
//! let templates = Arc::new(Templates::load(&config.templates_dir)?);
//! let router = controllers::build_router(&pool, templates, &config);
//! Server::new(config, router).run().await?;
//! ```

/// Package version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod controllers;
pub mod core;
pub mod db;
pub mod logging;
pub mod models;
pub mod router;
pub mod server;
pub mod support;
pub mod templates;

// Re-exports for convenience
pub use config::AppConfig;
pub use router::Router;
pub use server::Server;
