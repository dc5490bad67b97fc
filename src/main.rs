use std::sync::Arc;

use tracing::{error, info};

use tokio_todos::config::AppConfig;
use tokio_todos::server::Server;
use tokio_todos::templates::Templates;
use tokio_todos::{controllers, db, logging};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::from_env()?;

    logging::init(&config.log_filter, config.log_json);
    info!("Starting tokio_todos {}", tokio_todos::VERSION);
    config.log_summary();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let pool = db::connect(&config.database_url, config.db_max_connections).await?;

    let templates = Arc::new(Templates::load(&config.templates_dir).map_err(|e| {
        error!("Failed to load templates: {}", e);
        e
    })?);
    info!("Templates loaded: {}", templates.names().join(", "));

    let router = controllers::build_router(&pool, templates, &config);
    let server = Server::new(config, router);

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    server.trigger_shutdown();
    server.wait_for_drain(server.drain_timeout()).await;
    pool.close().await;

    Ok(())
}
