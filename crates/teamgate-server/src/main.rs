//! Teamgate Server: application entry point.

mod app;
mod config;

use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::app::Teamgate;
use crate::config::ServerConfig;

#[derive(Debug, Error)]
enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("invalid log filter: {0}")]
    LogFilter(String),

    #[error("database connection failed: {0}")]
    Connect(#[from] surrealdb::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] teamgate_db::DbError),

    #[error("signal handler failed: {0}")]
    Signal(#[from] std::io::Error),
}

fn init_tracing(config: &ServerConfig) -> Result<(), ServerError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)
            .map_err(|e| ServerError::LogFilter(e.to_string()))?,
    };
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    Ok(())
}

async fn run() -> Result<(), ServerError> {
    let config = ServerConfig::load()?;
    init_tracing(&config)?;

    info!("Starting Teamgate server...");

    let db = teamgate_db::DbManager::connect(&config.db).await?;
    teamgate_db::run_migrations(db.client()).await?;

    let app = Teamgate::new(db.client().clone(), &config.access);
    info!(
        max_page_size = config.access.max_page_size,
        notification_capacity = config.access.notification_channel_capacity,
        "access engine ready"
    );

    tokio::signal::ctrl_c().await?;
    drop(app);

    info!("Teamgate server stopped.");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Tracing may not be initialised when configuration fails.
        eprintln!("teamgate: {e}");
        error!(error = %e, "server exited with error");
        std::process::exit(1);
    }
}
