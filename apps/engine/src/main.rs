//! Problem engine - Main entry point.
//!
//! Connects to PostgreSQL and brings the schema up to date.
//!
//! The defect synchronization settings are loaded and validated here, but the
//! task itself needs a `DefectAdapter`: embedders start it with
//! `services::start_defect_sync_task` and `config.defect_sync`.

use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use problem_engine::config::Config;
use problem_engine::db::{self, DbPool};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL must be set");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Problem Engine");
    info!("  Environment: {}", config.environment);
    info!("  Stability timelines: {} executions", config.stability_execution_count);
    info!(
        "  Defect sync: every {} seconds, first after {} seconds",
        config.defect_sync.interval_secs, config.defect_sync.initial_delay_secs
    );
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
        info!("Using development default for DATABASE_URL");
    }

    let pool = match DbPool::new(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!("Database connection established");

    if let Err(e) = db::run_migrations(&pool).await {
        error!("{}", e);
        std::process::exit(1);
    }
    info!("Database migrations complete");
}
