use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use persistence::PgStore;
use sqlx::PgPool;
use tracing::info;

use admin_console_api::{app, config, middleware};

const POOL_METRICS_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging)?;
    middleware::init_metrics()?;

    info!("Starting Admin Console API v{}", env!("CARGO_PKG_VERSION"));

    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    spawn_pool_metrics(pool.clone());

    let addr = config.socket_addr().context("Invalid server address")?;
    let store = Arc::new(PgStore::new(pool.clone()));
    let state = app::AppState::build(config, store, Some(pool))
        .await
        .context("Failed to load system settings")?;
    let app = app::create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_pool_metrics(pool: PgPool) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(POOL_METRICS_INTERVAL);
        loop {
            interval.tick().await;
            persistence::metrics::record_pool_metrics(&pool);
        }
    });
}
