use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use nailbook::config::AppConfig;
use nailbook::db;
use nailbook::handlers;
use nailbook::services::clock::SystemClock;
use nailbook::state::AppState;
use nailbook::store::sqlite::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let conn = db::init_db(&config.database_url)?;
    let store = Arc::new(SqliteStore::new(conn));

    tracing::info!(
        open = %config.schedule.open,
        close = %config.schedule.close,
        step_minutes = config.schedule.step_minutes,
        "slot schedule loaded"
    );

    let state = Arc::new(AppState {
        bookings: store.clone(),
        payments: store.clone(),
        memberships: store,
        clock: Arc::new(SystemClock::new(config.utc_offset)),
        config: config.clone(),
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
