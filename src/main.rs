use anyhow::Context;
use tracing_subscriber::EnvFilter;

use time2go_api::config::config;
use time2go_api::database::DatabaseManager;
use time2go_api::state::AppState;
use time2go_api::{app, mail, storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config();
    config.validate()?;
    tracing::info!("Starting Time2Go API in {:?} mode", config.environment);

    let pool = DatabaseManager::connect_lazy(&config.database)?;
    if config.database.auto_migrate {
        DatabaseManager::migrate(&pool).await?;
    }

    let storage = storage::from_config(&config.storage)?;
    let mailer = mail::from_config(&config.mail)?;
    let app = app(AppState::new(pool, storage, mailer));

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Time2Go API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
