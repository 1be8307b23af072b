pub mod health;
pub mod migrate;
pub mod token;
pub mod user;

use sqlx::PgPool;

use crate::config::config;
use crate::database::DatabaseManager;

/// Pool for one-shot commands, connected eagerly so failures surface at once
pub(crate) async fn connect() -> anyhow::Result<PgPool> {
    let config = config();
    config.validate()?;
    let pool = DatabaseManager::connect_lazy(&config.database)?;
    DatabaseManager::health_check(&pool).await?;
    Ok(pool)
}
