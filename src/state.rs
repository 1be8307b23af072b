use sqlx::PgPool;
use std::sync::Arc;

use crate::mail::Mailer;
use crate::storage::Storage;

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub storage: Arc<dyn Storage>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(pool: PgPool, storage: Arc<dyn Storage>, mailer: Arc<dyn Mailer>) -> Self {
        Self { pool, storage, mailer }
    }
}
