use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;

use crate::database::models::{EventRow, Rating, RatingSummary};
use crate::database::repository::{events, ratings};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::validation::{non_blank, FieldErrors};

#[derive(Debug, Clone, Deserialize)]
pub struct RatingRequest {
    pub puntuacion: i16,
    pub comentario: Option<String>,
}

impl RatingRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.check_range("puntuacion", self.puntuacion, 1, 5);
        if let Some(comentario) = non_blank(self.comentario.as_deref()) {
            errors.check_length("comentario", &comentario, 1, 500);
        }
        errors.into_result()
    }
}

/// Approved events can be rated once they have started
pub fn check_rateable(event: &EventRow, now: DateTime<Utc>) -> Result<(), ApiError> {
    if !event.is_approved() {
        return Err(ApiError::not_found("Evento no encontrado"));
    }
    if event.fecha_inicio > now {
        return Err(ApiError::conflict("Solo puedes valorar un evento después de que comience"));
    }
    Ok(())
}

pub struct RatingService {
    pool: PgPool,
}

impl RatingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
        }
    }

    pub async fn rate(&self, user: &AuthUser, id_evento: i32, request: RatingRequest) -> Result<Rating, ApiError> {
        request.validate()?;

        let event = events::find_row(&self.pool, id_evento)
            .await?
            .ok_or_else(|| ApiError::not_found("Evento no encontrado"))?;
        check_rateable(&event, Utc::now())?;

        let comentario = non_blank(request.comentario.as_deref());
        let rating = ratings::upsert(&self.pool, user.id, id_evento, request.puntuacion, comentario.as_deref()).await?;
        tracing::info!("User {} rated event {} with {}", user.id, id_evento, request.puntuacion);
        Ok(rating)
    }

    /// Public ratings of an approved event
    pub async fn summary(&self, id_evento: i32) -> Result<RatingSummary, ApiError> {
        let event = events::find_row(&self.pool, id_evento)
            .await?
            .filter(EventRow::is_approved)
            .ok_or_else(|| ApiError::not_found("Evento no encontrado"))?;

        let valoraciones = ratings::list_for_event(&self.pool, event.id_evento).await?;
        Ok(RatingSummary::from_ratings(valoraciones))
    }
}
