// handlers/public/events.rs - GET /events, /events/:id, /events/:id/ratings

use axum::extract::State;
use serde::Deserialize;

use crate::api::{Page, PageQuery, Pagination};
use crate::config::config;
use crate::database::models::{EventDetail, EventFilter, EventStatus, EventSummary, RatingSummary};
use crate::database::repository::events;
use crate::error::ApiError;
use crate::handlers::extract::{ApiPath, ApiQuery};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::RatingService;
use crate::state::AppState;
use crate::time::parse_day_bound;
use crate::validation::{non_blank, FieldErrors};

/// Catalog query string. Dates accept RFC 3339 or a bare `YYYY-MM-DD`.
#[derive(Debug, Default, Deserialize)]
pub struct EventListQuery {
    pub q: Option<String>,
    pub categoria: Option<String>,
    pub ciudad: Option<String>,
    pub desde: Option<String>,
    pub hasta: Option<String>,
    pub incluir_pasados: Option<bool>,
    pub solo_gratis: Option<bool>,
    pub pagina: Option<i64>,
    pub por_pagina: Option<i64>,
}

impl EventListQuery {
    pub fn into_filter(self) -> Result<(EventFilter, PageQuery), ApiError> {
        let mut errors = FieldErrors::new();

        let desde = match non_blank(self.desde.as_deref()) {
            Some(raw) => parse_day_bound(&raw, false).or_else(|| {
                errors.add("desde", "Fecha inválida");
                None
            }),
            None => None,
        };
        let hasta = match non_blank(self.hasta.as_deref()) {
            Some(raw) => parse_day_bound(&raw, true).or_else(|| {
                errors.add("hasta", "Fecha inválida");
                None
            }),
            None => None,
        };
        if let (Some(desde), Some(hasta)) = (desde, hasta) {
            if hasta < desde {
                errors.add("hasta", "Debe ser posterior a 'desde'");
            }
        }
        errors.into_result()?;

        let filter = EventFilter {
            q: non_blank(self.q.as_deref()),
            categoria: non_blank(self.categoria.as_deref()),
            ciudad: non_blank(self.ciudad.as_deref()),
            desde,
            hasta,
            incluir_pasados: self.incluir_pasados.unwrap_or(false),
            solo_gratis: self.solo_gratis.unwrap_or(false),
        };
        let page = PageQuery {
            pagina: self.pagina,
            por_pagina: self.por_pagina,
        };
        Ok((filter, page))
    }
}

/// GET /events - approved catalog
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EventListQuery>,
) -> ApiResult<Page<EventSummary>> {
    let (filter, page) = query.into_filter()?;
    let pagination = Pagination::resolve(page, &config().listing);

    let (eventos, total) = events::list_public(&state.pool, &filter, pagination.limit(), pagination.offset()).await?;
    Ok(ApiResponse::success(Page::new("eventos", eventos, pagination, total)))
}

/// GET /events/:id - only approved events are public
pub async fn detail(State(state): State<AppState>, ApiPath(id): ApiPath<i32>) -> ApiResult<EventDetail> {
    let event = events::find_detail(&state.pool, id)
        .await?
        .filter(|event| event.status() == Some(EventStatus::Aprobado))
        .ok_or_else(|| ApiError::not_found("Evento no encontrado"))?;
    Ok(ApiResponse::success(event))
}

/// GET /events/:id/ratings
pub async fn ratings(State(state): State<AppState>, ApiPath(id): ApiPath<i32>) -> ApiResult<RatingSummary> {
    let summary = RatingService::new(&state).summary(id).await?;
    Ok(ApiResponse::success(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filters_are_ignored() {
        let query = EventListQuery {
            q: Some("   ".to_string()),
            ciudad: Some(" Medellín ".to_string()),
            ..Default::default()
        };
        let (filter, page) = query.into_filter().unwrap();
        assert_eq!(filter.q, None);
        assert_eq!(filter.ciudad.as_deref(), Some("Medellín"));
        assert!(!filter.incluir_pasados);
        assert_eq!(page.pagina, None);
    }

    #[test]
    fn day_bounds_cover_whole_days() {
        let query = EventListQuery {
            desde: Some("2030-05-01".to_string()),
            hasta: Some("2030-05-01".to_string()),
            ..Default::default()
        };
        let (filter, _) = query.into_filter().unwrap();
        let (desde, hasta) = (filter.desde.unwrap(), filter.hasta.unwrap());
        assert!(hasta > desde);
        assert_eq!((hasta - desde).num_seconds(), 86_399);
    }

    #[test]
    fn bad_dates_are_field_errors() {
        let query = EventListQuery {
            desde: Some("mañana".to_string()),
            ..Default::default()
        };
        let err = query.into_filter().unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_json()["field_errors"]["desde"].is_string());
    }

    #[test]
    fn reversed_range_is_rejected() {
        let query = EventListQuery {
            desde: Some("2030-05-02".to_string()),
            hasta: Some("2030-05-01".to_string()),
            ..Default::default()
        };
        assert!(query.into_filter().is_err());
    }
}
