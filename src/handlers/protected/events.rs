// handlers/protected/events.rs - event management for promoters and staff
//
// POST   /api/events       multipart create
// GET    /api/events/mine  caller's events in any state
// GET    /api/events/:id   full detail for the owner or staff, any state
// PUT    /api/events/:id   multipart update
// DELETE /api/events/:id

use axum::{extract::State, Extension};
use chrono::Utc;
use serde_json::{json, Value};

use crate::config::config;
use crate::database::models::{EventDetail, EventSummary};
use crate::database::repository::events;
use crate::error::ApiError;
use crate::handlers::extract::{ApiMultipart, ApiPath};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::event_form::{EventForm, FormMode};
use crate::services::{EventError, EventService};
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiMultipart(multipart): ApiMultipart,
) -> ApiResult<EventDetail> {
    // Reject before reading the body
    user.require_event_creator()?;

    let form = EventForm::from_multipart(multipart).await?;
    let event = form.validate(Utc::now(), FormMode::Create, &config().uploads)?;

    let detail = EventService::new(&state).create(&user, event).await?;
    Ok(ApiResponse::created(detail))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiMultipart(multipart): ApiMultipart,
) -> ApiResult<EventDetail> {
    let service = EventService::new(&state);
    service.find_managed(&user, id).await?;

    let form = EventForm::from_multipart(multipart).await?;
    let event = form.validate(Utc::now(), FormMode::Update, &config().uploads)?;

    let detail = service.update(&user, id, event).await?;
    Ok(ApiResponse::success(detail))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Value> {
    EventService::new(&state).delete(&user, id).await?;
    Ok(ApiResponse::success(json!({ "id_evento": id, "eliminado": true })))
}

pub async fn mine(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<EventSummary>> {
    let eventos = events::list_by_owner(&state.pool, user.id).await?;
    Ok(ApiResponse::success(eventos))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<EventDetail> {
    EventService::new(&state).find_managed(&user, id).await?;
    let detail = events::find_detail(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::from(EventError::NotFound(id)))?;
    Ok(ApiResponse::success(detail))
}
