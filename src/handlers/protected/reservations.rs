// handlers/protected/reservations.rs - reservations of the calling user
//
// POST   /api/events/:id/reservations   201 when created, 200 when it already existed
// GET    /api/events/:id/reservations   attendee list (owner or staff)
// GET    /api/reservations
// DELETE /api/reservations/:id

use axum::{extract::State, http::StatusCode, Extension};
use serde_json::{json, Value};

use crate::database::models::Attendee;
use crate::handlers::extract::ApiPath;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::reservation_service::{ReservationOutcome, ReservationView};
use crate::services::ReservationService;
use crate::state::AppState;

pub async fn reserve(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id_evento): ApiPath<i32>,
) -> ApiResult<ReservationOutcome> {
    let outcome = ReservationService::new(&state).reserve(&user, id_evento).await?;
    let status = if outcome.creada { StatusCode::CREATED } else { StatusCode::OK };
    Ok(ApiResponse::with_status(outcome, status))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<ReservationView>> {
    let reservas = ReservationService::new(&state).list_for_user(&user).await?;
    Ok(ApiResponse::success(reservas))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id_reserva): ApiPath<i32>,
) -> ApiResult<Value> {
    ReservationService::new(&state).cancel(&user, id_reserva).await?;
    Ok(ApiResponse::success(json!({ "id_reserva": id_reserva, "cancelada": true })))
}

pub async fn attendees(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id_evento): ApiPath<i32>,
) -> ApiResult<Vec<Attendee>> {
    let asistentes = ReservationService::new(&state).attendees(&user, id_evento).await?;
    Ok(ApiResponse::success(asistentes))
}
