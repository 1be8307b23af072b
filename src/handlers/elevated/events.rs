// handlers/elevated/events.rs - GET /api/admin/events, PATCH /api/admin/events/:id/status

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::EventSummary;
use crate::handlers::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::admin_service::StatusChange;
use crate::services::AdminService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub estado: Option<String>,
}

/// Moderation queue; defaults to `pendiente`
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> ApiResult<Vec<EventSummary>> {
    let eventos = AdminService::new(&state)
        .events_by_status(query.estado.as_deref())
        .await?;
    Ok(ApiResponse::success(eventos))
}

pub async fn set_status(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath(id_evento): ApiPath<i32>,
    ApiJson(change): ApiJson<StatusChange>,
) -> ApiResult<Value> {
    let estado = AdminService::new(&state)
        .set_event_status(&actor, id_evento, change)
        .await?;
    Ok(ApiResponse::success(json!({ "id_evento": id_evento, "estado": estado })))
}
