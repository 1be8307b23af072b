// handlers/elevated/users.rs - user and ban administration
//
// GET    /api/admin/users
// PATCH  /api/admin/users/:id/role   administrators only
// POST   /api/admin/users/:id/ban
// DELETE /api/admin/users/:id/ban
// GET    /api/admin/bans

use axum::{extract::State, http::StatusCode, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::Page;
use crate::database::models::{Ban, UserListItem, UserProfile};
use crate::handlers::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::admin_service::{BanRequest, RoleChange, UserSearch};
use crate::services::AdminService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BanListQuery {
    pub incluir_historial: Option<bool>,
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(search): ApiQuery<UserSearch>,
) -> ApiResult<Page<UserListItem>> {
    let page = AdminService::new(&state).list_users(search).await?;
    Ok(ApiResponse::success(page))
}

pub async fn set_role(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath(id_usuario): ApiPath<i32>,
    ApiJson(change): ApiJson<RoleChange>,
) -> ApiResult<UserProfile> {
    let profile = AdminService::new(&state).set_role(&actor, id_usuario, change).await?;
    Ok(ApiResponse::success(profile))
}

pub async fn ban(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath(id_usuario): ApiPath<i32>,
    ApiJson(request): ApiJson<BanRequest>,
) -> ApiResult<Ban> {
    let ban = AdminService::new(&state).ban(&actor, id_usuario, request).await?;
    Ok(ApiResponse::with_status(ban, StatusCode::CREATED))
}

pub async fn unban(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath(id_usuario): ApiPath<i32>,
) -> ApiResult<Value> {
    AdminService::new(&state).unban(&actor, id_usuario).await?;
    Ok(ApiResponse::success(json!({ "id_usuario": id_usuario, "baneado": false })))
}

pub async fn bans(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BanListQuery>,
) -> ApiResult<Vec<Ban>> {
    let baneos = AdminService::new(&state)
        .list_bans(query.incluir_historial.unwrap_or(false))
        .await?;
    Ok(ApiResponse::success(baneos))
}
