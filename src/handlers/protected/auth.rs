// handlers/protected/auth.rs - GET /api/auth/me

use axum::{extract::State, Extension};

use crate::database::models::UserProfile;
use crate::database::repository::users;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

pub async fn me(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<UserProfile> {
    let profile = users::find_profile(&state.pool, user.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("La sesión ya no es válida"))?;
    Ok(ApiResponse::success(profile))
}
