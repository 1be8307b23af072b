// handlers/protected/ratings.rs - POST /api/events/:id/ratings

use axum::{extract::State, Extension};

use crate::database::models::Rating;
use crate::handlers::extract::{ApiJson, ApiPath};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::rating_service::RatingRequest;
use crate::services::RatingService;
use crate::state::AppState;

/// Creates the caller's rating or replaces the previous one
pub async fn rate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id_evento): ApiPath<i32>,
    ApiJson(request): ApiJson<RatingRequest>,
) -> ApiResult<Rating> {
    let rating = RatingService::new(&state).rate(&user, id_evento, request).await?;
    Ok(ApiResponse::success(rating))
}
