// handlers/public/auth.rs - POST /auth/register, /auth/login, /auth/logout

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use serde_json::json;

use crate::auth::{clear_session_cookie, session_cookie};
use crate::database::models::UserProfile;
use crate::error::ApiError;
use crate::handlers::extract::ApiJson;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::account_service::{LoginRequest, RegisterRequest};
use crate::services::AccountService;
use crate::state::AppState;

/// POST /auth/register - create a Usuario account
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<UserProfile> {
    let profile = AccountService::new(&state).register(request).await?;
    Ok(ApiResponse::created(profile))
}

/// POST /auth/login - returns the token and also sets it as an HttpOnly cookie
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let session = AccountService::new(&state).login(request).await?;
    let cookie = session_cookie(&session.token, session.expires_in);

    let mut response = ApiResponse::success(session).into_response();
    set_cookie(&mut response, &cookie)?;
    Ok(response)
}

/// POST /auth/logout - clears the session cookie; bearer tokens simply expire
pub async fn logout() -> Result<Response, ApiError> {
    let mut response = ApiResponse::success(json!({ "sesion_cerrada": true })).into_response();
    set_cookie(&mut response, &clear_session_cookie())?;
    Ok(response)
}

fn set_cookie(response: &mut Response, cookie: &str) -> Result<(), ApiError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|_| ApiError::internal_server_error("No se pudo crear la sesión"))?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}
