// handlers/public/system.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseManager;
use crate::state::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Time2Go API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Event discovery, reservations and moderation",
            "endpoints": {
                "auth": "/auth/register, /auth/login, /auth/logout (public)",
                "events": "/events[/:id[/ratings]] (public)",
                "session": "/api/auth/me (protected)",
                "manage": "/api/events[/:id] (protected, promoters)",
                "reservations": "/api/reservations, /api/events/:id/reservations (protected)",
                "ratings": "/api/events/:id/ratings (protected)",
                "documents": "/api/events/:id/documents/:doc_id (protected)",
                "admin": "/api/admin/* (moderators)",
            }
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "unavailable"
                    }
                })),
            )
        }
    }
}
