pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod services;
pub mod state;
pub mod storage;
pub mod time;
pub mod validation;

#[cfg(test)]
pub mod testing;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::{config, StorageBackend};
use crate::middleware::{require_auth, require_moderator};
use crate::state::AppState;

/// Full application router
pub fn app(state: AppState) -> Router {
    let settings = config();

    let mut router = Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(elevated_routes(state.clone()));

    if settings.storage.backend == StorageBackend::Local {
        router = router.nest_service("/uploads", ServeDir::new(&settings.storage.local_dir));
    }

    router
        .layer(DefaultBodyLimit::max(settings.uploads.max_request_size_bytes))
        .layer(cors_layer(&settings.security.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use handlers::public::{auth, events, system};

    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/events", get(events::list))
        .route("/events/:id", get(events::detail))
        .route("/events/:id/ratings", get(events::ratings))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{auth, documents, events, ratings, reservations};

    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/events", post(events::create))
        .route("/api/events/mine", get(events::mine))
        .route(
            "/api/events/:id",
            get(events::show).put(events::update).delete(events::delete),
        )
        .route(
            "/api/events/:id/reservations",
            post(reservations::reserve).get(reservations::attendees),
        )
        .route("/api/events/:id/ratings", post(ratings::rate))
        .route("/api/events/:id/documents/:doc_id", get(documents::download))
        .route("/api/reservations", get(reservations::list))
        .route("/api/reservations/:id", delete(reservations::cancel))
        .route_layer(from_fn_with_state(state, require_auth))
}

fn elevated_routes(state: AppState) -> Router<AppState> {
    use handlers::elevated::{events, users};

    Router::new()
        .route("/api/admin/users", get(users::list))
        .route("/api/admin/users/:id/role", patch(users::set_role))
        .route("/api/admin/users/:id/ban", post(users::ban).delete(users::unban))
        .route("/api/admin/bans", get(users::bans))
        .route("/api/admin/events", get(events::list))
        .route("/api/admin/events/:id/status", patch(events::set_status))
        // The last route_layer runs first, so require_auth injects AuthUser before the role check
        .route_layer(axum::middleware::from_fn(require_moderator))
        .route_layer(from_fn_with_state(state, require_auth))
}

/// Credentialed CORS for the configured front-end origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::testing::{bearer, test_app};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = test_app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn root_describes_the_service() {
        let (status, body) = send(get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["name"], "Time2Go API");
    }

    #[tokio::test]
    async fn health_reports_unreachable_database() {
        let (status, body) = send(get("/health")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["data"]["database"], "unavailable");
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        for uri in ["/api/auth/me", "/api/reservations", "/api/events/mine", "/api/admin/users"] {
            let (status, body) = send(get(uri)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
            assert_eq!(body["code"], "UNAUTHORIZED");
        }
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let request = Request::builder()
            .uri("/api/auth/me")
            .header("authorization", "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_checks_the_database() {
        // The user lookup cannot reach the test database, so the request
        // must fail instead of trusting the token alone
        let request = Request::builder()
            .uri("/api/auth/me")
            .header("authorization", bearer(1, Role::Administrador))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert!(status.is_server_error());
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn register_reports_every_invalid_field() {
        let (status, body) = send(post_json(
            "/auth/register",
            json!({
                "nombre": "A",
                "apellido": "Pérez",
                "correo": "no-es-correo",
                "contrasena": "corta",
                "telefono": "abc"
            }),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        let fields = body["field_errors"].as_object().unwrap();
        for field in ["nombre", "correo", "contrasena", "telefono"] {
            assert!(fields.contains_key(field), "missing {}", field);
        }
        assert!(!fields.contains_key("apellido"));
    }

    #[tokio::test]
    async fn malformed_json_is_a_client_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header("content-type", "application/json")
            .body(Body::from("{\"correo\":"))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn logout_clears_the_cookie() {
        let request = Request::builder()
            .method("POST")
            .uri("/auth/logout")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()["set-cookie"].to_str().unwrap();
        assert!(cookie.starts_with("token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn non_numeric_ids_are_bad_requests() {
        let (status, body) = send(get("/events/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Identificador inválido");
    }

    #[tokio::test]
    async fn catalog_rejects_bad_dates_before_querying() {
        let (status, body) = send(get("/events?desde=ayer")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["field_errors"]["desde"].is_string());

        let (status, _) = send(get("/events?pagina=uno")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_routes_are_404() {
        let response = test_app().oneshot(get("/api/nada")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin_with_credentials() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/events")
            .header("origin", "http://localhost:5173")
            .header("access-control-request-method", "GET")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "http://localhost:5173");
        assert_eq!(headers["access-control-allow-credentials"], "true");
    }
}
