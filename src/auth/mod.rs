pub mod role;

use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config;

pub use role::Role;

/// Issuer stamped into every token and required on validation
pub const TOKEN_ISSUER: &str = "time2go";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authentication token")]
    MissingToken,

    #[error("{0}")]
    InvalidHeader(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("password hashing error: {0}")]
    PasswordHash(String),

    #[error("unknown role id {0}")]
    InvalidRole(i16),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id (`tabla_usuarios.id_usuario`)
    pub sub: i32,
    pub rol: Role,
    pub correo: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl Claims {
    pub fn new(user_id: i32, rol: Role, correo: impl Into<String>) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            rol,
            correo: correo.into(),
            iat: now.timestamp(),
            exp,
            iss: TOKEN_ISSUER.to_string(),
        }
    }

    /// Seconds until expiry, never negative
    pub fn expires_in(&self) -> i64 {
        (self.exp - Utc::now().timestamp()).max(0)
    }
}

pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    generate_jwt_with_secret(claims, &config::config().security.jwt_secret)
}

pub fn validate_jwt(token: &str) -> Result<Claims, AuthError> {
    validate_jwt_with_secret(token, &config::config().security.jwt_secret)
}

fn generate_jwt_with_secret(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

fn validate_jwt_with_secret(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.set_issuer(&[TOKEN_ISSUER]);

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    bcrypt::hash(plain, config::config().security.bcrypt_cost).map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Malformed hashes count as a mismatch rather than an error
pub fn verify_password(plain: &str, hash: &str) -> bool {
    match bcrypt::verify(plain, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("Stored password hash could not be verified: {}", e);
            false
        }
    }
}

/// Token from `Authorization: Bearer`, falling back to the session cookie
pub fn extract_token(headers: &HeaderMap) -> Result<String, AuthError> {
    // Non-ASCII or non-Bearer values fall through to the cookie
    if let Some(auth_str) = headers.get(header::AUTHORIZATION).and_then(|value| value.to_str().ok()) {
        if let Some(token) = bearer_token(auth_str) {
            if token.is_empty() {
                return Err(AuthError::InvalidHeader("Empty bearer token".to_string()));
            }
            return Ok(token.to_string());
        }
    }

    cookie_value(headers, &config::config().security.cookie_name).ok_or(AuthError::MissingToken)
}

/// Credentials of a `Bearer` authorization value; the scheme is case-insensitive
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, rest) = value.trim_start().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| rest.trim())
}

/// Find a cookie by name across all `Cookie` headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// `Set-Cookie` value carrying the session token
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    let security = &config::config().security;
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        security.cookie_name, token, max_age_secs
    );
    if security.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session token
pub fn clear_session_cookie() -> String {
    session_cookie("", 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "unit-test-secret";

    fn claims_expiring_in(seconds: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: 42,
            rol: Role::Promotor,
            correo: "ana@example.com".to_string(),
            iat: now,
            exp: now + seconds,
            iss: TOKEN_ISSUER.to_string(),
        }
    }

    #[test]
    fn token_roundtrip_preserves_claims() {
        let token = generate_jwt_with_secret(&claims_expiring_in(3600), SECRET).unwrap();
        let claims = validate_jwt_with_secret(&token, SECRET).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.rol, Role::Promotor);
        assert_eq!(claims.correo, "ana@example.com");
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let token = generate_jwt_with_secret(&claims_expiring_in(3600), SECRET).unwrap();
        assert!(matches!(
            validate_jwt_with_secret(&token, "other-secret"),
            Err(AuthError::InvalidToken(_))
        ));

        let expired = generate_jwt_with_secret(&claims_expiring_in(-3600), SECRET).unwrap();
        assert!(matches!(
            validate_jwt_with_secret(&expired, SECRET),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn rejects_foreign_issuer() {
        let mut claims = claims_expiring_in(3600);
        claims.iss = "someone-else".to_string();
        let token = generate_jwt_with_secret(&claims, SECRET).unwrap();
        assert!(validate_jwt_with_secret(&token, SECRET).is_err());
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(
            generate_jwt_with_secret(&claims_expiring_in(60), ""),
            Err(AuthError::InvalidSecret)
        ));
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        headers.insert(header::COOKIE, HeaderValue::from_static("token=cookie-token"));
        assert_eq!(extract_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn falls_back_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=cookie-token"));
        assert_eq!(extract_token(&headers).unwrap(), "cookie-token");
    }

    #[test]
    fn non_ascii_header_falls_back_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap());
        headers.insert(header::COOKIE, HeaderValue::from_static("token=cookie-token"));
        assert_eq!(extract_token(&headers).unwrap(), "cookie-token");
    }

    #[test]
    fn bearer_scheme_ignores_case() {
        for value in ["bearer abc.def.ghi", "BEARER abc.def.ghi", "Bearer   abc.def.ghi "] {
            let mut headers = HeaderMap::new();
            headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
            headers.insert(header::COOKIE, HeaderValue::from_static("token=cookie-token"));
            assert_eq!(extract_token(&headers).unwrap(), "abc.def.ghi", "{}", value);
        }
    }

    #[test]
    fn empty_bearer_is_an_error() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert!(matches!(extract_token(&headers), Err(AuthError::InvalidHeader(_))));
    }

    #[test]
    fn missing_everything() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("token="));
        assert!(matches!(extract_token(&headers), Err(AuthError::MissingToken)));
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("xyz", 3600);
        assert!(cookie.starts_with("token=xyz;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = bcrypt::hash("s3creta-larga", 4).unwrap();
        assert!(verify_password("s3creta-larga", &hash));
        assert!(!verify_password("otra", &hash));
        assert!(!verify_password("s3creta-larga", "not-a-hash"));
    }
}
