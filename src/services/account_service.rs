use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{generate_jwt, hash_password, verify_password, Claims, Role};
use crate::database::models::{NewUser, UserProfile};
use crate::database::repository::users;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{non_blank, validate_email_format, validate_password_strength, validate_phone, FieldErrors};

const BAD_CREDENTIALS: &str = "Correo o contraseña incorrectos";

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub apellido: String,
    #[serde(default)]
    pub correo: String,
    #[serde(default)]
    pub contrasena: String,
    #[serde(default)]
    pub telefono: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.check_length("nombre", &self.nombre, 2, 60);
        errors.check_length("apellido", &self.apellido, 2, 60);
        errors.check("correo", validate_email_format(&self.correo));
        errors.check("contrasena", validate_password_strength(&self.contrasena));
        if let Some(telefono) = non_blank(self.telefono.as_deref()) {
            errors.check("telefono", validate_phone(&telefono));
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub correo: String,
    #[serde(default)]
    pub contrasena: String,
}

#[derive(Debug, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_in: i64,
    pub usuario: UserProfile,
}

pub struct AccountService {
    pool: PgPool,
}

impl AccountService {
    pub fn new(state: &AppState) -> Self {
        Self::from_pool(state.pool.clone())
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// New accounts always start as [`Role::Usuario`]
    pub async fn register(&self, request: RegisterRequest) -> Result<UserProfile, ApiError> {
        request.validate()?;
        self.create_user(request, Role::Usuario).await
    }

    /// Shared with the admin CLI, which may pick any role
    pub async fn create_user(&self, request: RegisterRequest, role: Role) -> Result<UserProfile, ApiError> {
        let user = NewUser {
            nombre: request.nombre.trim().to_string(),
            apellido: request.apellido.trim().to_string(),
            correo: request.correo.trim().to_lowercase(),
            password_hash: hash_password(&request.contrasena)?,
            telefono: non_blank(request.telefono.as_deref()),
            id_rol: role.id(),
        };

        let profile = users::insert_user(&self.pool, &user).await?;
        tracing::info!("Registered user {} as {}", profile.id_usuario, role);
        Ok(profile)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<Session, ApiError> {
        let mut errors = FieldErrors::new();
        errors.check_length("correo", &request.correo, 1, 254);
        errors.check_length("contrasena", &request.contrasena, 1, 128);
        errors.into_result()?;

        let Some(credentials) = users::find_credentials(&self.pool, &request.correo).await? else {
            return Err(ApiError::unauthorized(BAD_CREDENTIALS));
        };
        if !verify_password(&request.contrasena, &credentials.contrasena) {
            tracing::info!("Failed login for user {}", credentials.id_usuario);
            return Err(ApiError::unauthorized(BAD_CREDENTIALS));
        }
        if credentials.baneado {
            return Err(ApiError::forbidden("Tu cuenta está suspendida"));
        }

        let role = Role::try_from(credentials.id_rol)?;
        let claims = Claims::new(credentials.id_usuario, role, credentials.correo.clone());
        let token = generate_jwt(&claims)?;

        let usuario = users::find_profile(&self.pool, credentials.id_usuario)
            .await?
            .ok_or_else(|| ApiError::unauthorized(BAD_CREDENTIALS))?;

        tracing::info!("User {} logged in", credentials.id_usuario);
        Ok(Session {
            token,
            expires_in: claims.expires_in(),
            usuario,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            nombre: "Ana".to_string(),
            apellido: "Pérez".to_string(),
            correo: "ana@example.com".to_string(),
            contrasena: "contrasena-segura".to_string(),
            telefono: Some("  ".to_string()),
        }
    }

    #[test]
    fn valid_registration() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn registration_errors_are_per_field() {
        let bad = RegisterRequest {
            nombre: "A".to_string(),
            correo: "no-es-correo".to_string(),
            contrasena: "123".to_string(),
            telefono: Some("12".to_string()),
            ..request()
        };
        match bad.validate() {
            Err(ApiError::ValidationError {
                field_errors: Some(errors),
                ..
            }) => {
                assert!(errors.contains_key("nombre"));
                assert!(errors.contains_key("correo"));
                assert!(errors.contains_key("contrasena"));
                assert!(errors.contains_key("telefono"));
                assert!(!errors.contains_key("apellido"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let (state, _) = crate::testing::memory_state();
        let err = AccountService::new(&state)
            .login(LoginRequest {
                correo: String::new(),
                contrasena: String::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
