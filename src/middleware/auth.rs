use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Extension,
};

use crate::auth::{extract_token, validate_jwt, Role};
use crate::database::models::UserAccess;
use crate::database::repository::users;
use crate::error::ApiError;
use crate::state::AppState;

/// Caller resolved from the token and confirmed against the database
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: i32,
    pub nombre: String,
    pub apellido: String,
    pub correo: String,
    pub role: Role,
}

impl AuthUser {
    pub fn from_access(access: UserAccess) -> Result<Self, ApiError> {
        Ok(Self {
            role: Role::try_from(access.id_rol)?,
            id: access.id_usuario,
            nombre: access.nombre,
            apellido: access.apellido,
            correo: access.correo,
        })
    }

    /// Owner of the resource, or staff
    pub fn can_manage(&self, owner_id: i32) -> bool {
        self.id == owner_id || self.role.can_moderate()
    }

    /// At least `min` in the role hierarchy
    pub fn require_role(&self, min: Role, message: &str) -> Result<(), ApiError> {
        if self.role >= min {
            Ok(())
        } else {
            Err(ApiError::forbidden(message))
        }
    }

    pub fn require_event_creator(&self) -> Result<(), ApiError> {
        self.require_role(Role::Promotor, "Solo los promotores pueden crear eventos")
    }

    pub fn require_moderator(&self) -> Result<(), ApiError> {
        self.require_role(Role::Moderador, "Se requiere rol de moderador")
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require_role(Role::Administrador, "Se requiere rol de administrador")
    }
}

/// Validates the session token and injects [`AuthUser`].
///
/// The role comes from the database rather than the token, so role changes and
/// bans apply to sessions that are already open.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())?;
    let claims = validate_jwt(&token)?;

    let access = users::find_access(&state.pool, claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("La sesión ya no es válida"))?;

    if access.baneado {
        tracing::info!("Rejected request from banned user {}", access.id_usuario);
        return Err(ApiError::forbidden("Tu cuenta está suspendida"));
    }

    let user = AuthUser::from_access(access)?;
    tracing::debug!("Authenticated user {} ({})", user.id, user.role);
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Layered after [`require_auth`] on the admin routes
pub async fn require_moderator(
    Extension(user): Extension<AuthUser>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    user.require_moderator()?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i32, role: Role) -> AuthUser {
        AuthUser {
            id,
            nombre: "Ana".to_string(),
            apellido: "Pérez".to_string(),
            correo: "ana@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn owners_and_staff_can_manage() {
        assert!(user(1, Role::Promotor).can_manage(1));
        assert!(!user(1, Role::Promotor).can_manage(2));
        assert!(user(1, Role::Moderador).can_manage(2));
    }

    #[test]
    fn role_guards() {
        assert!(user(1, Role::Usuario).require_event_creator().is_err());
        assert!(user(1, Role::Promotor).require_event_creator().is_ok());
        assert!(user(1, Role::Promotor).require_moderator().is_err());
        assert!(user(1, Role::Moderador).require_admin().is_err());
        assert!(user(1, Role::Administrador).require_admin().is_ok());
    }

    #[test]
    fn builds_from_access_row() {
        let access = UserAccess {
            id_usuario: 9,
            nombre: "Luis".to_string(),
            apellido: "Gómez".to_string(),
            correo: "luis@example.com".to_string(),
            id_rol: 3,
            baneado: false,
        };
        let user = AuthUser::from_access(access).unwrap();
        assert_eq!(user.role, Role::Moderador);
        assert_eq!(user.apellido, "Gómez");

        let broken = UserAccess {
            id_usuario: 9,
            nombre: String::new(),
            apellido: String::new(),
            correo: String::new(),
            id_rol: 7,
            baneado: false,
        };
        assert!(AuthUser::from_access(broken).is_err());
    }
}
