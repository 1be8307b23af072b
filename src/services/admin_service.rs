use chrono::{Duration, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::{Page, PageQuery, Pagination};
use crate::auth::Role;
use crate::config;
use crate::database::models::{Ban, EventStatus, EventSummary, UserListItem, UserProfile};
use crate::database::repository::{bans, events, users};
use crate::error::ApiError;
use crate::mail::{self, templates, Mailer};
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::validation::{non_blank, FieldErrors};

/// Longest temporary ban; anything longer should be permanent
pub const MAX_BAN_DAYS: i64 = 3650;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserSearch {
    pub q: Option<String>,
    pub rol: Option<i16>,
    pub pagina: Option<i64>,
    pub por_pagina: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleChange {
    pub id_rol: i16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BanRequest {
    #[serde(default)]
    pub motivo: String,
    pub dias: Option<i64>,
}

impl BanRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.check_length("motivo", &self.motivo, 10, 500);
        if let Some(dias) = self.dias {
            errors.check_range("dias", dias, 1, MAX_BAN_DAYS);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub estado: String,
    pub motivo: Option<String>,
}

impl StatusChange {
    /// Only final decisions are accepted, and a rejection must explain itself
    pub fn validate(&self) -> Result<(EventStatus, Option<String>), ApiError> {
        let estado = match self.estado.parse::<EventStatus>() {
            Ok(EventStatus::Pendiente) | Err(_) => {
                return Err(ApiError::field_error("estado", "Debe ser 'aprobado' o 'rechazado'"));
            }
            Ok(estado) => estado,
        };

        let motivo = non_blank(self.motivo.as_deref());
        let mut errors = FieldErrors::new();
        match (&estado, &motivo) {
            (EventStatus::Rechazado, None) => errors.add("motivo", "Indica el motivo del rechazo"),
            (_, Some(motivo)) => errors.check_length("motivo", motivo, 10, 500),
            _ => {}
        }
        errors.into_result()?;
        Ok((estado, motivo))
    }
}

pub struct AdminService {
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
}

impl AdminService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            mailer: state.mailer.clone(),
        }
    }

    pub async fn list_users(&self, search: UserSearch) -> Result<Page<UserListItem>, ApiError> {
        let role = search
            .rol
            .map(Role::try_from)
            .transpose()
            .map_err(|_| ApiError::field_error("rol", "Rol inválido"))?;
        let page = PageQuery {
            pagina: search.pagina,
            por_pagina: search.por_pagina,
        };
        let pagination = Pagination::resolve(page, &config::config().listing);
        let q = non_blank(search.q.as_deref());

        let (items, total) =
            users::list_users(&self.pool, q.as_deref(), role, pagination.limit(), pagination.offset()).await?;
        Ok(Page::new("usuarios", items, pagination, total))
    }

    pub async fn set_role(&self, actor: &AuthUser, id_usuario: i32, change: RoleChange) -> Result<UserProfile, ApiError> {
        actor.require_admin()?;
        if actor.id == id_usuario {
            return Err(ApiError::forbidden("No puedes cambiar tu propio rol"));
        }
        let role = Role::try_from(change.id_rol).map_err(|_| ApiError::field_error("id_rol", "Rol inválido"))?;

        let profile = users::set_role(&self.pool, id_usuario, role)
            .await?
            .ok_or_else(|| ApiError::not_found("Usuario no encontrado"))?;

        tracing::info!("Admin {} set role of user {} to {}", actor.id, id_usuario, role);
        Ok(profile)
    }

    pub async fn ban(&self, actor: &AuthUser, id_usuario: i32, request: BanRequest) -> Result<Ban, ApiError> {
        request.validate()?;
        if actor.id == id_usuario {
            return Err(ApiError::forbidden("No puedes sancionarte a ti mismo"));
        }

        let mut tx = self.pool.begin().await?;

        // The row lock makes the active-ban check and the insert atomic
        let target = users::lock_access(&mut tx, id_usuario)
            .await?
            .ok_or_else(|| ApiError::not_found("Usuario no encontrado"))?;
        let target_role = Role::try_from(target.id_rol)?;
        if !actor.role.can_ban(target_role) {
            return Err(ApiError::forbidden("No puedes sancionar a un usuario con un rol igual o superior"));
        }
        if target.baneado {
            return Err(ApiError::conflict("El usuario ya tiene una sanción activa"));
        }

        let until = request.dias.map(|dias| Utc::now() + Duration::days(dias));
        let motivo = request.motivo.trim();
        let ban = bans::insert(&mut tx, id_usuario, actor.id, motivo, until).await?;
        tx.commit().await?;

        tracing::info!(
            "User {} banned user {} until {}",
            actor.id,
            id_usuario,
            until.map(|u| u.to_rfc3339()).unwrap_or_else(|| "forever".to_string())
        );
        mail::notify(
            self.mailer.clone(),
            templates::account_banned(&target.correo, &target.nombre, motivo, until),
        );
        Ok(ban)
    }

    pub async fn unban(&self, actor: &AuthUser, id_usuario: i32) -> Result<(), ApiError> {
        let lifted = bans::lift(&self.pool, id_usuario).await?;
        if lifted == 0 {
            return Err(ApiError::not_found("El usuario no tiene sanciones activas"));
        }
        tracing::info!("User {} lifted {} ban(s) of user {}", actor.id, lifted, id_usuario);
        Ok(())
    }

    pub async fn list_bans(&self, incluir_historial: bool) -> Result<Vec<Ban>, ApiError> {
        Ok(bans::list(&self.pool, incluir_historial).await?)
    }

    pub async fn events_by_status(&self, estado: Option<&str>) -> Result<Vec<EventSummary>, ApiError> {
        let status = match non_blank(estado) {
            None => EventStatus::Pendiente,
            Some(raw) => raw
                .parse::<EventStatus>()
                .map_err(|_| ApiError::field_error("estado", "Estado inválido"))?,
        };
        Ok(events::list_by_status(&self.pool, status).await?)
    }

    pub async fn set_event_status(
        &self,
        actor: &AuthUser,
        id_evento: i32,
        change: StatusChange,
    ) -> Result<EventStatus, ApiError> {
        let (status, motivo) = change.validate()?;

        let event = events::set_status(&self.pool, id_evento, status, motivo.as_deref())
            .await?
            .ok_or_else(|| ApiError::not_found("Evento no encontrado"))?;

        tracing::info!("User {} marked event {} as {}", actor.id, id_evento, status);

        if let Some(owner) = users::find_profile(&self.pool, event.id_usuario).await? {
            mail::notify(
                self.mailer.clone(),
                templates::event_status_changed(
                    &owner.correo,
                    &owner.nombre,
                    &event.titulo,
                    status.as_str(),
                    motivo.as_deref(),
                ),
            );
        }
        Ok(status)
    }
}
