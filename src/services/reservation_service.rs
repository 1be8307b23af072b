use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;

use crate::config;
use crate::database::manager::DatabaseError;
use crate::database::models::{Attendee, Reservation, UserReservation};
use crate::database::repository::{events, reservations};
use crate::error::ApiError;
use crate::mail::{self, templates, Mailer};
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("event {0} not found")]
    EventNotFound(i32),

    #[error("event {0} is not open for reservations")]
    NotApproved(i32),

    #[error("event {0} already started")]
    AlreadyStarted(i32),

    #[error("event {0} is full")]
    Full(i32),

    #[error("reservation {0} not found")]
    NotFound(i32),

    #[error("cancellation window of {0}h has closed")]
    WindowClosed(i64),

    #[error("user {0} may not view attendees of event {1}")]
    Forbidden(i32, i32),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for ReservationError {
    fn from(err: sqlx::Error) -> Self {
        ReservationError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<ReservationError> for ApiError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::EventNotFound(_) | ReservationError::NotApproved(_) => {
                ApiError::not_found("Evento no encontrado")
            }
            ReservationError::AlreadyStarted(_) => ApiError::conflict("El evento ya comenzó"),
            ReservationError::Full(_) => ApiError::conflict("El evento no tiene cupos disponibles"),
            ReservationError::NotFound(_) => ApiError::not_found("Reserva no encontrada"),
            ReservationError::WindowClosed(hours) => ApiError::conflict(format!(
                "Solo puedes cancelar hasta {} horas antes del inicio del evento",
                hours
            )),
            ReservationError::Forbidden(..) => {
                ApiError::forbidden("No tienes permiso para ver las reservas de este evento")
            }
            ReservationError::Database(e) => e.into(),
        }
    }
}

/// Cancellation is allowed up to and including `start - window`
pub fn can_cancel(start: DateTime<Utc>, now: DateTime<Utc>, window_hours: i64) -> bool {
    now <= start - Duration::hours(window_hours)
}

/// Result of a reservation request; `creada` is false when it already existed
#[derive(Debug, Serialize)]
pub struct ReservationOutcome {
    #[serde(flatten)]
    pub reserva: Reservation,
    pub creada: bool,
}

#[derive(Debug, Serialize)]
pub struct ReservationView {
    #[serde(flatten)]
    pub reserva: UserReservation,
    pub puede_cancelar: bool,
}

pub struct ReservationService {
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
}

impl ReservationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            mailer: state.mailer.clone(),
        }
    }

    fn window_hours() -> i64 {
        config::config().reservations.cancellation_window_hours
    }

    pub async fn reserve(&self, user: &AuthUser, id_evento: i32) -> Result<ReservationOutcome, ReservationError> {
        let mut tx = self.pool.begin().await?;

        // The row lock serializes concurrent reservations for the same event
        let event = events::lock_row(&mut tx, id_evento)
            .await?
            .ok_or(ReservationError::EventNotFound(id_evento))?;
        if !event.is_approved() {
            return Err(ReservationError::NotApproved(id_evento));
        }
        if event.fecha_inicio <= Utc::now() {
            return Err(ReservationError::AlreadyStarted(id_evento));
        }

        if let Some(existing) = reservations::find_for_user(&mut tx, user.id, id_evento).await? {
            return Ok(ReservationOutcome {
                reserva: existing,
                creada: false,
            });
        }

        if let Some(aforo) = event.aforo {
            let taken = reservations::count_for_event(&mut tx, id_evento).await?;
            if taken >= aforo as i64 {
                return Err(ReservationError::Full(id_evento));
            }
        }

        let outcome = match reservations::insert(&mut tx, user.id, id_evento).await? {
            Some(reserva) => ReservationOutcome { reserva, creada: true },
            None => {
                let reserva = reservations::find_for_user(&mut tx, user.id, id_evento)
                    .await?
                    .ok_or(ReservationError::EventNotFound(id_evento))?;
                ReservationOutcome { reserva, creada: false }
            }
        };
        tx.commit().await?;

        if outcome.creada {
            tracing::info!("User {} reserved event {}", user.id, id_evento);
            mail::notify(
                self.mailer.clone(),
                templates::reservation_confirmed(
                    &user.correo,
                    &user.nombre,
                    &event.titulo,
                    event.fecha_inicio,
                    &event.lugar,
                    Self::window_hours(),
                ),
            );
        }

        Ok(outcome)
    }

    pub async fn list_for_user(&self, user: &AuthUser) -> Result<Vec<ReservationView>, ReservationError> {
        let now = Utc::now();
        let window = Self::window_hours();
        let rows = reservations::list_for_user(&self.pool, user.id).await?;
        Ok(rows
            .into_iter()
            .map(|reserva| ReservationView {
                puede_cancelar: can_cancel(reserva.fecha_inicio, now, window),
                reserva,
            })
            .collect())
    }

    pub async fn cancel(&self, user: &AuthUser, id_reserva: i32) -> Result<(), ReservationError> {
        let reserva = reservations::find_owned(&self.pool, id_reserva, user.id)
            .await?
            .ok_or(ReservationError::NotFound(id_reserva))?;

        let window = Self::window_hours();
        if !can_cancel(reserva.fecha_inicio, Utc::now(), window) {
            return Err(ReservationError::WindowClosed(window));
        }

        if !reservations::delete(&self.pool, id_reserva, user.id).await? {
            return Err(ReservationError::NotFound(id_reserva));
        }

        tracing::info!("User {} cancelled reservation {}", user.id, id_reserva);
        mail::notify(
            self.mailer.clone(),
            templates::reservation_cancelled(&user.correo, &user.nombre, &reserva.titulo),
        );
        Ok(())
    }

    pub async fn attendees(&self, user: &AuthUser, id_evento: i32) -> Result<Vec<Attendee>, ReservationError> {
        let event = events::find_row(&self.pool, id_evento)
            .await?
            .ok_or(ReservationError::EventNotFound(id_evento))?;
        if !user.can_manage(event.id_usuario) {
            return Err(ReservationError::Forbidden(user.id, id_evento));
        }
        Ok(reservations::list_attendees(&self.pool, id_evento).await?)
    }
}
