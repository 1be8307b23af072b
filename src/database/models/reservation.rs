use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Reservation {
    pub id_reserva: i32,
    pub id_usuario: i32,
    pub id_evento: i32,
    pub fecha_reserva: DateTime<Utc>,
}

/// A reservation joined with the event it belongs to
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserReservation {
    pub id_reserva: i32,
    pub fecha_reserva: DateTime<Utc>,
    pub id_evento: i32,
    pub titulo: String,
    pub ciudad: String,
    pub lugar: String,
    pub fecha_inicio: DateTime<Utc>,
    pub estado: String,
    pub imagen_principal: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Attendee {
    pub id_reserva: i32,
    pub id_usuario: i32,
    pub nombre: String,
    pub apellido: String,
    pub correo: String,
    pub telefono: Option<String>,
    pub fecha_reserva: DateTime<Utc>,
}
