use sqlx::{PgConnection, PgPool};

use crate::database::manager::DatabaseError;
use crate::database::models::{Attendee, Reservation, UserReservation};

pub async fn count_for_event(conn: &mut PgConnection, id_evento: i32) -> Result<i64, DatabaseError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM tabla_reserva_eventos WHERE id_evento = $1")
        .bind(id_evento)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn find_for_user(
    conn: &mut PgConnection,
    id_usuario: i32,
    id_evento: i32,
) -> Result<Option<Reservation>, DatabaseError> {
    let row = sqlx::query_as::<_, Reservation>(
        "SELECT id_reserva, id_usuario, id_evento, fecha_reserva
         FROM tabla_reserva_eventos
         WHERE id_usuario = $1 AND id_evento = $2",
    )
    .bind(id_usuario)
    .bind(id_evento)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// `None` when the user already holds a reservation for the event
pub async fn insert(
    conn: &mut PgConnection,
    id_usuario: i32,
    id_evento: i32,
) -> Result<Option<Reservation>, DatabaseError> {
    let row = sqlx::query_as::<_, Reservation>(
        "INSERT INTO tabla_reserva_eventos (id_usuario, id_evento)
         VALUES ($1, $2)
         ON CONFLICT (id_usuario, id_evento) DO NOTHING
         RETURNING id_reserva, id_usuario, id_evento, fecha_reserva",
    )
    .bind(id_usuario)
    .bind(id_evento)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn list_for_user(pool: &PgPool, id_usuario: i32) -> Result<Vec<UserReservation>, DatabaseError> {
    let rows = sqlx::query_as::<_, UserReservation>(
        "SELECT r.id_reserva, r.fecha_reserva, e.id_evento, e.titulo, e.ciudad, e.lugar, e.fecha_inicio, e.estado,
            (SELECT i.url FROM tabla_imagenes_eventos i
              WHERE i.id_evento = e.id_evento
              ORDER BY i.es_principal DESC, i.id_imagen LIMIT 1) AS imagen_principal
         FROM tabla_reserva_eventos r
         JOIN tabla_eventos e ON e.id_evento = r.id_evento
         WHERE r.id_usuario = $1
         ORDER BY e.fecha_inicio ASC, r.id_reserva ASC",
    )
    .bind(id_usuario)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Reservation owned by `id_usuario` together with its event
pub async fn find_owned(
    pool: &PgPool,
    id_reserva: i32,
    id_usuario: i32,
) -> Result<Option<UserReservation>, DatabaseError> {
    let row = sqlx::query_as::<_, UserReservation>(
        "SELECT r.id_reserva, r.fecha_reserva, e.id_evento, e.titulo, e.ciudad, e.lugar, e.fecha_inicio, e.estado,
            NULL::TEXT AS imagen_principal
         FROM tabla_reserva_eventos r
         JOIN tabla_eventos e ON e.id_evento = r.id_evento
         WHERE r.id_reserva = $1 AND r.id_usuario = $2",
    )
    .bind(id_reserva)
    .bind(id_usuario)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete(pool: &PgPool, id_reserva: i32, id_usuario: i32) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM tabla_reserva_eventos WHERE id_reserva = $1 AND id_usuario = $2")
        .bind(id_reserva)
        .bind(id_usuario)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_attendees(pool: &PgPool, id_evento: i32) -> Result<Vec<Attendee>, DatabaseError> {
    let rows = sqlx::query_as::<_, Attendee>(
        "SELECT r.id_reserva, u.id_usuario, u.nombre, u.apellido, u.correo, u.telefono, r.fecha_reserva
         FROM tabla_reserva_eventos r
         JOIN tabla_usuarios u ON u.id_usuario = r.id_usuario
         WHERE r.id_evento = $1
         ORDER BY r.fecha_reserva ASC, r.id_reserva ASC",
    )
    .bind(id_evento)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
