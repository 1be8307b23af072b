use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::database::manager::DatabaseError;
use crate::database::models::Ban;

const BAN_SELECT: &str = "SELECT b.id_baneo, b.id_usuario,
    CONCAT(u.nombre, ' ', u.apellido) AS usuario, u.correo,
    b.id_moderador, NULLIF(CONCAT(m.nombre, ' ', m.apellido), ' ') AS moderador,
    b.motivo, b.fecha_inicio, b.fecha_fin,
    (b.activo AND (b.fecha_fin IS NULL OR b.fecha_fin > NOW())) AS activo
  FROM tabla_baneados b
  JOIN tabla_usuarios u ON u.id_usuario = b.id_usuario
  LEFT JOIN tabla_usuarios m ON m.id_usuario = b.id_moderador";

/// Callers hold the user row lock so two moderators cannot both insert
pub async fn insert(
    conn: &mut PgConnection,
    id_usuario: i32,
    id_moderador: i32,
    motivo: &str,
    fecha_fin: Option<DateTime<Utc>>,
) -> Result<Ban, DatabaseError> {
    let id: i32 = sqlx::query_scalar(
        "INSERT INTO tabla_baneados (id_usuario, id_moderador, motivo, fecha_fin)
         VALUES ($1, $2, $3, $4)
         RETURNING id_baneo",
    )
    .bind(id_usuario)
    .bind(id_moderador)
    .bind(motivo)
    .bind(fecha_fin)
    .fetch_one(&mut *conn)
    .await?;

    let sql = format!("{} WHERE b.id_baneo = $1", BAN_SELECT);
    let ban = sqlx::query_as::<_, Ban>(&sql).bind(id).fetch_one(&mut *conn).await?;
    Ok(ban)
}

/// Deactivate every ban still in force; returns how many were lifted
pub async fn lift(pool: &PgPool, id_usuario: i32) -> Result<u64, DatabaseError> {
    let result = sqlx::query(
        "UPDATE tabla_baneados SET activo = FALSE
         WHERE id_usuario = $1 AND activo AND (fecha_fin IS NULL OR fecha_fin > NOW())",
    )
    .bind(id_usuario)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Bans in force, most recent first; `incluir_historial` adds lifted and expired ones
pub async fn list(pool: &PgPool, incluir_historial: bool) -> Result<Vec<Ban>, DatabaseError> {
    let sql = format!(
        "{} WHERE $1 OR (b.activo AND (b.fecha_fin IS NULL OR b.fecha_fin > NOW()))
         ORDER BY b.fecha_inicio DESC, b.id_baneo DESC",
        BAN_SELECT
    );
    let bans = sqlx::query_as::<_, Ban>(&sql).bind(incluir_historial).fetch_all(pool).await?;
    Ok(bans)
}
