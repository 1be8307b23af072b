use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::Rating;

const RATING_COLUMNS: &str = "v.id_valoracion, v.id_evento, v.id_usuario,
    CONCAT(u.nombre, ' ', u.apellido) AS autor, v.puntuacion, v.comentario, v.fecha";

pub async fn list_for_event(pool: &PgPool, id_evento: i32) -> Result<Vec<Rating>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM tabla_valoraciones v
         JOIN tabla_usuarios u ON u.id_usuario = v.id_usuario
         WHERE v.id_evento = $1
         ORDER BY v.fecha DESC, v.id_valoracion DESC",
        RATING_COLUMNS
    );
    let rows = sqlx::query_as::<_, Rating>(&sql).bind(id_evento).fetch_all(pool).await?;
    Ok(rows)
}

/// Insert or replace the user's rating for the event
pub async fn upsert(
    pool: &PgPool,
    id_usuario: i32,
    id_evento: i32,
    puntuacion: i16,
    comentario: Option<&str>,
) -> Result<Rating, DatabaseError> {
    let sql = format!(
        "WITH v AS (
            INSERT INTO tabla_valoraciones (id_usuario, id_evento, puntuacion, comentario)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id_usuario, id_evento)
            DO UPDATE SET puntuacion = EXCLUDED.puntuacion, comentario = EXCLUDED.comentario, fecha = NOW()
            RETURNING *
        )
        SELECT {} FROM v JOIN tabla_usuarios u ON u.id_usuario = v.id_usuario",
        RATING_COLUMNS
    );
    let row = sqlx::query_as::<_, Rating>(&sql)
        .bind(id_usuario)
        .bind(id_evento)
        .bind(puntuacion)
        .bind(comentario)
        .fetch_one(pool)
        .await?;
    Ok(row)
}
