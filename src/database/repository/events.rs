use sqlx::{PgConnection, PgPool};

use crate::database::manager::DatabaseError;
use crate::database::models::{
    EventDetail, EventFields, EventFilter, EventRow, EventStatus, EventSummary, LinkInput, StoredFile, TicketInput,
};
use crate::database::repository::users::escape_like;
use crate::storage::StoredObject;

const SUMMARY_SELECT: &str = "SELECT e.id_evento, e.titulo, e.categoria, e.ciudad, e.lugar, e.fecha_inicio,
    e.fecha_fin, e.es_gratis, e.estado, e.aforo,
    (SELECT i.url FROM tabla_imagenes_eventos i
      WHERE i.id_evento = e.id_evento
      ORDER BY i.es_principal DESC, i.id_imagen LIMIT 1) AS imagen_principal,
    (SELECT MIN(b.precio) FROM tabla_boleteria b WHERE b.id_evento = e.id_evento) AS precio_minimo,
    (SELECT ROUND(AVG(v.puntuacion), 2)::FLOAT8 FROM tabla_valoraciones v
      WHERE v.id_evento = e.id_evento) AS promedio_valoracion,
    (SELECT COUNT(*) FROM tabla_reserva_eventos r WHERE r.id_evento = e.id_evento) AS total_reservas
  FROM tabla_eventos e";

const ROW_COLUMNS: &str = "id_evento, id_usuario, titulo, lugar, fecha_inicio, aforo, estado";

/// Approved events matching the catalog filters, soonest first
pub async fn list_public(
    pool: &PgPool,
    filter: &EventFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<EventSummary>, i64), DatabaseError> {
    let pattern = filter.q.as_deref().map(|q| format!("%{}%", escape_like(q)));

    let conditions = "e.estado = 'aprobado'
        AND ($1::TEXT IS NULL OR e.titulo ILIKE $1 OR e.descripcion ILIKE $1)
        AND ($2::TEXT IS NULL OR LOWER(e.categoria) = LOWER($2))
        AND ($3::TEXT IS NULL OR LOWER(e.ciudad) = LOWER($3))
        AND ($4::TIMESTAMPTZ IS NULL OR e.fecha_inicio >= $4)
        AND ($5::TIMESTAMPTZ IS NULL OR e.fecha_inicio <= $5)
        AND ($6 OR COALESCE(e.fecha_fin, e.fecha_inicio) >= NOW())
        AND (NOT $7 OR e.es_gratis)";

    let sql = format!(
        "{} WHERE {} ORDER BY e.fecha_inicio ASC, e.id_evento ASC LIMIT $8 OFFSET $9",
        SUMMARY_SELECT, conditions
    );
    let events = sqlx::query_as::<_, EventSummary>(&sql)
        .bind(&pattern)
        .bind(&filter.categoria)
        .bind(&filter.ciudad)
        .bind(filter.desde)
        .bind(filter.hasta)
        .bind(filter.incluir_pasados)
        .bind(filter.solo_gratis)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let count_sql = format!("SELECT COUNT(*) FROM tabla_eventos e WHERE {}", conditions);
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(&pattern)
        .bind(&filter.categoria)
        .bind(&filter.ciudad)
        .bind(filter.desde)
        .bind(filter.hasta)
        .bind(filter.incluir_pasados)
        .bind(filter.solo_gratis)
        .fetch_one(pool)
        .await?;

    Ok((events, total))
}

/// Every event the user organizes, in any state, newest first
pub async fn list_by_owner(pool: &PgPool, id_usuario: i32) -> Result<Vec<EventSummary>, DatabaseError> {
    let sql = format!(
        "{} WHERE e.id_usuario = $1 ORDER BY e.fecha_creacion DESC, e.id_evento DESC",
        SUMMARY_SELECT
    );
    let events = sqlx::query_as::<_, EventSummary>(&sql)
        .bind(id_usuario)
        .fetch_all(pool)
        .await?;
    Ok(events)
}

/// Moderation queue, oldest submissions first
pub async fn list_by_status(pool: &PgPool, status: EventStatus) -> Result<Vec<EventSummary>, DatabaseError> {
    let sql = format!(
        "{} WHERE e.estado = $1 ORDER BY e.fecha_creacion ASC, e.id_evento ASC",
        SUMMARY_SELECT
    );
    let events = sqlx::query_as::<_, EventSummary>(&sql)
        .bind(status.as_str())
        .fetch_all(pool)
        .await?;
    Ok(events)
}

pub async fn find_detail(pool: &PgPool, id_evento: i32) -> Result<Option<EventDetail>, DatabaseError> {
    let sql = "SELECT e.id_evento, e.id_usuario,
            COALESCE(CONCAT(u.nombre, ' ', u.apellido), '') AS organizador,
            e.titulo, e.descripcion, e.categoria, e.ciudad, e.lugar, e.direccion,
            e.fecha_inicio, e.fecha_fin, e.aforo, e.pulep, e.responsable, e.es_gratis,
            e.estado, e.motivo_estado, e.fecha_creacion, e.fecha_actualizacion,
            COALESCE(img.items, '[]'::JSON) AS imagenes,
            COALESCE(doc.items, '[]'::JSON) AS documentos,
            COALESCE(bol.items, '[]'::JSON) AS boletas,
            COALESCE(lnk.items, '[]'::JSON) AS links,
            COALESCE(inf.items, '[]'::JSON) AS informacion_importante,
            (SELECT COUNT(*) FROM tabla_reserva_eventos r WHERE r.id_evento = e.id_evento) AS total_reservas,
            val.promedio AS promedio_valoracion,
            COALESCE(val.total, 0) AS total_valoraciones
        FROM tabla_eventos e
        LEFT JOIN tabla_usuarios u ON u.id_usuario = e.id_usuario
        LEFT JOIN LATERAL (
            SELECT JSON_AGG(JSON_BUILD_OBJECT(
                'id_imagen', i.id_imagen, 'url', i.url, 'clave', i.clave,
                'nombre_archivo', i.nombre_archivo, 'tipo_mime', i.tipo_mime,
                'tamano', i.tamano, 'es_principal', i.es_principal
            ) ORDER BY i.es_principal DESC, i.id_imagen) AS items
            FROM tabla_imagenes_eventos i WHERE i.id_evento = e.id_evento
        ) img ON TRUE
        LEFT JOIN LATERAL (
            SELECT JSON_AGG(JSON_BUILD_OBJECT(
                'id_documento', d.id_documento, 'url', d.url, 'clave', d.clave,
                'nombre_archivo', d.nombre_archivo, 'tipo_mime', d.tipo_mime, 'tamano', d.tamano
            ) ORDER BY d.id_documento) AS items
            FROM tabla_documentos_eventos d WHERE d.id_evento = e.id_evento
        ) doc ON TRUE
        LEFT JOIN LATERAL (
            SELECT JSON_AGG(JSON_BUILD_OBJECT(
                'id_boleta', b.id_boleta, 'nombre', b.nombre, 'precio', b.precio::TEXT
            ) ORDER BY b.precio, b.id_boleta) AS items
            FROM tabla_boleteria b WHERE b.id_evento = e.id_evento
        ) bol ON TRUE
        LEFT JOIN LATERAL (
            SELECT JSON_AGG(JSON_BUILD_OBJECT(
                'id_link', l.id_link, 'url', l.url, 'descripcion', l.descripcion
            ) ORDER BY l.id_link) AS items
            FROM tabla_links l WHERE l.id_evento = e.id_evento
        ) lnk ON TRUE
        LEFT JOIN LATERAL (
            SELECT JSON_AGG(JSON_BUILD_OBJECT(
                'id_informacion', n.id_informacion, 'texto', n.texto
            ) ORDER BY n.orden, n.id_informacion) AS items
            FROM tabla_evento_informacion_importante n WHERE n.id_evento = e.id_evento
        ) inf ON TRUE
        LEFT JOIN LATERAL (
            SELECT ROUND(AVG(v.puntuacion), 2)::FLOAT8 AS promedio, COUNT(*) AS total
            FROM tabla_valoraciones v WHERE v.id_evento = e.id_evento
        ) val ON TRUE
        WHERE e.id_evento = $1";

    let detail = sqlx::query_as::<_, EventDetail>(sql)
        .bind(id_evento)
        .fetch_optional(pool)
        .await?;
    Ok(detail)
}

pub async fn find_row(pool: &PgPool, id_evento: i32) -> Result<Option<EventRow>, DatabaseError> {
    let sql = format!("SELECT {} FROM tabla_eventos WHERE id_evento = $1", ROW_COLUMNS);
    let row = sqlx::query_as::<_, EventRow>(&sql)
        .bind(id_evento)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Same as [`find_row`] but holds a row lock until the transaction ends
pub async fn lock_row(conn: &mut PgConnection, id_evento: i32) -> Result<Option<EventRow>, DatabaseError> {
    let sql = format!("SELECT {} FROM tabla_eventos WHERE id_evento = $1 FOR UPDATE", ROW_COLUMNS);
    let row = sqlx::query_as::<_, EventRow>(&sql)
        .bind(id_evento)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn insert_event(
    conn: &mut PgConnection,
    id_usuario: i32,
    fields: &EventFields,
    status: EventStatus,
) -> Result<i32, DatabaseError> {
    let id: i32 = sqlx::query_scalar(
        "INSERT INTO tabla_eventos (
            id_usuario, titulo, descripcion, categoria, ciudad, lugar, direccion,
            fecha_inicio, fecha_fin, aforo, pulep, responsable, es_gratis, estado
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING id_evento",
    )
    .bind(id_usuario)
    .bind(&fields.titulo)
    .bind(&fields.descripcion)
    .bind(&fields.categoria)
    .bind(&fields.ciudad)
    .bind(&fields.lugar)
    .bind(&fields.direccion)
    .bind(fields.fecha_inicio)
    .bind(fields.fecha_fin)
    .bind(fields.aforo)
    .bind(&fields.pulep)
    .bind(&fields.responsable)
    .bind(fields.es_gratis)
    .bind(status.as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

pub async fn update_event(conn: &mut PgConnection, id_evento: i32, fields: &EventFields) -> Result<(), DatabaseError> {
    sqlx::query(
        "UPDATE tabla_eventos SET
            titulo = $2, descripcion = $3, categoria = $4, ciudad = $5, lugar = $6, direccion = $7,
            fecha_inicio = $8, fecha_fin = $9, aforo = $10, pulep = $11, responsable = $12,
            es_gratis = $13, fecha_actualizacion = NOW()
        WHERE id_evento = $1",
    )
    .bind(id_evento)
    .bind(&fields.titulo)
    .bind(&fields.descripcion)
    .bind(&fields.categoria)
    .bind(&fields.ciudad)
    .bind(&fields.lugar)
    .bind(&fields.direccion)
    .bind(fields.fecha_inicio)
    .bind(fields.fecha_fin)
    .bind(fields.aforo)
    .bind(&fields.pulep)
    .bind(&fields.responsable)
    .bind(fields.es_gratis)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn replace_tickets(
    conn: &mut PgConnection,
    id_evento: i32,
    tickets: &[TicketInput],
) -> Result<(), DatabaseError> {
    sqlx::query("DELETE FROM tabla_boleteria WHERE id_evento = $1")
        .bind(id_evento)
        .execute(&mut *conn)
        .await?;

    for ticket in tickets {
        sqlx::query("INSERT INTO tabla_boleteria (id_evento, nombre, precio) VALUES ($1, $2, $3)")
            .bind(id_evento)
            .bind(&ticket.nombre)
            .bind(ticket.precio)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn replace_links(conn: &mut PgConnection, id_evento: i32, links: &[LinkInput]) -> Result<(), DatabaseError> {
    sqlx::query("DELETE FROM tabla_links WHERE id_evento = $1")
        .bind(id_evento)
        .execute(&mut *conn)
        .await?;

    for link in links {
        sqlx::query("INSERT INTO tabla_links (id_evento, url, descripcion) VALUES ($1, $2, $3)")
            .bind(id_evento)
            .bind(&link.url)
            .bind(&link.descripcion)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn replace_notices(conn: &mut PgConnection, id_evento: i32, notices: &[String]) -> Result<(), DatabaseError> {
    sqlx::query("DELETE FROM tabla_evento_informacion_importante WHERE id_evento = $1")
        .bind(id_evento)
        .execute(&mut *conn)
        .await?;

    for (orden, texto) in notices.iter().enumerate() {
        sqlx::query(
            "INSERT INTO tabla_evento_informacion_importante (id_evento, texto, orden) VALUES ($1, $2, $3)",
        )
        .bind(id_evento)
        .bind(texto)
        .bind(orden as i16)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn insert_images(
    conn: &mut PgConnection,
    id_evento: i32,
    images: &[StoredObject],
) -> Result<(), DatabaseError> {
    for image in images {
        sqlx::query(
            "INSERT INTO tabla_imagenes_eventos (id_evento, url, clave, nombre_archivo, tipo_mime, tamano)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id_evento)
        .bind(&image.url)
        .bind(&image.key)
        .bind(&image.file_name)
        .bind(&image.content_type)
        .bind(image.size)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn insert_documents(
    conn: &mut PgConnection,
    id_evento: i32,
    documents: &[StoredObject],
) -> Result<(), DatabaseError> {
    for document in documents {
        sqlx::query(
            "INSERT INTO tabla_documentos_eventos (id_evento, url, clave, nombre_archivo, tipo_mime, tamano)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id_evento)
        .bind(&document.url)
        .bind(&document.key)
        .bind(&document.file_name)
        .bind(&document.content_type)
        .bind(document.size)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Delete the event's images not listed in `keep`, returning the storage keys removed
pub async fn remove_images_except(
    conn: &mut PgConnection,
    id_evento: i32,
    keep: &[i32],
) -> Result<Vec<String>, DatabaseError> {
    let keys = sqlx::query_scalar(
        "DELETE FROM tabla_imagenes_eventos
         WHERE id_evento = $1 AND NOT (id_imagen = ANY($2))
         RETURNING clave",
    )
    .bind(id_evento)
    .bind(keep)
    .fetch_all(&mut *conn)
    .await?;
    Ok(keys)
}

pub async fn remove_documents_except(
    conn: &mut PgConnection,
    id_evento: i32,
    keep: &[i32],
) -> Result<Vec<String>, DatabaseError> {
    let keys = sqlx::query_scalar(
        "DELETE FROM tabla_documentos_eventos
         WHERE id_evento = $1 AND NOT (id_documento = ANY($2))
         RETURNING clave",
    )
    .bind(id_evento)
    .bind(keep)
    .fetch_all(&mut *conn)
    .await?;
    Ok(keys)
}

pub async fn count_images(conn: &mut PgConnection, id_evento: i32) -> Result<i64, DatabaseError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM tabla_imagenes_eventos WHERE id_evento = $1")
        .bind(id_evento)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn count_documents(conn: &mut PgConnection, id_evento: i32) -> Result<i64, DatabaseError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM tabla_documentos_eventos WHERE id_evento = $1")
        .bind(id_evento)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// The oldest remaining image is always the main one
pub async fn refresh_main_image(conn: &mut PgConnection, id_evento: i32) -> Result<(), DatabaseError> {
    sqlx::query(
        "UPDATE tabla_imagenes_eventos
         SET es_principal = (id_imagen = (
             SELECT MIN(id_imagen) FROM tabla_imagenes_eventos WHERE id_evento = $1
         ))
         WHERE id_evento = $1",
    )
    .bind(id_evento)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Delete the event and return the storage keys of every file it owned
pub async fn delete_event(conn: &mut PgConnection, id_evento: i32) -> Result<Vec<String>, DatabaseError> {
    let keys: Vec<String> = sqlx::query_scalar(
        "SELECT clave FROM tabla_imagenes_eventos WHERE id_evento = $1
         UNION ALL
         SELECT clave FROM tabla_documentos_eventos WHERE id_evento = $1",
    )
    .bind(id_evento)
    .fetch_all(&mut *conn)
    .await?;

    let result = sqlx::query("DELETE FROM tabla_eventos WHERE id_evento = $1")
        .bind(id_evento)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound("Evento no encontrado".to_string()));
    }
    Ok(keys)
}

/// Record a moderation decision; `None` when the event does not exist
pub async fn set_status(
    pool: &PgPool,
    id_evento: i32,
    status: EventStatus,
    motivo: Option<&str>,
) -> Result<Option<EventRow>, DatabaseError> {
    let sql = format!(
        "UPDATE tabla_eventos
         SET estado = $2, motivo_estado = $3, fecha_actualizacion = NOW()
         WHERE id_evento = $1
         RETURNING {}",
        ROW_COLUMNS
    );
    let row = sqlx::query_as::<_, EventRow>(&sql)
        .bind(id_evento)
        .bind(status.as_str())
        .bind(motivo)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_document(
    pool: &PgPool,
    id_evento: i32,
    id_documento: i32,
) -> Result<Option<StoredFile>, DatabaseError> {
    let row = sqlx::query_as::<_, StoredFile>(
        "SELECT clave, nombre_archivo, tipo_mime
         FROM tabla_documentos_eventos
         WHERE id_evento = $1 AND id_documento = $2",
    )
    .bind(id_evento)
    .bind(id_documento)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
