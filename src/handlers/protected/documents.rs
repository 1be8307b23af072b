// handlers/protected/documents.rs - GET /api/events/:id/documents/:doc_id
//
// Documents are never exposed by URL; they are streamed through here so
// access follows the event's visibility.

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension,
};

use crate::database::repository::events;
use crate::error::ApiError;
use crate::handlers::extract::ApiPath;
use crate::middleware::AuthUser;
use crate::state::AppState;

pub async fn download(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath((id_evento, id_documento)): ApiPath<(i32, i32)>,
) -> Result<Response, ApiError> {
    let not_found = || ApiError::not_found("Documento no encontrado");

    let event = events::find_row(&state.pool, id_evento).await?.ok_or_else(not_found)?;
    if !event.is_approved() && !user.can_manage(event.id_usuario) {
        return Err(not_found());
    }

    let file = events::find_document(&state.pool, id_evento, id_documento)
        .await?
        .ok_or_else(not_found)?;
    let object = state.storage.get(&file.clave).await?;

    let content_type = object
        .content_type
        .filter(|value| !value.is_empty())
        .unwrap_or(file.tipo_mime);

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_str(&content_type).unwrap_or(HeaderValue::from_static("application/octet-stream")),
        ),
        (
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&content_disposition(&file.nombre_archivo))
                .unwrap_or(HeaderValue::from_static("inline")),
        ),
    ];
    Ok((headers, object.bytes).into_response())
}

/// `inline; filename="..."` with quotes, control characters and non-ASCII removed
pub fn content_disposition(file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control() && *c != '"' && *c != '\\')
        .collect();
    let cleaned = cleaned.trim();
    let name = if cleaned.is_empty() { "documento.pdf" } else { cleaned };
    format!("inline; filename=\"{}\"", name)
}
