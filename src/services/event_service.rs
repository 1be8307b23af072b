//! Event writes.
//!
//! Files are uploaded before the transaction opens. If anything fails after
//! that, the transaction is rolled back (dropped) and the objects uploaded for
//! this request are removed. Objects belonging to rows deleted by a successful
//! write are removed only after commit.

use futures::future::join_all;
use sqlx::PgPool;
use std::sync::Arc;

use crate::config;
use crate::database::manager::DatabaseError;
use crate::database::models::{EventDetail, EventFields, EventRow, EventStatus};
use crate::database::repository::events;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::event_form::{UploadedFile, ValidatedEvent};
use crate::state::AppState;
use crate::storage::{self, ObjectKind, Storage, StorageError, StoredObject};

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event {0} not found")]
    NotFound(i32),

    #[error("user {0} may not modify event {1}")]
    Forbidden(i32, i32),

    #[error("role may not create events")]
    CannotCreate,

    #[error("event would have more than {0} images")]
    TooManyImages(usize),

    #[error("event would have more than {0} documents")]
    TooManyDocuments(usize),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for EventError {
    fn from(err: sqlx::Error) -> Self {
        EventError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<EventError> for ApiError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::NotFound(_) => ApiError::not_found("Evento no encontrado"),
            EventError::Forbidden(..) => ApiError::forbidden("No tienes permiso para modificar este evento"),
            EventError::CannotCreate => ApiError::forbidden("Solo los promotores pueden crear eventos"),
            EventError::TooManyImages(max) => {
                ApiError::field_error("imagenes", format!("Máximo {} imágenes por evento", max))
            }
            EventError::TooManyDocuments(max) => {
                ApiError::field_error("documentos", format!("Máximo {} documentos por evento", max))
            }
            EventError::Storage(e) => {
                tracing::error!("Upload failed: {}", e);
                ApiError::bad_gateway("No se pudieron guardar los archivos")
            }
            EventError::Database(e) => e.into(),
        }
    }
}

/// Objects uploaded while handling one request
#[derive(Debug, Default)]
struct Uploads {
    images: Vec<StoredObject>,
    documents: Vec<StoredObject>,
}

impl Uploads {
    fn keys(&self) -> Vec<String> {
        self.images
            .iter()
            .chain(self.documents.iter())
            .map(|object| object.key.clone())
            .collect()
    }
}

pub struct EventService {
    pool: PgPool,
    storage: Arc<dyn Storage>,
}

impl EventService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            storage: state.storage.clone(),
        }
    }

    /// Promoters submit for review; staff publish directly
    pub fn initial_status(user: &AuthUser) -> EventStatus {
        if user.role.can_moderate() {
            EventStatus::Aprobado
        } else {
            EventStatus::Pendiente
        }
    }

    pub async fn create(&self, user: &AuthUser, event: ValidatedEvent) -> Result<EventDetail, EventError> {
        if !user.role.can_create_events() {
            return Err(EventError::CannotCreate);
        }

        let status = Self::initial_status(user);
        let uploads = self.upload_files(event.imagenes, event.documentos).await?;

        let id = match self.insert_rows(user.id, status, &event.fields, &uploads).await {
            Ok(id) => id,
            Err(e) => {
                self.discard(&uploads).await;
                return Err(e);
            }
        };

        tracing::info!(
            "User {} created event {} ({}) with {} images and {} documents",
            user.id,
            id,
            status,
            uploads.images.len(),
            uploads.documents.len()
        );

        self.detail(id).await
    }

    pub async fn update(&self, user: &AuthUser, id: i32, event: ValidatedEvent) -> Result<EventDetail, EventError> {
        let existing = self.find_managed(user, id).await?;

        let uploads = self.upload_files(event.imagenes, event.documentos).await?;

        let removed = match self
            .update_rows(
                existing.id_evento,
                &event.fields,
                &uploads,
                event.imagenes_conservar.as_deref(),
                event.documentos_conservar.as_deref(),
            )
            .await
        {
            Ok(removed) => removed,
            Err(e) => {
                self.discard(&uploads).await;
                return Err(e);
            }
        };

        storage::delete_all(self.storage.as_ref(), &removed).await;
        tracing::info!(
            "User {} updated event {} (+{} files, -{} files)",
            user.id,
            id,
            uploads.images.len() + uploads.documents.len(),
            removed.len()
        );

        self.detail(id).await
    }

    pub async fn delete(&self, user: &AuthUser, id: i32) -> Result<(), EventError> {
        let existing = self.find_managed(user, id).await?;

        let mut tx = self.pool.begin().await?;
        let keys = events::delete_event(&mut tx, existing.id_evento).await?;
        tx.commit().await?;

        storage::delete_all(self.storage.as_ref(), &keys).await;
        tracing::info!("User {} deleted event {} ({} files)", user.id, id, keys.len());
        Ok(())
    }

    /// Event row if the caller owns it or is staff
    pub async fn find_managed(&self, user: &AuthUser, id: i32) -> Result<EventRow, EventError> {
        let row = events::find_row(&self.pool, id).await?.ok_or(EventError::NotFound(id))?;
        if !user.can_manage(row.id_usuario) {
            return Err(EventError::Forbidden(user.id, id));
        }
        Ok(row)
    }

    async fn detail(&self, id: i32) -> Result<EventDetail, EventError> {
        events::find_detail(&self.pool, id).await?.ok_or(EventError::NotFound(id))
    }

    async fn insert_rows(
        &self,
        owner: i32,
        status: EventStatus,
        fields: &EventFields,
        uploads: &Uploads,
    ) -> Result<i32, EventError> {
        let mut tx = self.pool.begin().await?;

        let id = events::insert_event(&mut tx, owner, fields, status).await?;
        events::replace_tickets(&mut tx, id, &fields.boletas).await?;
        events::replace_links(&mut tx, id, &fields.links).await?;
        events::replace_notices(&mut tx, id, &fields.informacion_importante).await?;
        events::insert_images(&mut tx, id, &uploads.images).await?;
        events::insert_documents(&mut tx, id, &uploads.documents).await?;
        events::refresh_main_image(&mut tx, id).await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Returns the storage keys of image/document rows that were removed
    async fn update_rows(
        &self,
        id: i32,
        fields: &EventFields,
        uploads: &Uploads,
        keep_images: Option<&[i32]>,
        keep_documents: Option<&[i32]>,
    ) -> Result<Vec<String>, EventError> {
        let limits = &config::config().uploads;
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent edits of the same event
        events::lock_row(&mut tx, id).await?.ok_or(EventError::NotFound(id))?;

        events::update_event(&mut tx, id, fields).await?;
        events::replace_tickets(&mut tx, id, &fields.boletas).await?;
        events::replace_links(&mut tx, id, &fields.links).await?;
        events::replace_notices(&mut tx, id, &fields.informacion_importante).await?;

        let mut removed = Vec::new();
        if let Some(keep) = keep_images {
            removed.extend(events::remove_images_except(&mut tx, id, keep).await?);
        }
        if let Some(keep) = keep_documents {
            removed.extend(events::remove_documents_except(&mut tx, id, keep).await?);
        }

        events::insert_images(&mut tx, id, &uploads.images).await?;
        events::insert_documents(&mut tx, id, &uploads.documents).await?;

        if events::count_images(&mut tx, id).await? > limits.max_images_per_event as i64 {
            return Err(EventError::TooManyImages(limits.max_images_per_event));
        }
        if events::count_documents(&mut tx, id).await? > limits.max_documents_per_event as i64 {
            return Err(EventError::TooManyDocuments(limits.max_documents_per_event));
        }

        events::refresh_main_image(&mut tx, id).await?;

        tx.commit().await?;
        Ok(removed)
    }

    /// Upload everything concurrently; on any failure the successful ones are removed
    async fn upload_files(&self, images: Vec<UploadedFile>, documents: Vec<UploadedFile>) -> Result<Uploads, EventError> {
        let store = self.storage.as_ref();
        let image_results = join_all(images.into_iter().map(|file| async move {
            storage::upload(store, ObjectKind::Image, &file.file_name, &file.content_type, file.bytes.clone()).await
        }));
        let document_results = join_all(documents.into_iter().map(|file| async move {
            storage::upload(store, ObjectKind::Document, &file.file_name, &file.content_type, file.bytes.clone()).await
        }));
        let (image_results, document_results) = futures::join!(image_results, document_results);

        let mut uploads = Uploads::default();
        let mut failure = None;
        for result in image_results {
            match result {
                Ok(object) => uploads.images.push(object),
                Err(e) => failure = failure.or(Some(e)),
            }
        }
        for result in document_results {
            match result {
                Ok(object) => uploads.documents.push(object),
                Err(e) => failure = failure.or(Some(e)),
            }
        }

        match failure {
            None => Ok(uploads),
            Some(e) => {
                self.discard(&uploads).await;
                Err(e.into())
            }
        }
    }

    async fn discard(&self, uploads: &Uploads) {
        let keys = uploads.keys();
        if !keys.is_empty() {
            tracing::warn!("Removing {} uploaded objects after a failed write", keys.len());
            storage::delete_all(self.storage.as_ref(), &keys).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::database::models::EventFilter;
    use crate::testing;
    use axum::body::Bytes;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: 5,
            nombre: "Pedro".to_string(),
            apellido: "Ruiz".to_string(),
            correo: "pedro@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn staff_events_skip_moderation() {
        assert_eq!(EventService::initial_status(&user(Role::Promotor)), EventStatus::Pendiente);
        assert_eq!(EventService::initial_status(&user(Role::Moderador)), EventStatus::Aprobado);
        assert_eq!(EventService::initial_status(&user(Role::Administrador)), EventStatus::Aprobado);
    }

    #[tokio::test]
    async fn uploads_land_in_storage_and_can_be_discarded() {
        let (state, store) = testing::memory_state();
        let service = EventService::new(&state);

        let files = vec![
            UploadedFile {
                file_name: "a.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: Bytes::from_static(b"png"),
            },
            UploadedFile {
                file_name: "b.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: Bytes::from_static(b"png"),
            },
        ];
        let docs = vec![UploadedFile {
            file_name: "plano.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: Bytes::from_static(b"%PDF-1.7"),
        }];

        let uploads = service.upload_files(files, docs).await.unwrap();
        assert_eq!(uploads.images.len(), 2);
        assert_eq!(uploads.documents.len(), 1);
        assert!(uploads.documents[0].key.starts_with("eventos/documentos/"));
        assert_eq!(store.keys().len(), 3);

        service.discard(&uploads).await;
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn usuario_cannot_create() {
        let (state, _store) = testing::memory_state();
        let service = EventService::new(&state);
        let event = ValidatedEvent {
            fields: testing::sample_fields(),
            imagenes: vec![],
            documentos: vec![],
            imagenes_conservar: None,
            documentos_conservar: None,
        };
        // Fails on the role check before touching the database
        let err = service.create(&user(Role::Usuario), event).await.unwrap_err();
        assert!(matches!(err, EventError::CannotCreate));
        assert_eq!(ApiError::from(err).status_code(), axum::http::StatusCode::FORBIDDEN);
    }

    fn png(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: "image/png".to_string(),
            bytes: Bytes::from_static(b"png"),
        }
    }

    fn with_images(imagenes: Vec<UploadedFile>) -> ValidatedEvent {
        ValidatedEvent {
            fields: testing::sample_fields(),
            imagenes,
            documentos: vec![],
            imagenes_conservar: None,
            documentos_conservar: None,
        }
    }

    #[tokio::test]
    async fn failed_insert_removes_uploaded_files() {
        // Uploads succeed, then BEGIN fails against the unreachable pool
        let (state, store) = testing::memory_state();
        let service = EventService::new(&state);

        let err = service
            .create(&user(Role::Promotor), with_images(vec![png("cartel.png")]))
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::Database(_)));
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn update_over_image_limit_rolls_back() {
        let Some((state, store)) = testing::database_state().await else {
            return;
        };
        let max = config::config().uploads.max_images_per_event;
        let promotor = testing::create_user(&state, Role::Promotor).await;
        let service = EventService::new(&state);

        let images = (0..max).map(|i| png(&format!("foto-{}.png", i))).collect();
        let created = service.create(&promotor, with_images(images)).await.unwrap();
        let keys_before = store.keys();
        assert_eq!(keys_before.len(), max);

        let mut edit = with_images(vec![png("extra.png")]);
        edit.fields.titulo = "Título que no debe guardarse".to_string();
        let err = service.update(&promotor, created.id_evento, edit).await.unwrap_err();
        assert!(matches!(err, EventError::TooManyImages(n) if n == max));

        assert_eq!(store.keys(), keys_before);
        let mut conn = state.pool.acquire().await.unwrap();
        assert_eq!(events::count_images(&mut conn, created.id_evento).await.unwrap(), max as i64);
        let detail = events::find_detail(&state.pool, created.id_evento).await.unwrap().unwrap();
        assert_eq!(detail.titulo, created.titulo);
    }

    #[tokio::test]
    async fn keyword_search_ignores_venue() {
        let Some((state, _)) = testing::database_state().await else {
            return;
        };
        let promotor = testing::create_user(&state, Role::Promotor).await;
        let marker = uuid::Uuid::new_v4().simple().to_string();
        let mut fields = testing::sample_fields();
        fields.lugar = format!("Coliseo {}", marker);
        testing::create_event(&state, &promotor, &fields).await;

        let by_venue = EventFilter {
            q: Some(marker.clone()),
            ..Default::default()
        };
        let (found, total) = events::list_public(&state.pool, &by_venue, 10, 0).await.unwrap();
        assert!(found.is_empty());
        assert_eq!(total, 0);

        fields.lugar = "Otro lugar".to_string();
        fields.titulo = format!("Festival {}", marker);
        testing::create_event(&state, &promotor, &fields).await;
        let (found, _) = events::list_public(&state.pool, &by_venue, 10, 0).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn error_mapping() {
        assert_eq!(
            ApiError::from(EventError::NotFound(1)).status_code(),
            axum::http::StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(EventError::Forbidden(1, 2)).status_code(),
            axum::http::StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(EventError::TooManyImages(10)).status_code(),
            axum::http::StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(EventError::Storage(StorageError::Backend("down".to_string()))).status_code(),
            axum::http::StatusCode::BAD_GATEWAY
        );
    }
}
