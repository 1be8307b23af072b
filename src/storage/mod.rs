//! Object storage for event images and documents.
//!
//! Handlers only see [`Storage`]; the backend is picked from configuration at
//! startup. Every stored object is described by a [`StoredObject`] which is
//! persisted next to the row that owns it.

pub mod http;
pub mod local;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{StorageBackend, StorageConfig};

pub use http::HttpObjectStore;
pub use local::LocalStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Metadata returned by a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub url: String,
    pub key: String,
    pub file_name: String,
    pub content_type: String,
    pub size: i64,
}

/// Object bytes fetched back from storage
#[derive(Debug, Clone)]
pub struct FetchedObject {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<FetchedObject, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Public URL under which `key` is reachable
    fn public_url(&self, key: &str) -> String;
}

/// Folder an upload belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Image,
    Document,
}

impl ObjectKind {
    fn folder(self) -> &'static str {
        match self {
            ObjectKind::Image => "eventos/imagenes",
            ObjectKind::Document => "eventos/documentos",
        }
    }
}

/// Build the storage backend selected by configuration
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn Storage>, StorageError> {
    match config.backend {
        StorageBackend::Local => Ok(Arc::new(LocalStore::new(&config.local_dir, &config.public_url))),
        StorageBackend::Http => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| StorageError::Backend("STORAGE_ENDPOINT is not configured".to_string()))?;
            Ok(Arc::new(HttpObjectStore::new(
                endpoint,
                &config.bucket,
                &config.public_url,
                config.token.clone(),
            )?))
        }
    }
}

/// Upload one file under a fresh key and describe the result
pub async fn upload(
    storage: &dyn Storage,
    kind: ObjectKind,
    file_name: &str,
    content_type: &str,
    bytes: Bytes,
) -> Result<StoredObject, StorageError> {
    let key = object_key(kind, file_name);
    let size = bytes.len() as i64;
    storage.put(&key, bytes, content_type).await?;

    tracing::debug!("Stored {} ({} bytes) as {}", file_name, size, key);

    Ok(StoredObject {
        url: storage.public_url(&key),
        key,
        file_name: file_name.to_string(),
        content_type: content_type.to_string(),
        size,
    })
}

/// Best-effort removal, failures are logged and swallowed
pub async fn delete_all(storage: &dyn Storage, keys: &[String]) {
    let results = futures::future::join_all(keys.iter().map(|key| storage.delete(key))).await;
    for (key, result) in keys.iter().zip(results) {
        if let Err(e) = result {
            tracing::warn!("Failed to delete storage object {}: {}", key, e);
        }
    }
}

pub fn object_key(kind: ObjectKind, file_name: &str) -> String {
    format!("{}/{}-{}", kind.folder(), Uuid::new_v4().simple(), sanitize_file_name(file_name))
}

/// Lower-case `[a-z0-9._-]` only, no leading dots, never empty
pub fn sanitize_file_name(file_name: &str) -> String {
    // Browsers on Windows may send the full client path
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);

    let mut cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();

    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    let cleaned = cleaned.trim_start_matches('.').trim_matches('-');

    if cleaned.is_empty() {
        "archivo".to_string()
    } else {
        cleaned.chars().take(100).collect()
    }
}

/// Keys produced by [`object_key`] never escape the bucket; reject anything else
pub(crate) fn check_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key.split('/').all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    #[test]
    fn sanitizes_file_names() {
        assert_eq!(sanitize_file_name("Afiche Concierto.PNG"), "afiche-concierto.png");
        assert_eq!(sanitize_file_name("C:\\Users\\ana\\plano.pdf"), "plano.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("...hidden"), "hidden");
        assert_eq!(sanitize_file_name("a..b.pdf"), "a.b.pdf");
        assert_eq!(sanitize_file_name("ñandú"), "and");
        assert_eq!(sanitize_file_name("???"), "archivo");
    }

    #[test]
    fn keys_live_under_their_folder() {
        let key = object_key(ObjectKind::Document, "Permiso PULEP.pdf");
        assert!(key.starts_with("eventos/documentos/"));
        assert!(key.ends_with("-permiso-pulep.pdf"));
        assert!(check_key(&key).is_ok());
    }

    #[test]
    fn rejects_escaping_keys() {
        assert!(check_key("../secret").is_err());
        assert!(check_key("/abs/path").is_err());
        assert!(check_key("a//b").is_err());
        assert!(check_key("").is_err());
        assert!(check_key("eventos/imagenes/x.png").is_ok());
    }

    #[tokio::test]
    async fn upload_describes_stored_object() {
        let store = MemoryStore::default();
        let stored = upload(&store, ObjectKind::Image, "foto.jpg", "image/jpeg", Bytes::from_static(b"jpeg"))
            .await
            .unwrap();

        assert_eq!(stored.size, 4);
        assert_eq!(stored.file_name, "foto.jpg");
        assert_eq!(stored.url, format!("memory://{}", stored.key));
        assert_eq!(store.get(&stored.key).await.unwrap().bytes, Bytes::from_static(b"jpeg"));

        delete_all(&store, &[stored.key.clone(), "eventos/imagenes/missing.png".to_string()]).await;
        assert!(matches!(store.get(&stored.key).await, Err(StorageError::NotFound(_))));
    }
}
