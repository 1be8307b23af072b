use async_trait::async_trait;
use axum::body::Bytes;
use std::path::{Path, PathBuf};

use super::{check_key, FetchedObject, Storage, StorageError};

/// Filesystem-backed store, served by the app under `/uploads`
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    public_url: String,
}

impl LocalStore {
    pub fn new(root: impl AsRef<Path>, public_url: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        check_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl Storage for LocalStore {
    async fn put(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<FetchedObject, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(FetchedObject {
                bytes: Bytes::from(bytes),
                content_type: None,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("time2go-store-{}", uuid::Uuid::new_v4().simple()))
    }

    #[tokio::test]
    async fn writes_reads_and_deletes() {
        let root = temp_root();
        let store = LocalStore::new(&root, "http://localhost:3000/uploads/");
        let key = "eventos/documentos/abc-programa.pdf";

        store.put(key, Bytes::from_static(b"%PDF-1.7"), "application/pdf").await.unwrap();
        assert!(root.join(key).exists());
        assert_eq!(store.get(key).await.unwrap().bytes, Bytes::from_static(b"%PDF-1.7"));
        assert_eq!(store.public_url(key), format!("http://localhost:3000/uploads/{}", key));

        store.delete(key).await.unwrap();
        assert!(matches!(store.get(key).await, Err(StorageError::NotFound(_))));
        // Deleting twice is fine
        store.delete(key).await.unwrap();

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn refuses_traversal() {
        let store = LocalStore::new(temp_root(), "http://localhost/uploads");
        let result = store.put("../escape.txt", Bytes::from_static(b"x"), "text/plain").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
