use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{header, StatusCode};
use std::time::Duration;
use url::Url;

use super::{check_key, FetchedObject, Storage, StorageError};

/// S3/R2-style object endpoint addressed as `{endpoint}/{bucket}/{key}`.
///
/// Authenticates with a bearer token (an R2 worker or a presigning gateway in
/// front of the bucket). Public reads go through `public_url`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    base: Url,
    public_url: String,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str, bucket: &str, public_url: &str, token: Option<String>) -> Result<Self, StorageError> {
        let base = Url::parse(&format!("{}/{}/", endpoint.trim_end_matches('/'), bucket.trim_matches('/')))
            .map_err(|e| StorageError::Backend(format!("invalid storage endpoint: {}", e)))?;

        let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base,
            public_url: public_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn object_url(&self, key: &str) -> Result<Url, StorageError> {
        check_key(key)?;
        self.base
            .join(key)
            .map_err(|e| StorageError::Backend(format!("invalid object url for {}: {}", key, e)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl Storage for HttpObjectStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        let url = self.object_url(key)?;
        let response = self
            .authorize(self.client.put(url))
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::Backend(format!("PUT {} returned {}", key, response.status())));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<FetchedObject, StorageError> {
        let url = self.object_url(key)?;
        let response = self.authorize(self.client.get(url)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(key.to_string())),
            status if !status.is_success() => {
                Err(StorageError::Backend(format!("GET {} returned {}", key, status)))
            }
            _ => {
                let content_type = response
                    .headers()
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let bytes = response.bytes().await?;
                Ok(FetchedObject { bytes, content_type })
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let url = self.object_url(key)?;
        let response = self.authorize(self.client.delete(url)).send().await?;

        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(StorageError::Backend(format!("DELETE {} returned {}", key, response.status())))
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }
}
