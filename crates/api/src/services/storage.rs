//! Blob store client for listing images and avatars.
//!
//! Talks to an S3-compatible storage gateway over plain HTTP with bearer
//! auth. Objects are keyed `{folder}/{owner_id}/{uuid}{ext}` and served
//! from a configured public base URL, so key and URL map to each other
//! deterministically.
//!
//! The store shares no transaction with the database. Callers order their
//! operations so a stored URL always pointed at an existing blob when it
//! was written: put blobs before committing references, delete blobs only
//! after the reference is gone. Orphaned blobs are tolerated.

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use unibazaar_core::AccountId;

use crate::config::StorageConfig;

/// Request timeout for blob operations.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Errors that can occur when interacting with the blob store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store returned an error response.
    #[error("storage error: {status} - {message}")]
    Api { status: u16, message: String },

    /// A URL does not belong to this store's public base.
    #[error("URL does not belong to the configured blob store: {0}")]
    ForeignUrl(String),

    /// A URL maps to an empty or invalid object key.
    #[error("invalid object key in URL: {0}")]
    InvalidKey(String),

    /// Client construction failed.
    #[error("invalid storage configuration: {0}")]
    Config(String),
}

/// An uploaded file as received from a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Original filename, used only for its extension.
    pub filename: String,
    /// Declared content type (must be `image/*`; checked by callers).
    pub content_type: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// Blob store client.
#[derive(Clone)]
pub struct StorageClient {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    public_base_url: String,
}

impl StorageClient {
    /// Create a new blob store client.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Config` if the HTTP client fails to build or
    /// the access token is not a valid header value.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.access_token.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| StorageError::Config(format!("invalid access token: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_owned(),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Build the object key for a new upload:
    /// `{folder}/{owner_id}/{uuid}{ext}`.
    #[must_use]
    pub fn object_key(&self, folder: &str, owner: AccountId, filename: &str) -> String {
        let ext = filename
            .rfind('.')
            .map(|i| &filename[i..])
            .unwrap_or_default();
        format!("{folder}/{owner}/{}{ext}", Uuid::new_v4())
    }

    /// Public URL for an object key.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url)
    }

    /// Recover the object key from a public URL.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ForeignUrl` for URLs outside the configured
    /// public base and `StorageError::InvalidKey` for URLs with no key.
    pub fn key_from_url(&self, url: &str) -> Result<String, StorageError> {
        let base = Url::parse(&self.public_base_url)
            .map_err(|_| StorageError::ForeignUrl(url.to_owned()))?;
        let parsed = Url::parse(url).map_err(|_| StorageError::ForeignUrl(url.to_owned()))?;

        if parsed.origin() != base.origin() {
            return Err(StorageError::ForeignUrl(url.to_owned()));
        }

        let key = parsed.path().trim_start_matches('/');
        if key.is_empty() {
            return Err(StorageError::InvalidKey(url.to_owned()));
        }

        Ok(key.to_owned())
    }

    /// Store an object.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Http` if the request fails and
    /// `StorageError::Api` for a non-success response.
    pub async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let url = format!("{}/{}/{key}", self.endpoint, self.bucket);

        let response = self
            .client
            .put(&url)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    /// Delete an object. Deleting a missing object succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Http` if the request fails and
    /// `StorageError::Api` for a non-success response other than 404.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let url = format!("{}/{}/{key}", self.endpoint, self.bucket);

        let response = self.client.delete(&url).send().await?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    /// Delete the object behind a public URL.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::key_from_url`] and [`Self::delete`].
    pub async fn delete_by_url(&self, url: &str) -> Result<(), StorageError> {
        let key = self.key_from_url(url)?;
        self.delete(&key).await
    }

    /// Upload a batch of images for an owner and return their public URLs
    /// in the input order.
    ///
    /// Uploads run sequentially; the first failure aborts the batch.
    /// Objects stored before the failure are NOT retracted - the caller's
    /// rollback only covers relational state, and the resulting orphans
    /// are tolerated.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::put`].
    pub async fn upload_images(
        &self,
        images: &[UploadedImage],
        owner: AccountId,
        folder: &str,
    ) -> Result<Vec<String>, StorageError> {
        let mut urls = Vec::with_capacity(images.len());

        for image in images {
            let key = self.object_key(folder, owner, &image.filename);
            self.put(&key, image.bytes.clone(), &image.content_type)
                .await?;
            urls.push(self.public_url(&key));
        }

        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn client() -> StorageClient {
        StorageClient::new(&StorageConfig {
            endpoint: "https://storage.internal.example/v1".to_owned(),
            bucket: "unibazaar".to_owned(),
            access_token: SecretString::from("xK9mP2vQ8rT4wY6zB1nC3eH5gJ7aL0dF"),
            public_base_url: "https://cdn.unibazaar.example".to_owned(),
        })
        .expect("client")
    }

    #[test]
    fn test_object_key_shape() {
        let client = client();
        let key = client.object_key("listings", AccountId::new(12), "photo.jpeg");

        assert!(key.starts_with("listings/12/"));
        assert!(key.ends_with(".jpeg"));
    }

    #[test]
    fn test_object_key_without_extension() {
        let client = client();
        let key = client.object_key("avatars", AccountId::new(3), "photo");

        assert!(key.starts_with("avatars/3/"));
        assert!(!key.contains('.'));
    }

    #[test]
    fn test_public_url_roundtrip() {
        let client = client();
        let key = "listings/12/abc.png";

        let url = client.public_url(key);
        assert_eq!(url, "https://cdn.unibazaar.example/listings/12/abc.png");
        assert_eq!(client.key_from_url(&url).expect("own URL"), key);
    }

    #[test]
    fn test_key_from_foreign_url_rejected() {
        let client = client();
        assert!(matches!(
            client.key_from_url("https://evil.example/listings/12/abc.png"),
            Err(StorageError::ForeignUrl(_))
        ));
    }

    #[test]
    fn test_key_from_base_url_rejected() {
        let client = client();
        assert!(matches!(
            client.key_from_url("https://cdn.unibazaar.example/"),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
