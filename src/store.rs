//! Concrete [`ObjectStore`] over HTTP.
//!
//! Objects live at `{endpoint}/{bucket}/{key}`; writes are plain PUTs and
//! reads are streaming GETs, authorised with a bearer token. The client
//! performs no retries: retry policy belongs to the storage service or the
//! caller.

use std::env;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::contract::{ByteStream, ObjectStore};
use crate::error::DocsError;

/// HTTP client for one bucket namespace.
#[derive(Debug)]
pub struct BucketClient {
    client: Client,
    endpoint: String,
    bucket: String,
    token: String,
}

impl BucketClient {
    /// Create a client for `bucket` behind `endpoint`.
    ///
    /// An empty token fails immediately with [`DocsError::Auth`]: no request
    /// is ever sent with absent credentials.
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, DocsError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(DocsError::Auth("no bucket token supplied".to_string()));
        }
        Ok(Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            token,
        })
    }

    /// Build a client from `DOCS_BUCKET_ENDPOINT`, `DOCS_BUCKET_NAME` and
    /// `DOCS_BUCKET_TOKEN`.
    pub fn new_from_env() -> Result<Self, DocsError> {
        let endpoint =
            env::var("DOCS_BUCKET_ENDPOINT").map_err(|_| DocsError::Input("DOCS_BUCKET_ENDPOINT"))?;
        let bucket =
            env::var("DOCS_BUCKET_NAME").map_err(|_| DocsError::Input("DOCS_BUCKET_NAME"))?;
        let token = env::var("DOCS_BUCKET_TOKEN")
            .map_err(|_| DocsError::Auth("DOCS_BUCKET_TOKEN not set".to_string()))?;
        Self::new(endpoint, bucket, token)
    }

    fn url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.bucket,
            key
        )
    }
}

#[async_trait]
impl ObjectStore for BucketClient {
    async fn put(&self, key: &str, body: Bytes) -> Result<(), DocsError> {
        let url = self.url(key);
        debug!(url = %url, bytes = body.len(), "[STORE] PUT object");
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/gzip")
            .body(body)
            .send()
            .await
            .map_err(|e| DocsError::Upload(e.to_string()))?;

        let status = response.status();
        match status {
            s if s.is_success() => {
                info!(url = %url, "[STORE] Object stored");
                Ok(())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(DocsError::Auth(format!(
                "bucket returned {status} for PUT {url}"
            ))),
            _ => Err(DocsError::Upload(format!(
                "bucket returned {status} for PUT {url}"
            ))),
        }
    }

    async fn get(&self, key: &str) -> Result<ByteStream, DocsError> {
        let url = self.url(key);
        debug!(url = %url, "[STORE] GET object");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| DocsError::Download(e.to_string()))?;

        let status = response.status();
        match status {
            s if s.is_success() => {
                // Hand the body through as-is; decoding is the caller's job.
                let stream = response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(|e| DocsError::Download(e.to_string())))
                    .boxed();
                Ok(stream)
            }
            StatusCode::NOT_FOUND => Err(DocsError::NotFound {
                key: key.to_string(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(DocsError::Auth(format!(
                "bucket returned {status} for GET {url}"
            ))),
            _ => Err(DocsError::Download(format!(
                "bucket returned {status} for GET {url}"
            ))),
        }
    }
}
