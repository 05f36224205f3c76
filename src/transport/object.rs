//! CSV feed upload to an object store (S3, MinIO or a local directory).
//!
//! ```text
//! PETSYNC_OBJECT_STORE_URL=s3://petfinder-feeds?region=us-east-1&prefix=incoming
//! PETSYNC_OBJECT_STORE_URL=s3://feeds?endpoint=http://minio:9000
//! PETSYNC_OBJECT_STORE_URL=file:///var/lib/petsync/outbox
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use object_store::{path::Path, ObjectStore, PutPayload};
use std::sync::Arc;

use super::{Batch, Delivery, TransportError, UploadTransport};
use crate::models::results::UploadMethod;

const METHOD: UploadMethod = UploadMethod::ObjectStore;

pub struct ObjectStoreTransport {
    store: Arc<dyn ObjectStore>,
    /// Key prefix inside the bucket; empty for the bucket root.
    key_prefix: String,
    file_prefix: String,
}

impl ObjectStoreTransport {
    pub fn new(store: Arc<dyn ObjectStore>, key_prefix: &str, file_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.trim_matches('/').to_string(),
            file_prefix: file_prefix.into(),
        }
    }

    /// Build from a `file://` or `s3://` URL.
    pub fn from_url(url: &str, file_prefix: impl Into<String>) -> Result<Self> {
        let (store, key_prefix) = build_object_store(url)?;
        tracing::info!(url = %url, "Object store upload target configured");
        Ok(Self::new(store, &key_prefix, file_prefix))
    }

    fn key(&self, name: &str) -> Path {
        if self.key_prefix.is_empty() {
            Path::from(name)
        } else {
            Path::from(format!("{}/{}", self.key_prefix, name))
        }
    }
}

#[async_trait]
impl UploadTransport for ObjectStoreTransport {
    fn method(&self) -> UploadMethod {
        METHOD
    }

    async fn probe(&self) -> Result<(), TransportError> {
        let prefix = (!self.key_prefix.is_empty()).then(|| Path::from(self.key_prefix.as_str()));
        self.store
            .list_with_delimiter(prefix.as_ref())
            .await
            .map_err(|e| TransportError::connect(METHOD, e))?;
        Ok(())
    }

    async fn upload(&self, batch: Batch<'_>) -> Result<Delivery, TransportError> {
        let now = Utc::now();
        let key = self.key(&batch.file_name(&self.file_prefix, now));
        let body = batch.csv(now).into_bytes();
        let bytes = body.len();

        self.store
            .put(&key, PutPayload::from(body))
            .await
            .map_err(|e| TransportError::transfer(METHOD, e))?;

        tracing::info!(key = %key, bytes, records = batch.records.len(), "Uploaded feed to object store");
        Ok(Delivery {
            remote_id: None,
            reference: key.to_string(),
        })
    }
}

/// Parse a store URL into an `(ObjectStore, key prefix)` pair.
fn build_object_store(url: &str) -> Result<(Arc<dyn ObjectStore>, String)> {
    if let Some(path) = url.strip_prefix("file://") {
        std::fs::create_dir_all(path)
            .with_context(|| format!("failed to create upload directory {}", path))?;
        let store = object_store::local::LocalFileSystem::new_with_prefix(path)
            .context("failed to create local file system object store")?;
        return Ok((Arc::new(store), String::new()));
    }

    if let Some(without_scheme) = url.strip_prefix("s3://") {
        let bucket = without_scheme.split('?').next().unwrap_or(without_scheme);
        let region = parse_query_param(url, "region").unwrap_or_else(|| "us-east-1".to_string());
        let prefix = parse_query_param(url, "prefix").unwrap_or_default();

        let mut builder = object_store::aws::AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&region);

        // MinIO and other S3-compatible servers
        if let Some(ep) = parse_query_param(url, "endpoint") {
            builder = builder.with_endpoint(&ep).with_allow_http(true);
        }

        if let (Ok(key), Ok(secret)) = (
            std::env::var("AWS_ACCESS_KEY_ID"),
            std::env::var("AWS_SECRET_ACCESS_KEY"),
        ) {
            builder = builder.with_access_key_id(key).with_secret_access_key(secret);
        }

        let store = builder.build().context("failed to build S3 object store")?;
        return Ok((Arc::new(store), prefix));
    }

    anyhow::bail!("unsupported object store URL scheme: {}", url)
}

fn parse_query_param(url: &str, key: &str) -> Option<String> {
    let query = url.split('?').nth(1)?;
    query.split('&').find_map(|part| {
        let (k, v) = part.split_once('=')?;
        (k == key).then(|| urlencoding::decode(v).map(|c| c.into_owned()).unwrap_or_default())
    })
}
