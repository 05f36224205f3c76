//! Delivery channels to Petfinder.
//!
//! Each transport can be probed (is it reachable with the configured
//! credentials?) and asked to deliver a batch of records. File transports
//! render the batch as one CSV feed; the API transport submits listings.

pub mod api;
pub mod ftp;
pub mod object;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::models::dog::DogRecord;
use crate::models::results::UploadMethod;
use crate::sync::feed;

pub use api::ApiTransport;
pub use ftp::{FtpConfig, FtpTransport};
pub use object::ObjectStoreTransport;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0} is not configured")]
    NotConfigured(UploadMethod),

    #[error("{method} connection failed: {message}")]
    Connect { method: UploadMethod, message: String },

    #[error("{method} transfer failed: {message}")]
    Transfer { method: UploadMethod, message: String },

    #[error("{method} timed out after {after:?}")]
    Timeout { method: UploadMethod, after: Duration },
}

impl TransportError {
    pub fn connect(method: UploadMethod, err: impl std::fmt::Display) -> Self {
        TransportError::Connect {
            method,
            message: err.to_string(),
        }
    }

    pub fn transfer(method: UploadMethod, err: impl std::fmt::Display) -> Self {
        TransportError::Transfer {
            method,
            message: err.to_string(),
        }
    }
}

/// A set of records going out together.
///
/// A single-record batch names its feed file after the record; a bulk batch
/// does not.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    pub records: &'a [DogRecord],
    named: bool,
}

impl<'a> Batch<'a> {
    pub fn single(record: &'a DogRecord) -> Self {
        Self {
            records: std::slice::from_ref(record),
            named: true,
        }
    }

    pub fn bulk(records: &'a [DogRecord]) -> Self {
        Self {
            records,
            named: false,
        }
    }

    pub fn file_name(&self, prefix: &str, now: DateTime<Utc>) -> String {
        let id = match self.records {
            [only] if self.named => Some(only.id.to_string()),
            _ => None,
        };
        feed::file_name(prefix, id.as_deref(), now)
    }

    pub fn csv(&self, now: DateTime<Utc>) -> String {
        feed::render(self.records, now)
    }
}

/// What a successful delivery produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delivery {
    /// Petfinder's id for the animal, when the channel returns one.
    pub remote_id: Option<String>,
    /// Where the payload went: remote file path, object key or endpoint.
    pub reference: String,
}

#[async_trait]
pub trait UploadTransport: Send + Sync {
    fn method(&self) -> UploadMethod;

    /// Cheap reachability check with the configured credentials.
    async fn probe(&self) -> Result<(), TransportError>;

    async fn upload(&self, batch: Batch<'_>) -> Result<Delivery, TransportError>;
}

/// Bound `fut` by `after`; expiry is reported as a transport failure.
pub async fn with_timeout<T, F>(
    method: UploadMethod,
    after: Duration,
    fut: F,
) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(res) => res,
        Err(_) => Err(TransportError::Timeout { method, after }),
    }
}
