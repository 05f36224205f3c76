//! Outbound delivery: pick a transport, send, fall back.
//!
//! Transports are held in `UploadMethod::PRIORITY` order. Every probe and
//! transfer is bounded by `transfer_timeout`. No operation here returns an
//! error: failures come back as an `UploadResult` with `success: false`.

use std::sync::Arc;
use std::time::Duration;

use crate::models::dog::DogRecord;
use crate::models::results::{
    ConnectionCheck, ConnectionReport, MethodPreference, UploadMethod, UploadResult,
};
use crate::transport::{with_timeout, Batch, Delivery, TransportError, UploadTransport};

pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MANUAL_UPLOAD_URL: &str = "https://www.petfinder.com/member/";

pub const NO_VALID_METHOD: &str = "No valid upload method available";
pub const ALL_METHODS_FAILED: &str = "All upload methods failed";
pub const NO_DOGS: &str = "No dogs to upload";

pub struct UploadCoordinator {
    transports: Vec<Arc<dyn UploadTransport>>,
    transfer_timeout: Duration,
    manual_upload_url: String,
}

impl UploadCoordinator {
    pub fn new(mut transports: Vec<Arc<dyn UploadTransport>>) -> Self {
        transports.sort_by_key(|t| priority(t.method()));
        transports.dedup_by_key(|t| t.method());
        Self {
            transports,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            manual_upload_url: DEFAULT_MANUAL_UPLOAD_URL.to_string(),
        }
    }

    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    pub fn with_manual_upload_url(mut self, url: impl Into<String>) -> Self {
        self.manual_upload_url = url.into();
        self
    }

    /// Configured methods in priority order.
    pub fn methods(&self) -> Vec<UploadMethod> {
        self.transports.iter().map(|t| t.method()).collect()
    }

    fn transport(&self, method: UploadMethod) -> Option<&Arc<dyn UploadTransport>> {
        self.transports.iter().find(|t| t.method() == method)
    }

    async fn probe(&self, transport: &dyn UploadTransport) -> Result<(), TransportError> {
        with_timeout(transport.method(), self.transfer_timeout, transport.probe()).await
    }

    async fn transfer(
        &self,
        transport: &dyn UploadTransport,
        batch: Batch<'_>,
    ) -> Result<Delivery, TransportError> {
        with_timeout(transport.method(), self.transfer_timeout, transport.upload(batch)).await
    }

    /// First configured transport whose probe passes.
    async fn select(&self) -> Option<&Arc<dyn UploadTransport>> {
        for transport in &self.transports {
            match self.probe(transport.as_ref()).await {
                Ok(()) => return Some(transport),
                Err(e) => {
                    tracing::debug!(method = %transport.method(), error = %e, "Probe failed")
                }
            }
        }
        None
    }

    /// Upload one record with a fixed method, or the first reachable one.
    ///
    /// A fixed method is used without probing.
    pub async fn upload_dog(&self, record: &DogRecord, preference: MethodPreference) -> UploadResult {
        let transport = match preference {
            MethodPreference::Method(method) => match self.transport(method) {
                Some(t) => t,
                None => {
                    let err = TransportError::NotConfigured(method);
                    return self.failure(method, err.to_string(), format!("{} upload failed", method.label()));
                }
            },
            MethodPreference::Auto => match self.select().await {
                Some(t) => t,
                None => {
                    tracing::warn!(dog_id = %record.id, "No upload method reachable");
                    return UploadResult::failed(
                        None,
                        NO_VALID_METHOD,
                        "None of the configured upload methods could be reached",
                    )
                    .with_manual_upload_url(&self.manual_upload_url);
                }
            },
        };

        self.deliver_one(transport.as_ref(), record).await
    }

    async fn deliver_one(&self, transport: &dyn UploadTransport, record: &DogRecord) -> UploadResult {
        let method = transport.method();
        match self.transfer(transport, Batch::single(record)).await {
            Ok(delivery) => {
                tracing::info!(dog_id = %record.id, method = %method, reference = %delivery.reference, "Dog uploaded");
                UploadResult::succeeded(method, format!("{} uploaded via {}", record.fields.name, method.label()))
                    .with_petfinder_id(delivery.remote_id)
            }
            Err(e) => {
                tracing::warn!(dog_id = %record.id, method = %method, error = %e, "Upload failed");
                self.failure(method, e.to_string(), format!("{} upload failed", method.label()))
            }
        }
    }

    /// Upload a batch as one feed file over the first configured file
    /// transport. The transport must probe successfully first.
    pub async fn upload_dogs(&self, records: &[DogRecord]) -> UploadResult {
        let Some(transport) = self.transports.iter().find(|t| t.method().is_file_transfer()) else {
            return UploadResult::failed(
                None,
                NO_VALID_METHOD,
                "Bulk upload needs FTP or an object store to be configured",
            )
            .with_manual_upload_url(&self.manual_upload_url);
        };
        let method = transport.method();

        if records.is_empty() {
            return UploadResult::failed(Some(method), NO_DOGS, NO_DOGS);
        }

        if let Err(e) = self.probe(transport.as_ref()).await {
            tracing::warn!(method = %method, error = %e, "Bulk upload probe failed");
            return UploadResult::failed(
                Some(method),
                e.to_string(),
                format!("{} connection not available", method.label()),
            );
        }

        match self.transfer(transport.as_ref(), Batch::bulk(records)).await {
            Ok(delivery) => {
                tracing::info!(method = %method, count = records.len(), reference = %delivery.reference, "Bulk upload complete");
                UploadResult::succeeded(method, format!("{} dogs uploaded via {}", records.len(), method.label()))
            }
            Err(e) => {
                tracing::warn!(method = %method, error = %e, "Bulk upload failed");
                UploadResult::failed(Some(method), e.to_string(), format!("{} bulk upload failed", method.label()))
            }
        }
    }

    /// Try every configured transport in order, probing each first; the
    /// first successful transfer wins.
    pub async fn upload_dog_with_fallback(&self, record: &DogRecord) -> UploadResult {
        let mut failures = Vec::with_capacity(self.transports.len());

        for transport in &self.transports {
            let method = transport.method();
            let attempt = match self.probe(transport.as_ref()).await {
                Ok(()) => self.transfer(transport.as_ref(), Batch::single(record)).await,
                Err(e) => Err(e),
            };
            match attempt {
                Ok(delivery) => {
                    tracing::info!(dog_id = %record.id, method = %method, "Dog uploaded");
                    return UploadResult::succeeded(
                        method,
                        format!("{} uploaded via {}", record.fields.name, method.label()),
                    )
                    .with_petfinder_id(delivery.remote_id);
                }
                Err(e) => {
                    tracing::warn!(dog_id = %record.id, method = %method, error = %e, "Upload attempt failed, trying next method");
                    failures.push(format!("{}: {}", method.label(), e));
                }
            }
        }

        let message = if failures.is_empty() {
            "No upload methods are configured".to_string()
        } else {
            failures.join("; ")
        };
        UploadResult::failed(None, ALL_METHODS_FAILED, message).with_manual_upload_url(&self.manual_upload_url)
    }

    /// Probe every configured transport.
    pub async fn test_connection(&self) -> ConnectionReport {
        let mut checks = Vec::with_capacity(self.transports.len());
        for transport in &self.transports {
            let outcome = self.probe(transport.as_ref()).await;
            checks.push(ConnectionCheck {
                method: transport.method(),
                ok: outcome.is_ok(),
                error: outcome.err().map(|e| e.to_string()),
            });
        }
        let preferred = checks.iter().find(|c| c.ok).map(|c| c.method);
        ConnectionReport { checks, preferred }
    }

    fn failure(&self, method: UploadMethod, error: String, message: String) -> UploadResult {
        let result = UploadResult::failed(Some(method), error, message);
        if method == UploadMethod::Api {
            result.with_manual_upload_url(&self.manual_upload_url)
        } else {
            result
        }
    }
}

fn priority(method: UploadMethod) -> usize {
    UploadMethod::PRIORITY
        .iter()
        .position(|m| *m == method)
        .unwrap_or(UploadMethod::PRIORITY.len())
}
