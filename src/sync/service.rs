//! Entry point used by the HTTP and CLI surfaces.
//!
//! Wraps the importer and upload coordinator with record lookup and
//! sync-status bookkeeping.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::dog::SyncStatus;
use crate::models::results::{ConnectionReport, ImportResult, MethodPreference, UploadResult};
use crate::petfinder::{self, PetfinderClient, SearchCriteria};
use crate::store::{DogFilter, DogStore};
use crate::sync::importer::Importer;
use crate::sync::tracker::SyncTracker;
use crate::sync::upload::UploadCoordinator;
use crate::transport::{ApiTransport, FtpTransport, ObjectStoreTransport, UploadTransport};

/// Record counts per sync status.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncSummary {
    pub total: i64,
    pub not_synced: i64,
    pub syncing: i64,
    pub synced: i64,
    pub error: i64,
}

pub struct SyncService {
    store: Arc<dyn DogStore>,
    tracker: SyncTracker,
    importer: Option<Importer>,
    uploads: UploadCoordinator,
    default_organization: Option<String>,
}

impl SyncService {
    pub fn new(store: Arc<dyn DogStore>, importer: Option<Importer>, uploads: UploadCoordinator) -> Self {
        Self {
            tracker: SyncTracker::new(store.clone()),
            store,
            importer,
            uploads,
            default_organization: None,
        }
    }

    pub fn with_default_organization(mut self, org_id: Option<String>) -> Self {
        self.default_organization = org_id;
        self
    }

    /// Wire up the Petfinder client and every configured transport.
    pub fn from_config(cfg: &Config, store: Arc<dyn DogStore>) -> anyhow::Result<Self> {
        let mut transports: Vec<Arc<dyn UploadTransport>> = Vec::new();
        let mut importer = None;

        if let Some(creds) = &cfg.petfinder {
            let http = petfinder::http_client(cfg.request_timeout)?;
            let client = Arc::new(PetfinderClient::new(http, &cfg.api_url, creds.clone()));
            importer = Some(
                Importer::new(client.clone(), store.clone())
                    .with_page_delay(cfg.page_delay)
                    .with_fetch_timeout(cfg.request_timeout),
            );
            transports.push(Arc::new(ApiTransport::new(client)));
        } else {
            tracing::warn!("Petfinder credentials not set; import and API upload disabled");
        }

        if let Some(ftp) = &cfg.ftp {
            tracing::info!(host = %ftp.host, port = ftp.port, "FTP upload configured");
            transports.push(Arc::new(
                FtpTransport::new(ftp.clone(), cfg.upload_prefix.clone()).with_io_timeout(cfg.request_timeout),
            ));
        }

        if let Some(url) = &cfg.object_store_url {
            transports.push(Arc::new(ObjectStoreTransport::from_url(url, cfg.upload_prefix.clone())?));
        }

        let uploads = UploadCoordinator::new(transports)
            .with_transfer_timeout(cfg.request_timeout)
            .with_manual_upload_url(cfg.manual_upload_url.clone());

        Ok(Self::new(store, importer, uploads).with_default_organization(cfg.organization_id.clone()))
    }

    pub fn store(&self) -> &Arc<dyn DogStore> {
        &self.store
    }

    fn importer(&self) -> Result<&Importer, AppError> {
        self.importer.as_ref().ok_or(AppError::NotConfigured("Petfinder API"))
    }

    /// `org_id` falls back to the configured default organization.
    pub async fn import_from_organization(&self, org_id: Option<&str>) -> Result<ImportResult, AppError> {
        let importer = self.importer()?;
        let org_id = org_id
            .or(self.default_organization.as_deref())
            .ok_or_else(|| AppError::BadRequest("no organization id given".into()))?;
        Ok(importer.import_from_organization(org_id).await)
    }

    pub async fn import_from_search(&self, criteria: &SearchCriteria) -> Result<ImportResult, AppError> {
        Ok(self.importer()?.import_from_search(criteria).await)
    }

    pub async fn import_animal(&self, petfinder_id: u64) -> Result<ImportResult, AppError> {
        Ok(self.importer()?.import_animal(petfinder_id).await)
    }

    /// Upload one dog and record the outcome on it.
    ///
    /// `Auto` walks every configured transport until one succeeds.
    pub async fn upload_dog(&self, id: Uuid, preference: MethodPreference) -> Result<UploadResult, AppError> {
        let dog = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("dog {} not found", id)))?;

        if !self.tracker.mark_syncing(id).await? {
            return Err(AppError::BadRequest(format!("dog {} is already being synced", id)));
        }

        let result = match preference {
            MethodPreference::Auto => self.uploads.upload_dog_with_fallback(&dog).await,
            fixed => self.uploads.upload_dog(&dog, fixed).await,
        };

        self.record_outcome(id, &result).await;
        Ok(result)
    }

    /// Bulk-upload every dog that is not synced or whose last sync failed.
    pub async fn upload_pending(&self) -> Result<UploadResult, AppError> {
        let pending = self
            .store
            .list(&DogFilter::with_status(&[SyncStatus::NotSynced, SyncStatus::Error]))
            .await?;

        let mut batch = Vec::with_capacity(pending.len());
        for dog in pending {
            match self.tracker.mark_syncing(dog.id).await {
                Ok(true) => batch.push(dog),
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(dog_id = %dog.id, error = %e, "Could not mark dog syncing; left out of batch");
                }
            }
        }
        tracing::info!(count = batch.len(), "Uploading pending dogs");

        let result = self.uploads.upload_dogs(&batch).await;
        for dog in &batch {
            self.record_outcome(dog.id, &result).await;
        }
        Ok(result)
    }

    pub async fn test_connection(&self) -> ConnectionReport {
        self.uploads.test_connection().await
    }

    pub async fn summary(&self) -> Result<SyncSummary, AppError> {
        Ok(SyncSummary {
            total: self.store.count(&DogFilter::default()).await?,
            not_synced: self.count_in(SyncStatus::NotSynced).await?,
            syncing: self.count_in(SyncStatus::Syncing).await?,
            synced: self.count_in(SyncStatus::Synced).await?,
            error: self.count_in(SyncStatus::Error).await?,
        })
    }

    async fn count_in(&self, status: SyncStatus) -> Result<i64, AppError> {
        Ok(self.store.count(&DogFilter::with_status(&[status])).await?)
    }

    /// Move a dog out of `SYNCING` whatever happens. If the synced state
    /// cannot be stored (e.g. the returned Petfinder id already belongs to
    /// another dog) the store error is recorded instead.
    async fn record_outcome(&self, id: Uuid, result: &UploadResult) {
        let outcome = match (result.success, result.method) {
            (true, Some(method)) => {
                match self
                    .tracker
                    .mark_synced(id, result.petfinder_id.clone(), method.as_str(), Utc::now())
                    .await
                {
                    Ok(applied) => Ok(applied),
                    Err(e) => {
                        tracing::error!(dog_id = %id, error = %e, "Delivered but could not record sync");
                        self.tracker
                            .mark_error(id, &format!("Upload succeeded but was not recorded ({})", e))
                            .await
                    }
                }
            }
            _ => self.tracker.mark_error(id, &failure_text(result)).await,
        };

        if let Err(e) = outcome {
            tracing::error!(dog_id = %id, error = %e, "Failed to record upload outcome");
        }
    }
}

fn failure_text(result: &UploadResult) -> String {
    match result.error.as_deref() {
        Some(error) if error != result.message => format!("{} ({})", error, result.message),
        Some(error) => error.to_string(),
        None => result.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dog::{DogFields, NewDog, SyncState};
    use crate::models::results::UploadMethod;
    use crate::store::memory::MemoryStore;
    use crate::sync::importer::tests::{animal, ScriptedSource};
    use crate::sync::upload::tests::FakeTransport;

    async fn seed(store: &MemoryStore, name: &str) -> Uuid {
        store
            .create(NewDog {
                fields: DogFields::named(name, "Terrier"),
                sync: SyncState::default(),
            })
            .await
            .unwrap()
            .id
    }

    fn service(store: Arc<MemoryStore>, transports: Vec<Arc<FakeTransport>>) -> SyncService {
        let uploads = UploadCoordinator::new(
            transports
                .into_iter()
                .map(|t| t as Arc<dyn UploadTransport>)
                .collect(),
        );
        SyncService::new(store, None, uploads)
    }

    #[tokio::test]
    async fn test_upload_marks_synced() {
        let store = Arc::new(MemoryStore::new());
        let id = seed(&store, "Rex").await;
        let api = Arc::new(FakeTransport::new(UploadMethod::Api, true, true).returning_id("321"));
        let svc = service(store.clone(), vec![api]);

        let result = svc.upload_dog(id, MethodPreference::Auto).await.unwrap();
        assert!(result.success);

        let dog = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(dog.sync.status, SyncStatus::Synced);
        assert_eq!(dog.sync.petfinder_id.as_deref(), Some("321"));
        assert_eq!(dog.sync.method.as_deref(), Some("api"));
    }

    #[tokio::test]
    async fn test_failed_upload_records_error() {
        let store = Arc::new(MemoryStore::new());
        let id = seed(&store, "Rex").await;
        let svc = service(store.clone(), vec![Arc::new(FakeTransport::new(UploadMethod::Ftp, false, false))]);

        let result = svc.upload_dog(id, MethodPreference::Auto).await.unwrap();
        assert!(!result.success);

        let dog = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(dog.sync.status, SyncStatus::Error);
        assert_eq!(dog.sync.errors.len(), 1);
        assert!(dog.sync.errors[0].starts_with("All upload methods failed"));

        // A retry appends rather than replaces.
        svc.upload_dog(id, MethodPreference::Auto).await.unwrap();
        let dog = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(dog.sync.errors.len(), 2);
    }

    #[tokio::test]
    async fn test_conflicting_remote_id_does_not_strand_dog() {
        let store = Arc::new(MemoryStore::new());
        store
            .create(NewDog {
                fields: DogFields::named("Imported", "Boxer"),
                sync: SyncState {
                    status: SyncStatus::Synced,
                    petfinder_id: Some("555".into()),
                    ..SyncState::default()
                },
            })
            .await
            .unwrap();
        let id = seed(&store, "Rex").await;
        let api = Arc::new(FakeTransport::new(UploadMethod::Api, true, true).returning_id("555"));
        let svc = service(store.clone(), vec![api]);

        let result = svc.upload_dog(id, MethodPreference::Auto).await.unwrap();
        assert!(result.success);

        let dog = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(dog.sync.status, SyncStatus::Error);
        assert_eq!(dog.sync.petfinder_id, None);
        assert_eq!(dog.sync.errors.len(), 1);
        assert!(dog.sync.errors[0].contains("555"), "{}", dog.sync.errors[0]);

        // Errored dogs are picked up again by the pending sweep.
        let ftp = Arc::new(FakeTransport::new(UploadMethod::Ftp, true, true));
        let svc = service(store.clone(), vec![ftp.clone()]);
        assert!(svc.upload_pending().await.unwrap().success);
        assert_eq!(*ftp.batches.lock().unwrap(), vec![1]);
        let dog = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(dog.sync.status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn test_upload_unknown_dog() {
        let svc = service(Arc::new(MemoryStore::new()), vec![]);
        let err = svc.upload_dog(Uuid::new_v4(), MethodPreference::Auto).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_upload_pending_batches_unsynced_dogs() {
        let store = Arc::new(MemoryStore::new());
        let a = seed(&store, "A").await;
        let b = seed(&store, "B").await;
        let ftp = Arc::new(FakeTransport::new(UploadMethod::Ftp, true, true));
        let svc = service(store.clone(), vec![ftp.clone()]);

        let result = svc.upload_pending().await.unwrap();
        assert!(result.success, "{:?}", result);
        assert_eq!(*ftp.batches.lock().unwrap(), vec![2]);

        for id in [a, b] {
            let dog = store.find_by_id(id).await.unwrap().unwrap();
            assert_eq!(dog.sync.status, SyncStatus::Synced);
        }

        let again = svc.upload_pending().await.unwrap();
        assert_eq!(again.error.as_deref(), Some("No dogs to upload"));
    }

    #[tokio::test]
    async fn test_import_requires_credentials() {
        let svc = service(Arc::new(MemoryStore::new()), vec![]);
        let err = svc.import_from_organization(Some("NJ333")).await.unwrap_err();
        assert!(matches!(err, AppError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_import_uses_default_organization_and_summary() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "Local").await;
        let source = Arc::new(ScriptedSource::new(vec![Some(vec![animal(1, "A"), animal(2, "B")])]));
        let importer = Importer::new(source, store.clone()).with_page_delay(std::time::Duration::ZERO);
        let svc = SyncService::new(store.clone(), Some(importer), UploadCoordinator::new(vec![]))
            .with_default_organization(Some("NJ333".into()));

        let result = svc.import_from_organization(None).await.unwrap();
        assert_eq!(result.imported, 2);

        let summary = svc.summary().await.unwrap();
        assert_eq!(
            summary,
            SyncSummary {
                total: 3,
                not_synced: 1,
                syncing: 0,
                synced: 2,
                error: 0,
            }
        );
    }

    #[test]
    fn test_failure_text() {
        let r = UploadResult::failed(None, "All upload methods failed", "FTP: refused");
        assert_eq!(failure_text(&r), "All upload methods failed (FTP: refused)");
        let r = UploadResult::failed(None, "No dogs to upload", "No dogs to upload");
        assert_eq!(failure_text(&r), "No dogs to upload");
    }
}
