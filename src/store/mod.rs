//! Record store for dog records.
//!
//! The sync engine only needs keyed lookups, creation, guarded sync-state
//! updates and simple filtered listing/counting, so the trait stays small.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::dog::{DogFields, DogRecord, NewDog, SyncStatus, SyncTransition};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dog {0} not found")]
    NotFound(Uuid),

    #[error("a dog with Petfinder id {0} already exists")]
    DuplicatePetfinderId(String),

    #[error("invalid stored value: {0}")]
    InvalidValue(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Filter for `list` / `count`. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct DogFilter {
    pub sync_status: Option<Vec<SyncStatus>>,
    pub has_petfinder_id: Option<bool>,
}

impl DogFilter {
    pub fn with_status(statuses: &[SyncStatus]) -> Self {
        Self {
            sync_status: Some(statuses.to_vec()),
            has_petfinder_id: None,
        }
    }

    pub fn matches(&self, record: &DogRecord) -> bool {
        if let Some(statuses) = &self.sync_status {
            if !statuses.contains(&record.sync.status) {
                return false;
            }
        }
        if let Some(has) = self.has_petfinder_id {
            if record.sync.petfinder_id.is_some() != has {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait DogStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<DogRecord>, StoreError>;

    async fn find_by_petfinder_id(&self, petfinder_id: &str) -> Result<Option<DogRecord>, StoreError>;

    /// Fails with `DuplicatePetfinderId` if the remote id is taken.
    async fn create(&self, dog: NewDog) -> Result<DogRecord, StoreError>;

    async fn update(&self, id: Uuid, fields: DogFields) -> Result<DogRecord, StoreError>;

    async fn list(&self, filter: &DogFilter) -> Result<Vec<DogRecord>, StoreError>;

    async fn count(&self, filter: &DogFilter) -> Result<i64, StoreError>;

    /// Apply `transition` only if the record's current status is one of
    /// `transition.allowed_from()`. Returns whether a row changed.
    async fn apply_sync(&self, id: Uuid, transition: &SyncTransition) -> Result<bool, StoreError>;
}

/// Postgres when a URL is given (migrations are run), otherwise an
/// in-process store.
pub async fn open(database_url: Option<&str>) -> anyhow::Result<std::sync::Arc<dyn DogStore>> {
    match database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let db = postgres::PgStore::connect(url).await?;
            tracing::info!("Running migrations...");
            db.migrate().await?;
            Ok(std::sync::Arc::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; dogs are kept in memory only");
            Ok(std::sync::Arc::new(memory::MemoryStore::new()))
        }
    }
}
