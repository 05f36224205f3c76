//! Pull adoptable dogs from Petfinder into the local store.
//!
//! Pages are fetched strictly one after another with a pause in between.
//! A record is keyed by its Petfinder id: one that is already present is
//! skipped and left untouched. Failures on single records are collected and
//! the run continues; a failed page fetch ends the run with what was
//! imported so far.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::models::dog::{NewDog, SyncState, SyncStatus};
use crate::models::petfinder::Animal;
use crate::models::results::ImportResult;
use crate::petfinder::{AnimalQuery, AnimalSource, PetfinderError, SearchCriteria};
use crate::store::{DogStore, StoreError};
use crate::sync::translate::remote_to_internal;

pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Sync method recorded on dogs created by an import.
pub const IMPORT_METHOD: &str = "import";

enum Outcome {
    Imported,
    Skipped,
}

pub struct Importer {
    source: Arc<dyn AnimalSource>,
    store: Arc<dyn DogStore>,
    page_delay: Duration,
    fetch_timeout: Duration,
}

impl Importer {
    pub fn new(source: Arc<dyn AnimalSource>, store: Arc<dyn DogStore>) -> Self {
        Self {
            source,
            store,
            page_delay: DEFAULT_PAGE_DELAY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub async fn import_from_organization(&self, org_id: &str) -> ImportResult {
        tracing::info!(org_id = %org_id, "Importing dogs from organization");
        let result = self.import_pages(AnimalQuery::organization(org_id)).await;
        log_summary(&result);
        result
    }

    pub async fn import_from_search(&self, criteria: &SearchCriteria) -> ImportResult {
        tracing::info!(criteria = ?criteria, "Importing dogs from search");
        let result = self.import_pages(AnimalQuery::search(criteria)).await;
        log_summary(&result);
        result
    }

    /// Import a single animal by its Petfinder id.
    pub async fn import_animal(&self, petfinder_id: u64) -> ImportResult {
        let fetched = self
            .bounded(self.source.fetch_animal(petfinder_id))
            .await;
        match fetched {
            Ok(animal) => self.import_batch(std::slice::from_ref(&animal)).await,
            Err(e) => {
                tracing::warn!(petfinder_id, error = %e, "Failed to fetch animal");
                ImportResult::default()
                    .with_error(format!("Failed to fetch animal {}: {}", petfinder_id, e))
            }
        }
    }

    async fn import_pages(&self, query: AnimalQuery) -> ImportResult {
        let mut total = ImportResult::default();
        let mut page = 1;

        loop {
            let query = query.clone().with_page(page);
            let fetched = match self.bounded(self.source.fetch_page(&query)).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(page, error = %e, "Page fetch failed, stopping import");
                    return total.with_error(format!("Failed to fetch page {}: {}", page, e));
                }
            };

            let page_result = self.import_batch(&fetched.animals).await;
            tracing::debug!(
                page,
                total_pages = fetched.pagination.total_pages,
                imported = page_result.imported,
                skipped = page_result.skipped,
                "Page imported"
            );
            total = total.merge(page_result);

            if page >= fetched.pagination.total_pages {
                return total;
            }
            page += 1;
            tokio::time::sleep(self.page_delay).await;
        }
    }

    async fn import_batch(&self, animals: &[Animal]) -> ImportResult {
        let mut result = ImportResult::default();
        for animal in animals {
            match self.import_one(animal).await {
                Ok(Outcome::Imported) => result.imported += 1,
                Ok(Outcome::Skipped) => result.skipped += 1,
                Err(e) => {
                    tracing::warn!(petfinder_id = animal.id, error = %e, "Failed to import dog");
                    result
                        .errors
                        .push(format!("Failed to import {} ({}): {}", animal.name, animal.id, e));
                }
            }
        }
        result
    }

    async fn import_one(&self, animal: &Animal) -> Result<Outcome, StoreError> {
        let remote_id = animal.id.to_string();
        if self.store.find_by_petfinder_id(&remote_id).await?.is_some() {
            return Ok(Outcome::Skipped);
        }

        let dog = NewDog {
            fields: remote_to_internal(animal),
            sync: SyncState {
                status: SyncStatus::Synced,
                petfinder_id: Some(remote_id),
                last_synced_at: Some(Utc::now()),
                method: Some(IMPORT_METHOD.to_string()),
                errors: Vec::new(),
            },
        };

        match self.store.create(dog).await {
            Ok(created) => {
                tracing::debug!(dog_id = %created.id, petfinder_id = animal.id, "Imported dog");
                Ok(Outcome::Imported)
            }
            // Another run created it between our lookup and insert.
            Err(StoreError::DuplicatePetfinderId(_)) => Ok(Outcome::Skipped),
            Err(e) => Err(e),
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, PetfinderError>>,
    ) -> Result<T, PetfinderError> {
        tokio::time::timeout(self.fetch_timeout, fut)
            .await
            .unwrap_or_else(|_| Err(PetfinderError::Timeout(self.fetch_timeout)))
    }
}

fn log_summary(result: &ImportResult) {
    tracing::info!(
        imported = result.imported,
        skipped = result.skipped,
        errors = result.errors.len(),
        "Import finished"
    );
}
