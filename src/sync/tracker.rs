use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::dog::SyncTransition;
use crate::store::{DogStore, StoreError};

/// Moves a dog's sync state through `NOT_SYNCED → SYNCING → SYNCED | ERROR`.
///
/// Each call is one conditional store update; `Ok(false)` means the record
/// was not in a state the transition may start from and nothing changed.
#[derive(Clone)]
pub struct SyncTracker {
    store: Arc<dyn DogStore>,
}

impl SyncTracker {
    pub fn new(store: Arc<dyn DogStore>) -> Self {
        Self { store }
    }

    pub async fn mark_syncing(&self, id: Uuid) -> Result<bool, StoreError> {
        self.apply(id, SyncTransition::Syncing).await
    }

    /// Keeps the stored Petfinder id when `petfinder_id` is `None`.
    pub async fn mark_synced(
        &self,
        id: Uuid,
        petfinder_id: Option<String>,
        method: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.apply(
            id,
            SyncTransition::Synced {
                petfinder_id,
                method: method.to_string(),
                at,
            },
        )
        .await
    }

    pub async fn mark_error(&self, id: Uuid, message: &str) -> Result<bool, StoreError> {
        self.apply(
            id,
            SyncTransition::Failed {
                message: message.to_string(),
            },
        )
        .await
    }

    async fn apply(&self, id: Uuid, transition: SyncTransition) -> Result<bool, StoreError> {
        let applied = self.store.apply_sync(id, &transition).await?;
        if applied {
            tracing::debug!(dog_id = %id, status = transition.target().as_str(), "Sync status updated");
        } else {
            tracing::warn!(dog_id = %id, status = transition.target().as_str(), "Sync transition not allowed");
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dog::{DogFields, NewDog, SyncState, SyncStatus};
    use crate::store::memory::MemoryStore;

    async fn setup(remote: Option<&str>) -> (SyncTracker, Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let dog = store
            .create(NewDog {
                fields: DogFields::named("Rex", "Boxer"),
                sync: SyncState {
                    petfinder_id: remote.map(String::from),
                    ..SyncState::default()
                },
            })
            .await
            .unwrap();
        (SyncTracker::new(store.clone()), store, dog.id)
    }

    #[tokio::test]
    async fn test_happy_path() {
        let (tracker, store, id) = setup(None).await;
        assert!(tracker.mark_syncing(id).await.unwrap());
        assert!(tracker.mark_synced(id, Some("900".into()), "api", Utc::now()).await.unwrap());

        let dog = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(dog.sync.status, SyncStatus::Synced);
        assert_eq!(dog.sync.petfinder_id.as_deref(), Some("900"));
        assert_eq!(dog.sync.method.as_deref(), Some("api"));
    }

    #[tokio::test]
    async fn test_synced_without_id_keeps_existing() {
        let (tracker, store, id) = setup(Some("123")).await;
        tracker.mark_syncing(id).await.unwrap();
        tracker.mark_synced(id, None, "ftp", Utc::now()).await.unwrap();

        let dog = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(dog.sync.petfinder_id.as_deref(), Some("123"));
    }

    #[tokio::test]
    async fn test_errors_accumulate() {
        let (tracker, store, id) = setup(None).await;
        tracker.mark_syncing(id).await.unwrap();
        tracker.mark_error(id, "first").await.unwrap();
        tracker.mark_syncing(id).await.unwrap();
        tracker.mark_error(id, "second").await.unwrap();

        let dog = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(dog.sync.status, SyncStatus::Error);
        assert_eq!(dog.sync.errors, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_synced_requires_syncing() {
        let (tracker, _store, id) = setup(None).await;
        assert!(!tracker.mark_synced(id, None, "ftp", Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_dog_is_not_found() {
        let (tracker, _store, _) = setup(None).await;
        let err = tracker.mark_syncing(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
