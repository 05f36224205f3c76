use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::{DogFilter, DogStore, StoreError};
use crate::models::dog::{DogFields, DogRecord, NewDog, SyncTransition};

/// In-process store. Used when no `DATABASE_URL` is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    dogs: DashMap<Uuid, DogRecord>,
    /// Petfinder id → internal id. Guarded together with inserts so two
    /// concurrent creates cannot claim the same remote id.
    remote_ids: Mutex<std::collections::HashMap<String, Uuid>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.dogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dogs.is_empty()
    }
}

#[async_trait]
impl DogStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<DogRecord>, StoreError> {
        Ok(self.dogs.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_petfinder_id(&self, petfinder_id: &str) -> Result<Option<DogRecord>, StoreError> {
        let id = self
            .remote_ids
            .lock()
            .map_err(|_| StoreError::InvalidValue("remote id index poisoned".into()))?
            .get(petfinder_id)
            .copied();
        Ok(id.and_then(|id| self.dogs.get(&id).map(|r| r.value().clone())))
    }

    async fn create(&self, dog: NewDog) -> Result<DogRecord, StoreError> {
        let now = Utc::now();
        let record = DogRecord {
            id: Uuid::new_v4(),
            fields: dog.fields,
            sync: dog.sync,
            created_at: now,
            updated_at: now,
        };

        let mut index = self
            .remote_ids
            .lock()
            .map_err(|_| StoreError::InvalidValue("remote id index poisoned".into()))?;
        if let Some(remote) = &record.sync.petfinder_id {
            if index.contains_key(remote) {
                return Err(StoreError::DuplicatePetfinderId(remote.clone()));
            }
            index.insert(remote.clone(), record.id);
        }
        // Lock order is dogs → index elsewhere; never hold both here.
        drop(index);
        self.dogs.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: Uuid, fields: DogFields) -> Result<DogRecord, StoreError> {
        let mut entry = self.dogs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        entry.fields = fields;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn list(&self, filter: &DogFilter) -> Result<Vec<DogRecord>, StoreError> {
        let mut out: Vec<DogRecord> = self
            .dogs
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        out.sort_by_key(|r| r.created_at);
        Ok(out)
    }

    async fn count(&self, filter: &DogFilter) -> Result<i64, StoreError> {
        Ok(self.dogs.iter().filter(|r| filter.matches(r.value())).count() as i64)
    }

    async fn apply_sync(&self, id: Uuid, transition: &SyncTransition) -> Result<bool, StoreError> {
        let mut entry = self.dogs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if !transition.allowed_from().contains(&entry.sync.status) {
            return Ok(false);
        }

        let new_remote = match transition {
            SyncTransition::Synced {
                petfinder_id: Some(remote),
                ..
            } if entry.sync.petfinder_id.as_deref() != Some(remote.as_str()) => Some(remote.clone()),
            _ => None,
        };
        if let Some(remote) = new_remote {
            let mut index = self
                .remote_ids
                .lock()
                .map_err(|_| StoreError::InvalidValue("remote id index poisoned".into()))?;
            if index.get(&remote).is_some_and(|owner| *owner != id) {
                return Err(StoreError::DuplicatePetfinderId(remote));
            }
            if let Some(old) = &entry.sync.petfinder_id {
                index.remove(old);
            }
            index.insert(remote, id);
        }

        transition.apply(&mut entry.sync);
        entry.updated_at = Utc::now();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dog::{SyncState, SyncStatus};

    fn new_dog(name: &str, remote: Option<&str>) -> NewDog {
        NewDog {
            fields: DogFields::named(name, "Mutt"),
            sync: SyncState {
                petfinder_id: remote.map(String::from),
                ..SyncState::default()
            },
        }
    }

    #[tokio::test]
    async fn test_duplicate_petfinder_id_rejected() {
        let store = MemoryStore::new();
        store.create(new_dog("A", Some("1"))).await.unwrap();
        let err = store.create(new_dog("B", Some("1"))).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePetfinderId(id) if id == "1"));
        // Records without a remote id never collide.
        store.create(new_dog("C", None)).await.unwrap();
        store.create(new_dog("D", None)).await.unwrap();
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_apply_sync_is_guarded() {
        let store = MemoryStore::new();
        let dog = store.create(new_dog("A", None)).await.unwrap();

        let failed = SyncTransition::Failed { message: "x".into() };
        assert!(!store.apply_sync(dog.id, &failed).await.unwrap(), "NOT_SYNCED → ERROR rejected");

        assert!(store.apply_sync(dog.id, &SyncTransition::Syncing).await.unwrap());
        assert!(store.apply_sync(dog.id, &failed).await.unwrap());

        let stored = store.find_by_id(dog.id).await.unwrap().unwrap();
        assert_eq!(stored.sync.status, SyncStatus::Error);
        assert_eq!(stored.sync.errors, vec!["x"]);
    }

    #[tokio::test]
    async fn test_synced_indexes_new_remote_id() {
        let store = MemoryStore::new();
        let dog = store.create(new_dog("A", None)).await.unwrap();
        store.apply_sync(dog.id, &SyncTransition::Syncing).await.unwrap();
        store
            .apply_sync(
                dog.id,
                &SyncTransition::Synced {
                    petfinder_id: Some("77".into()),
                    method: "api".into(),
                    at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let found = store.find_by_petfinder_id("77").await.unwrap().unwrap();
        assert_eq!(found.id, dog.id);
    }

    #[tokio::test]
    async fn test_count_with_filter() {
        let store = MemoryStore::new();
        store.create(new_dog("A", Some("1"))).await.unwrap();
        store.create(new_dog("B", None)).await.unwrap();

        let all = store.count(&DogFilter::default()).await.unwrap();
        let remote = store
            .count(&DogFilter {
                has_petfinder_id: Some(true),
                ..DogFilter::default()
            })
            .await
            .unwrap();
        let not_synced = store.count(&DogFilter::with_status(&[SyncStatus::NotSynced])).await.unwrap();
        assert_eq!((all, remote, not_synced), (2, 1, 2));
    }
}
