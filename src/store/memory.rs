use crate::error::ServiceError;
use crate::store::backend::{Modify, Store, StoreError};
use async_trait::async_trait;
use indexmap::IndexMap;
use scim_types::Resource;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory store. Records are lost on restart.
pub struct MemoryStore<T> {
    records: RwLock<IndexMap<Uuid, T>>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(IndexMap::new()),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found<T: Resource>(id: Uuid) -> StoreError {
    StoreError::NotFound {
        resource_type: T::RESOURCE_TYPE,
        id,
    }
}

fn find_conflict<'a, T: Resource>(
    record: &T,
    others: impl IntoIterator<Item = &'a T>,
) -> Result<(), StoreError> {
    match others.into_iter().find(|other| record.conflicts_with(other)) {
        Some(other) => Err(StoreError::Conflict {
            resource_type: T::RESOURCE_TYPE,
            existing: other.id(),
        }),
        None => Ok(()),
    }
}

#[async_trait]
impl<T: Resource> Store<T> for MemoryStore<T> {
    async fn create(&self, record: T) -> Result<T, StoreError> {
        let mut records = self.records.write().await;
        find_conflict(&record, records.values())?;
        records.insert(record.id(), record.clone());
        tracing::debug!("Stored {} {}", T::RESOURCE_TYPE, record.id());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<T, StoreError> {
        let records = self.records.read().await;
        records.get(&id).cloned().ok_or_else(|| not_found::<T>(id))
    }

    async fn modify(&self, id: Uuid, change: Modify<T>) -> Result<T, ServiceError> {
        let mut records = self.records.write().await;
        let current = records.get(&id).cloned().ok_or_else(|| not_found::<T>(id))?;
        let record = change(current)?;
        if record.id() != id {
            return Err(ServiceError::Mutability(
                "Attribute 'id' cannot be changed".to_string(),
            ));
        }
        find_conflict(
            &record,
            records.iter().filter(|(key, _)| **key != id).map(|(_, r)| r),
        )?;
        records.insert(id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<T, StoreError> {
        let mut records = self.records.write().await;
        records.shift_remove(&id).ok_or_else(|| not_found::<T>(id))
    }

    async fn list(&self) -> Vec<T> {
        self.records.read().await.values().cloned().collect()
    }
}
