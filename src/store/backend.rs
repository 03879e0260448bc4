use crate::error::ServiceError;
use async_trait::async_trait;
use scim_types::{Resource, ResourceType};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("{resource_type} '{id}' not found")]
    NotFound { resource_type: ResourceType, id: Uuid },

    #[error("{resource_type} conflicts with existing record '{existing}'")]
    Conflict {
        resource_type: ResourceType,
        existing: Uuid,
    },
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { resource_type, id } => ServiceError::NotFound {
                resource_type,
                id: id.to_string(),
            },
            StoreError::Conflict { .. } => ServiceError::Conflict(err.to_string()),
        }
    }
}

/// Turns the stored record into its replacement. Runs with the store locked.
pub type Modify<T> = Box<dyn FnOnce(T) -> Result<T, ServiceError> + Send>;

/// Record storage for one resource type, keyed by id.
#[async_trait]
pub trait Store<T: Resource>: Send + Sync {
    /// Inserts a new record. Fails if it conflicts with any stored record.
    async fn create(&self, record: T) -> Result<T, StoreError>;

    async fn get(&self, id: Uuid) -> Result<T, StoreError>;

    /// Replaces record `id` with `change(current)`, checking uniqueness
    /// against the others. No other write lands between the read and the write.
    async fn modify(&self, id: Uuid, change: Modify<T>) -> Result<T, ServiceError>;

    /// Removes a record and returns it.
    async fn delete(&self, id: Uuid) -> Result<T, StoreError>;

    /// A snapshot of every record, in insertion order.
    async fn list(&self) -> Vec<T>;
}
