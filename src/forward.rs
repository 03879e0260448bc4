//! Mirroring of local resource changes to a downstream SCIM server.

use crate::client::ScimClient;
use crate::config::ForwardConfig;
use crate::error::ServiceError;
use async_trait::async_trait;
use scim_types::ResourceType;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Replace,
    Remove,
}

/// A committed change to one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceChange {
    pub kind: ChangeKind,
    pub resource_type: ResourceType,
    pub id: Uuid,
    /// The resource as stored; `None` for removals.
    pub body: Option<Value>,
}

impl ResourceChange {
    pub fn add(resource_type: ResourceType, id: Uuid, body: Value) -> Self {
        Self {
            kind: ChangeKind::Add,
            resource_type,
            id,
            body: Some(body),
        }
    }

    pub fn replace(resource_type: ResourceType, id: Uuid, body: Value) -> Self {
        Self {
            kind: ChangeKind::Replace,
            resource_type,
            id,
            body: Some(body),
        }
    }

    pub fn remove(resource_type: ResourceType, id: Uuid) -> Self {
        Self {
            kind: ChangeKind::Remove,
            resource_type,
            id,
            body: None,
        }
    }
}

#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, change: &ResourceChange) -> Result<(), ServiceError>;
}

/// Used when no downstream server is configured.
pub struct NoopForwarder;

#[async_trait]
impl Forwarder for NoopForwarder {
    async fn forward(&self, change: &ResourceChange) -> Result<(), ServiceError> {
        tracing::trace!(
            "Forwarding disabled; dropping {:?} of {} {}",
            change.kind,
            change.resource_type,
            change.id
        );
        Ok(())
    }
}

/// Sends `POST {url}/{Type}s` on add, `PUT {url}/{Type}s/{id}` on replace and
/// `DELETE {url}/{Type}s/{id}` on remove.
pub struct ScimForwarder {
    client: ScimClient,
    entitlements: Vec<String>,
}

impl ScimForwarder {
    pub fn new(url: &str, config: &ForwardConfig) -> Result<Self, ServiceError> {
        let client = ScimClient::new(url, Some(config.auth_token.clone()), config.timeout())
            .map_err(|e| ServiceError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            entitlements: config.entitlements.clone(),
        })
    }

    /// The body sent for a creation, with configured entitlements attached.
    fn creation_body(&self, body: &Value) -> Value {
        let mut body = body.clone();
        if !self.entitlements.is_empty() {
            if let Value::Object(map) = &mut body {
                let entitlements = self
                    .entitlements
                    .iter()
                    .map(|value| json!({ "value": value }))
                    .collect();
                map.insert("entitlements".to_string(), Value::Array(entitlements));
            }
        }
        body
    }
}

#[async_trait]
impl Forwarder for ScimForwarder {
    async fn forward(&self, change: &ResourceChange) -> Result<(), ServiceError> {
        let id = change.id.to_string();
        let empty = Value::Null;
        let body = change.body.as_ref().unwrap_or(&empty);

        let result = match change.kind {
            ChangeKind::Add => self
                .client
                .create(change.resource_type, &self.creation_body(body))
                .await
                .map(|_| ()),
            ChangeKind::Replace => self
                .client
                .replace(change.resource_type, &id, body)
                .await
                .map(|_| ()),
            ChangeKind::Remove => self.client.delete(change.resource_type, &id).await,
        };

        result.map_err(|e| ServiceError::Forward(e.to_string()))?;
        tracing::info!(
            "Forwarded {:?} of {} {} to {}",
            change.kind,
            change.resource_type,
            change.id,
            self.client.base_url()
        );
        Ok(())
    }
}

/// Picks the forwarder for `config`: a `ScimForwarder` when a URL is set.
pub fn from_config(config: &ForwardConfig) -> Result<Arc<dyn Forwarder>, ServiceError> {
    match config.url.as_deref().filter(|url| !url.is_empty()) {
        Some(url) => {
            tracing::info!("Forwarding changes to {}", url);
            Ok(Arc::new(ScimForwarder::new(url, config)?))
        }
        None => Ok(Arc::new(NoopForwarder)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_body_adds_entitlements() {
        let config = ForwardConfig {
            url: Some("http://localhost:1".into()),
            entitlements: vec!["00eao000000cSL6".into()],
            ..Default::default()
        };
        let forwarder = ScimForwarder::new("http://localhost:1", &config).unwrap();
        let body = forwarder.creation_body(&json!({"userName": "bjensen"}));
        assert_eq!(
            body,
            json!({"userName": "bjensen", "entitlements": [{"value": "00eao000000cSL6"}]})
        );
    }

    #[test]
    fn test_creation_body_untouched_without_entitlements() {
        let forwarder = ScimForwarder::new("http://localhost:1", &ForwardConfig::default()).unwrap();
        let body = json!({"userName": "bjensen"});
        assert_eq!(forwarder.creation_body(&body), body);
    }
}
