use crate::schema::ResourceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-maintained resource metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub resource_type: ResourceType,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Meta {
    /// Metadata for a resource created now, at version `1`.
    pub fn new(resource_type: ResourceType, location: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            resource_type,
            created: now,
            last_modified: now,
            location: location.into(),
            version: Some("1".to_string()),
        }
    }

    /// Marks the resource as modified: updates `lastModified` and increments
    /// a numeric version.
    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
        let next = self
            .version
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(1, |v| v + 1);
        self.version = Some(next.to_string());
    }
}
