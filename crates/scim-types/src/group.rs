use crate::meta::Meta;
use crate::resource::{Resource, ResourceRef};
use crate::schema::ResourceType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A SCIM Group resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub schemas: Vec<String>,
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub meta: Meta,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<ResourceRef>,
}

impl Resource for Group {
    const RESOURCE_TYPE: ResourceType = ResourceType::Group;

    fn id(&self) -> Uuid {
        self.id
    }

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn conflicts_with(&self, other: &Self) -> bool {
        self.id == other.id
    }

    /// Also emits `name` mirroring `displayName`, which some downstream
    /// SCIM services expect.
    fn to_value(&self) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.insert("name".to_string(), Value::String(self.display_name.clone()));
        }
        Ok(value)
    }
}
