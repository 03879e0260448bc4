use crate::error::ResourceError;
use crate::meta::Meta;
use crate::schema::ResourceType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Behaviour shared by every stored SCIM resource.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const RESOURCE_TYPE: ResourceType;

    fn id(&self) -> Uuid;

    fn meta(&self) -> &Meta;

    fn meta_mut(&mut self) -> &mut Meta;

    /// True when `self` and `other` may not be stored side by side.
    fn conflicts_with(&self, other: &Self) -> bool;

    /// The JSON representation returned to clients.
    fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Validates and decodes a JSON document.
    fn from_value(value: Value) -> Result<Self, ResourceError> {
        parse_resource(Self::RESOURCE_TYPE, value)
    }
}

/// A reference from one resource to another, e.g. a group member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Checks the declared schemas, lifts attributes nested under the core schema
/// URN to the top level, then decodes.
pub fn parse_resource<T: DeserializeOwned>(
    resource_type: ResourceType,
    mut value: Value,
) -> Result<T, ResourceError> {
    let Value::Object(map) = &mut value else {
        return Err(ResourceError::Invalid("expected a JSON object".to_string()));
    };
    check_schemas(resource_type, map)?;
    lift_core_attributes(resource_type, map);
    serde_json::from_value(value).map_err(ResourceError::from_serde)
}

fn check_schemas(resource_type: ResourceType, map: &Map<String, Value>) -> Result<(), ResourceError> {
    let schemas = match map.get("schemas") {
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ResourceError::Invalid(
                "'schemas' must be an array of strings".to_string(),
            ));
        }
        None => return Err(ResourceError::MissingAttribute("schemas".to_string())),
    };

    let mut has_core = false;
    for schema in schemas {
        let Some(schema) = schema.as_str() else {
            return Err(ResourceError::Invalid(
                "'schemas' must be an array of strings".to_string(),
            ));
        };
        if !resource_type.known_schemas().contains(&schema) {
            return Err(ResourceError::UnknownSchema {
                schema: schema.to_string(),
                resource_type,
            });
        }
        has_core |= schema == resource_type.core_schema();
    }

    if has_core {
        Ok(())
    } else {
        Err(ResourceError::MissingSchema(resource_type.core_schema()))
    }
}

// Some clients send core attributes wrapped in an object keyed by the core
// schema URN. Top-level attributes win on collision.
fn lift_core_attributes(resource_type: ResourceType, map: &mut Map<String, Value>) {
    if let Some(Value::Object(nested)) = map.shift_remove(resource_type.core_schema()) {
        for (key, value) in nested {
            map.entry(key).or_insert(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{GROUP_SCHEMA, USER_SCHEMA};
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Probe {
        user_name: String,
    }

    #[test]
    fn test_core_attributes_are_lifted() {
        let probe: Probe = parse_resource(
            ResourceType::User,
            json!({"schemas": [USER_SCHEMA], USER_SCHEMA: {"userName": "bjensen"}}),
        )
        .unwrap();
        assert_eq!(probe.user_name, "bjensen");
    }

    #[test]
    fn test_schema_checks() {
        let missing = parse_resource::<Probe>(ResourceType::User, json!({"userName": "x"}));
        assert_eq!(
            missing.unwrap_err(),
            ResourceError::MissingAttribute("schemas".into())
        );

        let wrong = parse_resource::<Probe>(
            ResourceType::User,
            json!({"schemas": [GROUP_SCHEMA], "userName": "x"}),
        );
        assert!(matches!(wrong, Err(ResourceError::UnknownSchema { .. })));

        let missing_field =
            parse_resource::<Probe>(ResourceType::User, json!({"schemas": [USER_SCHEMA]}));
        assert_eq!(
            missing_field.unwrap_err(),
            ResourceError::MissingAttribute("userName".into())
        );
    }

    #[test]
    fn test_resource_ref_uses_dollar_ref() {
        let member: ResourceRef = serde_json::from_value(json!({
            "$ref": "https://example.com/Users/1",
            "value": "1"
        }))
        .unwrap();
        assert_eq!(member.reference.as_deref(), Some("https://example.com/Users/1"));
        assert_eq!(
            serde_json::to_value(&member).unwrap(),
            json!({"$ref": "https://example.com/Users/1", "value": "1"})
        );
    }
}
