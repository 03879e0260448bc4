use crate::schema::{ERROR_SCHEMA, ResourceType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a JSON document is not a valid resource.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    #[error("Resource is missing the required attribute '{0}'")]
    MissingAttribute(String),

    #[error("Resource does not declare the schema '{0}'")]
    MissingSchema(&'static str),

    #[error("Schema '{schema}' is not supported for {resource_type} resources")]
    UnknownSchema {
        schema: String,
        resource_type: ResourceType,
    },

    #[error("Invalid resource: {0}")]
    Invalid(String),
}

impl ResourceError {
    pub(crate) fn from_serde(err: serde_json::Error) -> Self {
        let message = err.to_string();
        // serde reports e.g. "missing field `userName` at line 1 column 2".
        match message
            .strip_prefix("missing field `")
            .and_then(|rest| rest.split('`').next())
        {
            Some(field) => ResourceError::MissingAttribute(field.to_string()),
            None => ResourceError::Invalid(message),
        }
    }
}

/// The body of every SCIM error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub schemas: Vec<String>,
    /// HTTP status code, as a string.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<String>,
    pub detail: String,
}

impl ErrorBody {
    pub fn new(status: u16, scim_type: Option<&str>, detail: impl Into<String>) -> Self {
        Self {
            schemas: vec![ERROR_SCHEMA.to_string()],
            status: status.to_string(),
            scim_type: scim_type.map(str::to_string),
            detail: detail.into(),
        }
    }
}
