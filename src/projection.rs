//! Attribute selection for responses (`attributes` / `excludedAttributes`).

use crate::error::ServiceError;
use itertools::Itertools;
use scim_filter::{AttributePath, FilterParser, delete, resolve, write};
use serde_json::{Map, Value};

/// Attributes that are always returned.
const REQUIRED_ATTRIBUTES: [&str; 2] = ["id", "schemas"];

fn is_required(path: &AttributePath) -> bool {
    REQUIRED_ATTRIBUTES.iter().any(|name| path.is_single(name))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Include(Vec<AttributePath>),
    Exclude(Vec<AttributePath>),
}

impl Projection {
    /// Builds a projection from the raw query parameters. Empty parameters are
    /// ignored; giving both is an error.
    pub fn from_params(
        parser: &FilterParser,
        attributes: Option<&str>,
        excluded_attributes: Option<&str>,
    ) -> Result<Self, ServiceError> {
        let attributes = attributes.filter(|s| !s.trim().is_empty());
        let excluded = excluded_attributes.filter(|s| !s.trim().is_empty());

        let parse = |list: &str| {
            parser
                .parse_path_list(list)
                .map_err(|e| ServiceError::InvalidValue(format!("Invalid attribute list: {}", e)))
        };

        match (attributes, excluded) {
            (Some(_), Some(_)) => Err(ServiceError::InvalidValue(
                "attributes and excludedAttributes cannot be combined".to_string(),
            )),
            (Some(list), None) => Ok(Projection::Include(parse(list)?)),
            (None, Some(list)) => Ok(Projection::Exclude(parse(list)?)),
            (None, None) => Ok(Projection::All),
        }
    }

    pub fn apply(&self, resource: Value) -> Value {
        match self {
            Projection::All => resource,
            Projection::Include(paths) => include(&resource, paths),
            Projection::Exclude(paths) => exclude(resource, paths),
        }
    }
}

fn include(resource: &Value, paths: &[AttributePath]) -> Value {
    let mut projected = Value::Object(Map::new());
    if let (Value::Object(out), Value::Object(source)) = (&mut projected, resource) {
        for name in REQUIRED_ATTRIBUTES {
            if let Some(value) = source.get(name) {
                out.insert(name.to_string(), value.clone());
            }
        }
    }

    for path in paths.iter().filter(|p| !is_required(p)).unique() {
        let Some(value) = resolve(path, resource) else {
            continue;
        };
        if let Err(e) = write(path, &mut projected, value.clone()) {
            tracing::debug!("Skipping attribute '{}' in projection: {}", path, e);
        }
    }
    projected
}

fn exclude(mut resource: Value, paths: &[AttributePath]) -> Value {
    for path in paths.iter().filter(|p| !is_required(p)) {
        delete(path, &mut resource);
    }
    resource
}
