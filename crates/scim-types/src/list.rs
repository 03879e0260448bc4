use crate::schema::LIST_RESPONSE_SCHEMA;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A page of query results.
///
/// An empty result carries only `schemas` and `totalResults`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub schemas: Vec<String>,
    pub total_results: usize,
    #[serde(rename = "Resources", default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<usize>,
}

impl ListResponse {
    /// Builds a response for one page. `start_index` is 1-based;
    /// `itemsPerPage` is the number of resources actually returned.
    pub fn page(total_results: usize, resources: Vec<Value>, start_index: usize) -> Self {
        if total_results == 0 {
            return Self {
                schemas: vec![LIST_RESPONSE_SCHEMA.to_string()],
                total_results,
                resources: None,
                start_index: None,
                items_per_page: None,
            };
        }
        Self {
            schemas: vec![LIST_RESPONSE_SCHEMA.to_string()],
            total_results,
            items_per_page: Some(resources.len()),
            resources: Some(resources),
            start_index: Some(start_index),
        }
    }

    pub fn resources(&self) -> &[Value] {
        self.resources.as_deref().unwrap_or_default()
    }
}
