//! Query parameters for list and read requests, and the list pipeline:
//! filter, sort, paginate, project.

use crate::config::ListConfig;
use crate::error::{Result, ServiceError};
use crate::projection::Projection;
use scim_filter::{AttributePath, FilterParser, Predicate, resolve};
use scim_types::ListResponse;
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub filter: Option<String>,
    pub attributes: Option<String>,
    pub excluded_attributes: Option<String>,
    pub start_index: Option<i64>,
    pub count: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQuery {
    pub attributes: Option<String>,
    pub excluded_attributes: Option<String>,
}

impl ResourceQuery {
    pub fn projection(&self, parser: &FilterParser) -> Result<Projection> {
        Projection::from_params(
            parser,
            self.attributes.as_deref(),
            self.excluded_attributes.as_deref(),
        )
    }
}

/// A validated list request. Built before any record is read, so malformed
/// parameters fail without touching the store.
pub struct ListPlan {
    predicate: Option<Predicate>,
    sort: Option<(AttributePath, SortOrder)>,
    projection: Projection,
    start_index: usize,
    count: usize,
}

impl ListPlan {
    pub fn new(query: &ListQuery, parser: &FilterParser, limits: &ListConfig) -> Result<Self> {
        let predicate = match non_empty(query.filter.as_deref()) {
            Some(filter) => Some(Predicate::compile(&parser.parse_filter(filter)?)),
            None => None,
        };

        let sort = match non_empty(query.sort_by.as_deref()) {
            Some(sort_by) => {
                let path = parser
                    .parse_path(sort_by)
                    .map_err(|e| ServiceError::InvalidValue(format!("Invalid sortBy: {}", e)))?;
                Some((path, query.sort_order.unwrap_or_default()))
            }
            None => None,
        };

        let projection = Projection::from_params(
            parser,
            query.attributes.as_deref(),
            query.excluded_attributes.as_deref(),
        )?;

        let start_index = query.start_index.unwrap_or(1).max(1) as usize;
        let requested = query.count.unwrap_or(limits.default_count as i64).max(0) as usize;

        Ok(Self {
            predicate,
            sort,
            projection,
            start_index,
            count: requested.min(limits.max_count),
        })
    }

    /// Runs the plan over a snapshot of resources. A type error on any
    /// resource aborts the whole listing.
    pub fn execute(&self, resources: Vec<Value>) -> Result<ListResponse> {
        let mut matched = Vec::with_capacity(resources.len());
        for resource in resources {
            let keep = match &self.predicate {
                Some(predicate) => predicate.evaluate(&resource)?,
                None => true,
            };
            if keep {
                matched.push(resource);
            }
        }

        if let Some((path, order)) = &self.sort {
            matched.sort_by(|a, b| compare_for_sort(resolve(path, a), resolve(path, b), *order));
        }

        let total = matched.len();
        let page = matched
            .into_iter()
            .skip(self.start_index - 1)
            .take(self.count)
            .map(|resource| self.projection.apply(resource))
            .collect();
        Ok(ListResponse::page(total, page, self.start_index))
    }
}

fn non_empty(param: Option<&str>) -> Option<&str> {
    param.filter(|p| !p.trim().is_empty())
}

/// Orders resources by a sort key. Missing keys sort last in either
/// direction.
fn compare_for_sort(a: Option<&Value>, b: Option<&Value>, order: SortOrder) -> Ordering {
    let (a, b) = match (a.filter(|v| !v.is_null()), b.filter(|v| !v.is_null())) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(a), Some(b)) => (a, b),
    };
    let ordering = compare_keys(a, b);
    match order {
        SortOrder::Ascending => ordering,
        SortOrder::Descending => ordering.reverse(),
    }
}

fn compare_keys(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
