//! Reading, writing and deleting values addressed by an `AttributePath`.
use crate::ast::AttributePath;
use crate::error::FilterError;
use serde_json::{Map, Value};

/// Follows `path` through nested objects. Any missing key or non-object
/// intermediate yields `None`.
pub fn resolve<'v>(path: &AttributePath, root: &'v Value) -> Option<&'v Value> {
    path.segments()
        .iter()
        .try_fold(root, |current, segment| current.as_object()?.get(segment))
}

pub fn resolve_mut<'v>(path: &AttributePath, root: &'v mut Value) -> Option<&'v mut Value> {
    path.segments()
        .iter()
        .try_fold(root, |current, segment| current.as_object_mut()?.get_mut(segment))
}

/// Writes `value` at `path`, creating missing intermediate objects.
///
/// At the final segment an existing object is shallow-merged with an incoming
/// object, an existing array receives the value as a new element, and
/// anything else is overwritten.
pub fn write(path: &AttributePath, root: &mut Value, value: Value) -> Result<(), FilterError> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Ok(());
    };

    let mut current = root;
    for segment in parents {
        let map = as_container(current, segment)?;
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let map = as_container(current, last)?;
    match map.get_mut(last) {
        Some(Value::Object(existing)) if value.is_object() => {
            if let Value::Object(incoming) = value {
                existing.extend(incoming);
            }
        }
        Some(Value::Array(items)) => items.push(value),
        _ => {
            map.insert(last.clone(), value);
        }
    }
    Ok(())
}

fn as_container<'v>(value: &'v mut Value, segment: &str) -> Result<&'v mut Map<String, Value>, FilterError> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    value.as_object_mut().ok_or_else(|| FilterError::NotAnObject {
        segment: segment.to_string(),
    })
}

/// Removes the value at `path`, then prunes any parent objects left empty.
/// The root itself is never removed. Returns `false` if nothing was there.
pub fn delete(path: &AttributePath, root: &mut Value) -> bool {
    let segments = path.segments();
    if segments.is_empty() {
        return false;
    }

    // Size of each container along the path, root first.
    let mut sizes = Vec::with_capacity(segments.len());
    let mut current = &*root;
    for segment in segments {
        let Some(map) = current.as_object() else {
            return false;
        };
        sizes.push(map.len());
        match map.get(segment) {
            Some(next) => current = next,
            None => return false,
        }
    }

    let mut cut = segments.len() - 1;
    while cut >= 1 && sizes[cut] == 1 {
        cut -= 1;
    }

    let mut container = root;
    for segment in &segments[..cut] {
        match container.get_mut(segment) {
            Some(next) => container = next,
            None => return false,
        }
    }
    container
        .as_object_mut()
        .and_then(|map| map.shift_remove(&segments[cut]))
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(dotted: &str) -> AttributePath {
        AttributePath::new(dotted.split('.')).unwrap()
    }

    #[test]
    fn test_resolve_nested() {
        let doc = json!({"name": {"givenName": "Mark"}, "tags": ["a"]});
        assert_eq!(resolve(&path("name.givenName"), &doc), Some(&json!("Mark")));
        assert_eq!(resolve(&path("name.familyName"), &doc), None);
        assert_eq!(resolve(&path("tags.value"), &doc), None);
    }

    #[test]
    fn test_write_creates_intermediates() {
        let mut doc = json!({"id": "1"});
        write(&path("name.givenName"), &mut doc, json!("Mark")).unwrap();
        assert_eq!(doc, json!({"id": "1", "name": {"givenName": "Mark"}}));
    }

    #[test]
    fn test_write_merges_objects_and_appends_arrays() {
        let mut doc = json!({"name": {"givenName": "Mark"}, "emails": [{"value": "a@x"}]});
        write(&path("name"), &mut doc, json!({"familyName": "Jones"})).unwrap();
        write(&path("emails"), &mut doc, json!({"value": "b@x"})).unwrap();
        assert_eq!(
            doc,
            json!({
                "name": {"givenName": "Mark", "familyName": "Jones"},
                "emails": [{"value": "a@x"}, {"value": "b@x"}]
            })
        );
    }

    #[test]
    fn test_write_through_scalar_fails() {
        let mut doc = json!({"userName": "bob"});
        let err = write(&path("userName.first"), &mut doc, json!(1)).unwrap_err();
        assert_eq!(
            err,
            FilterError::NotAnObject {
                segment: "first".into()
            }
        );
    }

    #[test]
    fn test_delete_prunes_empty_parents() {
        let mut doc = json!({"id": "1", "a": {"b": {"c": 1}}});
        assert!(delete(&path("a.b.c"), &mut doc));
        assert_eq!(doc, json!({"id": "1"}));
    }

    #[test]
    fn test_delete_keeps_non_empty_parents() {
        let mut doc = json!({"name": {"first": "foo", "last": "bar"}});
        assert!(delete(&path("name.first"), &mut doc));
        assert_eq!(doc, json!({"name": {"last": "bar"}}));
    }

    #[test]
    fn test_delete_never_removes_root() {
        let mut doc = json!({"only": {"leaf": true}});
        assert!(delete(&path("only.leaf"), &mut doc));
        assert_eq!(doc, json!({}));
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let mut doc = json!({"name": {"first": "foo"}});
        assert!(!delete(&path("name.last"), &mut doc));
        assert!(!delete(&path("nick.name"), &mut doc));
        assert_eq!(doc, json!({"name": {"first": "foo"}}));
    }
}
