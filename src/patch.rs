//! SCIM PATCH (`add` / `replace` / `remove`) over a resource's JSON form.
//!
//! Operations run in order against the value. The caller re-validates the
//! result as a typed resource before storing it, so a PATCH can never leave a
//! record that a PUT would have rejected.

use crate::error::ServiceError;
use scim_filter::{
    AttributePath, Filter, FilterParser, PatchPath, Predicate, delete, resolve_mut, write,
};
use scim_types::{PatchOp, PatchOpKind, PatchOperation};
use serde_json::Value;

/// Top-level attributes no PATCH may touch.
const READ_ONLY: [&str; 2] = ["id", "meta"];

pub fn apply_patch(
    resource: &mut Value,
    patch: &PatchOp,
    parser: &FilterParser,
) -> Result<(), ServiceError> {
    if !patch.declares_schema() {
        return Err(ServiceError::InvalidSyntax(
            "PATCH body must declare the PatchOp schema".to_string(),
        ));
    }
    for operation in &patch.operations {
        apply_operation(resource, operation, parser)?;
    }
    Ok(())
}

fn apply_operation(
    resource: &mut Value,
    operation: &PatchOperation,
    parser: &FilterParser,
) -> Result<(), ServiceError> {
    let path = operation.path.as_deref().filter(|p| !p.trim().is_empty());
    let Some(path) = path else {
        return apply_to_root(resource, operation);
    };

    let target = parser
        .parse_patch_path(path)
        .map_err(|e| ServiceError::InvalidPath(e.to_string()))?;
    if let Some(first) = target.attribute.segments().first() {
        check_mutable(first)?;
    }
    tracing::trace!("PATCH {:?} {}", operation.op, path);

    match (operation.op, &target.value_filter) {
        (PatchOpKind::Add, None) => add(resource, &target.full_path(), required_value(operation)?),
        (PatchOpKind::Replace, None) => {
            replace(resource, &target.full_path(), required_value(operation)?)
        }
        (PatchOpKind::Remove, None) => remove(resource, &target.full_path()),
        (PatchOpKind::Add, Some(filter)) => {
            let value = required_value(operation)?;
            update_matches(resource, &target, filter, |element| match &target.sub_attribute {
                Some(sub) => add(element, &single(sub)?, value.clone()),
                None => merge(element, value.clone()),
            })
        }
        (PatchOpKind::Replace, Some(filter)) => {
            let value = required_value(operation)?;
            update_matches(resource, &target, filter, |element| match &target.sub_attribute {
                Some(sub) => replace(element, &single(sub)?, value.clone()),
                None => {
                    *element = value.clone();
                    Ok(())
                }
            })
        }
        (PatchOpKind::Remove, Some(filter)) => remove_matches(resource, &target, filter),
    }
}

/// An operation without a path applies each member of its object value.
fn apply_to_root(resource: &mut Value, operation: &PatchOperation) -> Result<(), ServiceError> {
    if operation.op == PatchOpKind::Remove {
        return Err(ServiceError::NoTarget(
            "remove requires a path".to_string(),
        ));
    }
    let Value::Object(members) = required_value(operation)? else {
        return Err(ServiceError::InvalidValue(
            "an operation without a path needs an object value".to_string(),
        ));
    };

    for (name, value) in members {
        check_mutable(&name)?;
        let path = single(&name)?;
        match operation.op {
            PatchOpKind::Add => add(resource, &path, value)?,
            _ => replace(resource, &path, value)?,
        }
    }
    Ok(())
}

fn add(resource: &mut Value, path: &AttributePath, value: Value) -> Result<(), ServiceError> {
    if let (Some(Value::Array(items)), Value::Array(incoming)) = (resolve_mut(path, resource), &value)
    {
        items.extend(incoming.iter().cloned());
        return Ok(());
    }
    write(path, resource, value)?;
    Ok(())
}

fn replace(resource: &mut Value, path: &AttributePath, value: Value) -> Result<(), ServiceError> {
    if let Some(existing) = resolve_mut(path, resource) {
        if existing.is_array() {
            *existing = value;
            return Ok(());
        }
    }
    write(path, resource, value)?;
    Ok(())
}

fn remove(resource: &mut Value, path: &AttributePath) -> Result<(), ServiceError> {
    if delete(path, resource) {
        Ok(())
    } else {
        Err(no_target(path))
    }
}

fn merge(element: &mut Value, value: Value) -> Result<(), ServiceError> {
    if let (Value::Object(existing), Value::Object(incoming)) = (&mut *element, &value) {
        existing.extend(incoming.iter().map(|(k, v)| (k.clone(), v.clone())));
    } else {
        *element = value;
    }
    Ok(())
}

/// Runs `update` on every element of the multi-valued attribute that matches
/// `filter`. Fails with `noTarget` when nothing matches.
fn update_matches<F>(
    resource: &mut Value,
    target: &PatchPath,
    filter: &Filter,
    mut update: F,
) -> Result<(), ServiceError>
where
    F: FnMut(&mut Value) -> Result<(), ServiceError>,
{
    let predicate = Predicate::compile(filter);
    let items = multi_valued(resource, &target.attribute)?;

    let mut matched = 0;
    for element in items.iter_mut() {
        if predicate.evaluate(element)? {
            update(element)?;
            matched += 1;
        }
    }
    if matched == 0 {
        return Err(no_match(target));
    }
    Ok(())
}

fn remove_matches(
    resource: &mut Value,
    target: &PatchPath,
    filter: &Filter,
) -> Result<(), ServiceError> {
    if let Some(sub) = &target.sub_attribute {
        let sub = single(sub)?;
        return update_matches(resource, target, filter, |element| {
            delete(&sub, element);
            Ok(())
        });
    }

    let predicate = Predicate::compile(filter);
    let items = multi_valued(resource, &target.attribute)?;
    let keep = items
        .iter()
        .map(|element| predicate.evaluate(element).map(|matched| !matched))
        .collect::<Result<Vec<_>, _>>()?;
    if keep.iter().all(|k| *k) {
        return Err(no_match(target));
    }

    let mut flags = keep.into_iter();
    items.retain(|_| flags.next().unwrap_or(true));
    if items.is_empty() {
        delete(&target.attribute, resource);
    }
    Ok(())
}

fn multi_valued<'v>(
    resource: &'v mut Value,
    path: &AttributePath,
) -> Result<&'v mut Vec<Value>, ServiceError> {
    match resolve_mut(path, resource) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ServiceError::InvalidPath(format!(
            "'{}' is not multi-valued",
            path
        ))),
        None => Err(no_target(path)),
    }
}

fn check_mutable(attribute: &str) -> Result<(), ServiceError> {
    if READ_ONLY.contains(&attribute) {
        return Err(ServiceError::Mutability(format!(
            "Attribute '{}' is read-only",
            attribute
        )));
    }
    Ok(())
}

fn required_value(operation: &PatchOperation) -> Result<Value, ServiceError> {
    operation.value.clone().ok_or_else(|| {
        ServiceError::InvalidValue(format!("{:?} operation requires a value", operation.op))
    })
}

fn single(name: &str) -> Result<AttributePath, ServiceError> {
    AttributePath::new([name])
        .ok_or_else(|| ServiceError::InvalidPath(format!("Invalid attribute '{}'", name)))
}

fn no_target(path: &AttributePath) -> ServiceError {
    ServiceError::NoTarget(format!("No value at '{}'", path))
}

fn no_match(target: &PatchPath) -> ServiceError {
    ServiceError::NoTarget(format!("No element of '{}' matches", target.attribute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scim_types::schema::PATCH_OP_SCHEMA;
    use serde_json::json;

    fn user() -> Value {
        json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "id": "2819c223",
            "userName": "bjensen",
            "active": true,
            "name": {"givenName": "Barbara", "familyName": "Jensen"},
            "emails": [
                {"value": "bjensen@example.com", "type": "work", "primary": true},
                {"value": "babs@jensen.org", "type": "home"}
            ]
        })
    }

    fn patch(operations: Value) -> Result<Value, ServiceError> {
        let op: PatchOp = serde_json::from_value(json!({
            "schemas": [PATCH_OP_SCHEMA],
            "Operations": operations
        }))
        .unwrap();
        let mut resource = user();
        apply_patch(&mut resource, &op, &FilterParser::default())?;
        Ok(resource)
    }

    #[test]
    fn test_replace_simple_attribute() {
        let patched = patch(json!([{"op": "replace", "path": "active", "value": false}])).unwrap();
        assert_eq!(patched["active"], json!(false));
    }

    #[test]
    fn test_replace_merges_complex_attribute() {
        let patched = patch(json!([
            {"op": "replace", "path": "name", "value": {"givenName": "Babs"}}
        ]))
        .unwrap();
        assert_eq!(
            patched["name"],
            json!({"givenName": "Babs", "familyName": "Jensen"})
        );
    }

    #[test]
    fn test_replace_overwrites_multi_valued_attribute() {
        let patched = patch(json!([
            {"op": "replace", "path": "emails", "value": [{"value": "new@example.com"}]}
        ]))
        .unwrap();
        assert_eq!(patched["emails"], json!([{"value": "new@example.com"}]));
    }

    #[test]
    fn test_add_without_path_sets_members() {
        let patched = patch(json!([
            {"op": "add", "value": {"nickName": "Babs", "name": {"middleName": "J"}}}
        ]))
        .unwrap();
        assert_eq!(patched["nickName"], json!("Babs"));
        assert_eq!(patched["name"]["middleName"], json!("J"));
        assert_eq!(patched["name"]["givenName"], json!("Barbara"));
    }

    #[test]
    fn test_add_appends_to_multi_valued_attribute() {
        let patched = patch(json!([
            {"op": "add", "path": "emails", "value": [{"value": "third@example.com"}]}
        ]))
        .unwrap();
        assert_eq!(patched["emails"].as_array().unwrap().len(), 3);
        assert_eq!(patched["emails"][2]["value"], json!("third@example.com"));
    }

    #[test]
    fn test_replace_sub_attribute_of_filtered_elements() {
        let patched = patch(json!([{
            "op": "replace",
            "path": "emails[type eq \"work\"].value",
            "value": "barbara@example.com"
        }]))
        .unwrap();
        assert_eq!(patched["emails"][0]["value"], json!("barbara@example.com"));
        assert_eq!(patched["emails"][1]["value"], json!("babs@jensen.org"));
    }

    #[test]
    fn test_remove_attribute() {
        let patched = patch(json!([{"op": "remove", "path": "name.familyName"}])).unwrap();
        assert_eq!(patched["name"], json!({"givenName": "Barbara"}));
    }

    #[test]
    fn test_remove_missing_attribute_has_no_target() {
        let err = patch(json!([{"op": "remove", "path": "nickName"}])).unwrap_err();
        assert!(matches!(err, ServiceError::NoTarget(_)));
    }

    #[test]
    fn test_remove_filtered_elements() {
        let patched = patch(json!([{"op": "remove", "path": "emails[type eq \"home\"]"}])).unwrap();
        assert_eq!(
            patched["emails"],
            json!([{"value": "bjensen@example.com", "type": "work", "primary": true}])
        );
    }

    #[test]
    fn test_removing_every_element_drops_attribute() {
        let patched = patch(json!([{"op": "remove", "path": "emails[value pr]"}])).unwrap();
        assert!(patched.get("emails").is_none());
    }

    #[test]
    fn test_remove_sub_attribute_of_filtered_elements() {
        let patched = patch(json!([{"op": "remove", "path": "emails[primary eq true].primary"}]))
            .unwrap();
        assert!(patched["emails"][0].get("primary").is_none());
        assert_eq!(patched["emails"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_filter_matching_nothing_has_no_target() {
        let err = patch(json!([{"op": "remove", "path": "emails[type eq \"other\"]"}])).unwrap_err();
        assert!(matches!(err, ServiceError::NoTarget(_)));
    }

    #[test]
    fn test_read_only_attributes_are_rejected() {
        let err = patch(json!([{"op": "replace", "path": "id", "value": "other"}])).unwrap_err();
        assert!(matches!(err, ServiceError::Mutability(_)));
        let err = patch(json!([{"op": "add", "value": {"meta": {}}}])).unwrap_err();
        assert!(matches!(err, ServiceError::Mutability(_)));
    }

    #[test]
    fn test_invalid_path_is_rejected() {
        let err = patch(json!([{"op": "add", "path": "emails[type eq]", "value": 1}])).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPath(_)));
    }

    #[test]
    fn test_add_requires_value() {
        let err = patch(json!([{"op": "add", "path": "nickName"}])).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidValue(_)));
    }

    #[test]
    fn test_missing_schema_is_invalid_syntax() {
        let op = PatchOp {
            schemas: vec![],
            operations: vec![],
        };
        let err = apply_patch(&mut user(), &op, &FilterParser::default()).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidSyntax(_)));
    }

    #[test]
    fn test_operations_apply_in_order() {
        let patched = patch(json!([
            {"op": "add", "path": "nickName", "value": "Babs"},
            {"op": "remove", "path": "nickName"}
        ]))
        .unwrap();
        assert!(patched.get("nickName").is_none());
    }
}
