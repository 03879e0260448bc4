use crate::schema::PATCH_OP_SCHEMA;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    #[serde(alias = "Add")]
    Add,
    #[serde(alias = "Remove")]
    Remove,
    #[serde(alias = "Replace")]
    Replace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOpKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// A SCIM PATCH request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub schemas: Vec<String>,
    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOperation>,
}

impl PatchOp {
    pub fn new(operations: Vec<PatchOperation>) -> Self {
        Self {
            schemas: vec![PATCH_OP_SCHEMA.to_string()],
            operations,
        }
    }

    /// A single `replace` of `path` with `value`.
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self::new(vec![PatchOperation {
            op: PatchOpKind::Replace,
            path: Some(path.into()),
            value: Some(value),
        }])
    }

    pub fn declares_schema(&self) -> bool {
        self.schemas.iter().any(|s| s == PATCH_OP_SCHEMA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_op_wire_format() {
        let op = PatchOp::replace("active", json!(false));
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({
                "schemas": [PATCH_OP_SCHEMA],
                "Operations": [{"op": "replace", "path": "active", "value": false}]
            })
        );
    }

    #[test]
    fn test_capitalized_ops_are_accepted() {
        let op: PatchOp = serde_json::from_value(json!({
            "schemas": [PATCH_OP_SCHEMA],
            "Operations": [{"op": "Add", "value": {"nickName": "Babs"}}]
        }))
        .unwrap();
        assert_eq!(op.operations[0].op, PatchOpKind::Add);
        assert!(op.operations[0].path.is_none());
        assert!(op.declares_schema());
    }
}
