//! Comparison helpers over `serde_json::Value`.
use serde_json::Value;

/// Broad value categories that support ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Number,
    String,
}

pub fn category(value: &Value) -> Option<Category> {
    match value {
        Value::Number(_) => Some(Category::Number),
        Value::String(_) => Some(Category::String),
        _ => None,
    }
}

/// Presence test used by `pr`: absent, `null`, `false`, `0`, `""`, `[]` and
/// `{}` are all not present.
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

/// Structural equality where `5` and `5.0` are the same number.
pub fn equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| equals(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| equals(x, y)))
        }
        _ => false,
    }
}

/// Short rendering of a value for error messages.
pub(crate) fn describe(value: Option<&Value>) -> String {
    match value {
        None => "missing value".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => format!("boolean {}", b),
        Some(Value::Number(n)) => format!("number {}", n),
        Some(Value::String(s)) => format!("string \"{}\"", s),
        Some(Value::Array(_)) => "array".to_string(),
        Some(Value::Object(_)) => "object".to_string(),
    }
}
