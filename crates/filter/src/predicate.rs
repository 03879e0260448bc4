//! Compiles a filter AST into a reusable predicate over resource values.
use crate::ast::{AttributePath, CompareOp, Filter};
use crate::error::FilterError;
use crate::path::resolve;
use crate::value::{Category, category, describe, equals, is_present};
use serde_json::Value;
use std::cmp::Ordering;

/// A compiled filter. Holds no reference to the AST it was built from and can
/// be shared across threads and evaluated any number of times.
#[derive(Debug, Clone)]
pub struct Predicate {
    root: Matcher,
}

/// The executable form of a filter node.
#[derive(Debug, Clone)]
enum Matcher {
    Compare {
        path: AttributePath,
        op: CompareOp,
        literal: Value,
    },
    Present(AttributePath),
    Not(Box<Matcher>),
    /// Disjunction of conjunctions.
    AnyOf(Vec<Vec<Matcher>>),
    /// Evaluates `inner` against the value found at `path`, or against each
    /// element when that value is an array.
    Scoped {
        path: AttributePath,
        inner: Box<Matcher>,
    },
}

impl Predicate {
    pub fn compile(filter: &Filter) -> Self {
        Self {
            root: compile_node(filter),
        }
    }

    /// Tests one resource. Fails only when an ordering operator meets values
    /// of incompatible categories.
    pub fn evaluate(&self, resource: &Value) -> Result<bool, FilterError> {
        self.root.evaluate(resource)
    }
}

pub fn compile(filter: &Filter) -> Predicate {
    Predicate::compile(filter)
}

fn compile_node(filter: &Filter) -> Matcher {
    match filter {
        Filter::Comparison { path, op, value } => Matcher::Compare {
            path: path.clone(),
            op: *op,
            literal: value.clone(),
        },
        Filter::Presence(path) => Matcher::Present(path.clone()),
        Filter::Not(inner) => Matcher::Not(Box::new(compile_node(inner))),
        Filter::Group(inner) => compile_node(inner),
        Filter::OrOfAnds(groups) => Matcher::AnyOf(
            groups
                .iter()
                .map(|conjunction| conjunction.iter().map(compile_node).collect())
                .collect(),
        ),
        Filter::AttributeGroup { path, filter } => Matcher::Scoped {
            path: path.clone(),
            inner: Box::new(compile_node(filter)),
        },
    }
}

impl Matcher {
    fn evaluate(&self, resource: &Value) -> Result<bool, FilterError> {
        match self {
            Matcher::Compare { path, op, literal } => compare(path, *op, resolve(path, resource), literal),
            Matcher::Present(path) => Ok(is_present(resolve(path, resource))),
            Matcher::Not(inner) => Ok(!inner.evaluate(resource)?),
            Matcher::AnyOf(groups) => {
                for conjunction in groups {
                    if all_match(conjunction, resource)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Matcher::Scoped { path, inner } => match resolve(path, resource) {
                // Multi-valued attributes match when any element does.
                Some(Value::Array(items)) => {
                    for item in items {
                        if inner.evaluate(item)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                scope => inner.evaluate(scope.unwrap_or(&Value::Null)),
            },
        }
    }
}

fn all_match(conjunction: &[Matcher], resource: &Value) -> Result<bool, FilterError> {
    for matcher in conjunction {
        if !matcher.evaluate(resource)? {
            return Ok(false);
        }
    }
    Ok(true)
}

// --- Comparison semantics ---

fn compare(
    path: &AttributePath,
    op: CompareOp,
    actual: Option<&Value>,
    literal: &Value,
) -> Result<bool, FilterError> {
    let attr = actual.unwrap_or(&Value::Null);
    match op {
        CompareOp::Equal => return Ok(equals(attr, literal)),
        CompareOp::NotEqual => return Ok(!equals(attr, literal)),
        _ => {}
    }
    if attr.is_null() || literal.is_null() {
        return Ok(false);
    }

    if op.is_textual() {
        return Ok(match (attr, literal) {
            (Value::String(text), Value::String(needle)) => match op {
                CompareOp::Contains => text.contains(needle.as_str()),
                CompareOp::StartsWith => text.starts_with(needle.as_str()),
                CompareOp::EndsWith => text.ends_with(needle.as_str()),
                _ => false,
            },
            _ => false,
        });
    }

    let ordering = match (category(attr), category(literal)) {
        (Some(Category::Number), Some(Category::Number)) => numeric_order(attr, literal),
        (Some(Category::String), Some(Category::String)) => match (attr, literal) {
            (Value::String(a), Value::String(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            _ => None,
        },
        _ => None,
    };
    let Some(ordering) = ordering else {
        log::trace!("Incomparable operands for '{}' on {}", op, path);
        return Err(FilterError::ComparisonType {
            op,
            attribute: describe(actual),
            literal: describe(Some(literal)),
        });
    };

    Ok(match op {
        CompareOp::GreaterThan => ordering == Ordering::Greater,
        CompareOp::LessThan => ordering == Ordering::Less,
        CompareOp::GreaterOrEqual => ordering != Ordering::Less,
        CompareOp::LessOrEqual => ordering != Ordering::Greater,
        _ => false,
    })
}

fn numeric_order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}
