//! Defines the Abstract Syntax Tree (AST) for SCIM filter expressions.
use itertools::Itertools;
use serde_json::Value;
use std::fmt;

/// A dotted attribute path, e.g. `name.givenName`.
///
/// A schema URI prefix (`urn:...:userName`) is accepted by the parser but not
/// kept: qualified and unqualified paths compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePath {
    segments: Vec<String>,
}

impl AttributePath {
    /// Builds a path from already-validated segments.
    ///
    /// Returns `None` for an empty segment list.
    pub fn new<I, S>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            None
        } else {
            Some(Self { segments })
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True if this path is exactly the single segment `name`.
    pub fn is_single(&self, name: &str) -> bool {
        self.segments.len() == 1 && self.segments[0] == name
    }

    /// Returns a new path with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.iter().join("."))
    }
}

/// An attribute comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Equal => "eq",
            CompareOp::NotEqual => "ne",
            CompareOp::Contains => "co",
            CompareOp::StartsWith => "sw",
            CompareOp::EndsWith => "ew",
            CompareOp::GreaterThan => "gt",
            CompareOp::LessThan => "lt",
            CompareOp::GreaterOrEqual => "ge",
            CompareOp::LessOrEqual => "le",
        }
    }

    /// Operators that order their operands (`gt`, `lt`, `ge`, `le`).
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            CompareOp::GreaterThan
                | CompareOp::LessThan
                | CompareOp::GreaterOrEqual
                | CompareOp::LessOrEqual
        )
    }

    /// Operators that only apply to strings (`co`, `sw`, `ew`).
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith
        )
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The top-level representation of a parsed filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `attributePath SP compOp SP literal`
    Comparison {
        path: AttributePath,
        op: CompareOp,
        value: Value,
    },
    /// `attributePath SP "pr"`
    Presence(AttributePath),
    /// `"not" [SP] group`. The inner filter is always a `Group`.
    Not(Box<Filter>),
    /// A parenthesized filter.
    Group(Box<Filter>),
    /// A flat `and`/`or` chain: a disjunction of conjunctions.
    ///
    /// `a and b or c` is `[[a, b], [c]]`. Always holds at least two operands.
    OrOfAnds(Vec<Vec<Filter>>),
    /// `attributePath "[" filter "]"`: the filter is evaluated against the
    /// value found at `path`.
    AttributeGroup {
        path: AttributePath,
        filter: Box<Filter>,
    },
}

/// A PATCH operation target: `attrPath` or `attrPath[filter].subAttr`.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchPath {
    pub attribute: AttributePath,
    pub value_filter: Option<Filter>,
    pub sub_attribute: Option<String>,
}

impl PatchPath {
    /// The full attribute path addressed when there is no value filter.
    pub fn full_path(&self) -> AttributePath {
        match &self.sub_attribute {
            Some(sub) => self.attribute.child(sub.clone()),
            None => self.attribute.clone(),
        }
    }
}
