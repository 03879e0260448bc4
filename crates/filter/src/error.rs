use crate::ast::CompareOp;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid filter '{input}' at position {position}: unexpected '{fragment}'")]
    Parse {
        input: String,
        position: usize,
        fragment: String,
    },

    #[error("Filter nesting exceeds the maximum depth of {0}")]
    TooDeep(usize),

    #[error("Attribute path exceeds the maximum of {0} segments")]
    TooManySegments(usize),

    #[error("Cannot compare {attribute} with {literal} using '{op}'")]
    ComparisonType {
        op: CompareOp,
        attribute: String,
        literal: String,
    },

    #[error("Cannot write through '{segment}': value is not an object")]
    NotAnObject { segment: String },
}

impl FilterError {
    /// True for errors raised while parsing, before any resource is evaluated.
    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            FilterError::Parse { .. } | FilterError::TooDeep(_) | FilterError::TooManySegments(_)
        )
    }

    pub(crate) fn parse_at(input: &str, position: usize, remainder: &str) -> Self {
        let fragment: String = if remainder.is_empty() {
            "end of input".to_string()
        } else {
            remainder.chars().take(24).collect()
        };
        FilterError::Parse {
            input: input.to_string(),
            position,
            fragment,
        }
    }
}
