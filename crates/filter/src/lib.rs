//! SCIM filter expressions over JSON resources.
//!
//! A filter string is parsed into an [`ast::Filter`], compiled once into a
//! [`Predicate`], and then evaluated against any number of resources. The
//! same attribute-path layer used by the predicate is exposed for reading,
//! writing and deleting nested values.

pub mod ast;
pub mod error;
mod parser;
pub mod path;
pub mod predicate;
pub mod value;

// --- Public API ---
pub use ast::{AttributePath, CompareOp, Filter, PatchPath};
pub use error::FilterError;
pub use parser::{
    FilterParser, ParserLimits, parse_filter, parse_patch_path, parse_path, parse_path_list,
};
pub use path::{delete, resolve, resolve_mut, write};
pub use predicate::{Predicate, compile};

/// Parses and compiles `filter` in one step.
pub fn compile_str(filter: &str) -> Result<Predicate, FilterError> {
    parse_filter(filter).map(|ast| Predicate::compile(&ast))
}
