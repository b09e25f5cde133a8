//! Compiles human-typed search queries such as `label: prod and size >= 20`
//! into the nested JSON filter trees accepted by the API.
//!
//! ```
//! use search_filter::{get_filter, CompileOptions};
//! use serde_json::json;
//!
//! let options = CompileOptions::new().with_default_fields(["label", "tags"]);
//! let result = get_filter(Some("label: prod or size >= 20"), &options);
//!
//! assert!(result.error.is_none());
//! assert_eq!(
//!     result.filter,
//!     json!({ "+or": [ { "label": { "+contains": "prod" } }, { "size": { "+gte": 20 } } ] })
//! );
//! ```

pub mod ast;
pub mod compiler;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{BoolOp, Expression, Identifier, Literal, OperatorKind};
pub use compiler::{compile, CompileOptions, FilterValue, ShapeOverride};
pub use config::SearchConfig;
pub use error::{ConfigError, ParseError, SourcePosition};
pub use parser::{parse, DEFAULT_MAX_DEPTH, MAX_SUPPORTED_DEPTH};

use serde::Serialize;
use serde_json::{Map, Value};

/// The outcome of [`get_filter`]. `filter` is always usable: on error it is
/// the empty, match-all filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub filter: FilterValue,
    pub error: Option<ParseError>,
}

impl SearchResult {
    fn empty(error: Option<ParseError>) -> Self {
        Self {
            filter: Value::Object(Map::new()),
            error,
        }
    }
}

/// Parses and compiles `query`. `None` and `Some("")` yield the empty filter
/// without parsing; syntax errors yield the empty filter plus the error.
pub fn get_filter(query: Option<&str>, options: &CompileOptions) -> SearchResult {
    get_filter_with_depth(query, options, DEFAULT_MAX_DEPTH)
}

/// [`get_filter`] with an explicit nesting limit, clamped to
/// `1..=MAX_SUPPORTED_DEPTH`.
pub fn get_filter_with_depth(query: Option<&str>, options: &CompileOptions, max_depth: usize) -> SearchResult {
    let query = match query {
        None | Some("") => return SearchResult::empty(None),
        Some(query) => query,
    };

    match parser::parse_with_max_depth(query, max_depth) {
        Ok(expr) => {
            let filter = compile(&expr, options);
            log::debug!("compiled query of {} bytes (depth {})", query.len(), expr.depth());
            SearchResult { filter, error: None }
        }
        Err(error) => {
            log::debug!("query of {} bytes rejected: {}", query.len(), error);
            SearchResult::empty(Some(error))
        }
    }
}

/// Runs [`get_filter`] with the options and depth limit of `config`.
pub fn get_filter_with_config(query: Option<&str>, config: &SearchConfig) -> SearchResult {
    get_filter_with_depth(query, &config.compile_options(), config.max_depth)
}
