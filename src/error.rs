//! Error types for query parsing and configuration loading.

use serde::Serialize;
use std::path::PathBuf;

/// Where in the query a syntax error was detected.
///
/// `offset` counts characters from the start of the query; `line` and
/// `column` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourcePosition {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    /// Converts a byte offset into `input` into a character position.
    pub fn locate(input: &str, byte_offset: usize) -> Self {
        let byte_offset = byte_offset.min(input.len());
        let mut offset = 0;
        let mut line = 1;
        let mut column = 1;
        for (idx, c) in input.char_indices() {
            if idx >= byte_offset {
                break;
            }
            offset += 1;
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Self { offset, line, column }
    }
}

/// A syntax error in a search query, returned instead of a filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub position: Option<SourcePosition>,
    pub expected_tokens: Vec<String>,
}

impl ParseError {
    /// Builds the "Expected ... but ... found." error for a failure at
    /// `byte_offset` in `input`.
    pub fn expected(input: &str, byte_offset: usize, expected: &[&str]) -> Self {
        let mut expected_tokens: Vec<String> = Vec::with_capacity(expected.len());
        for description in expected {
            if !expected_tokens.iter().any(|e| e == description) {
                expected_tokens.push(description.to_string());
            }
        }

        let found = describe_found(input, byte_offset);
        let message = format!("Expected {} but {} found.", join_expected(&expected_tokens), found);

        Self {
            message,
            position: Some(SourcePosition::locate(input, byte_offset)),
            expected_tokens,
        }
    }

    /// An error with a free-form message, such as the depth limit.
    pub fn at_position(input: &str, byte_offset: usize, message: String) -> Self {
        Self {
            message,
            position: Some(SourcePosition::locate(input, byte_offset)),
            expected_tokens: Vec::new(),
        }
    }
}

fn describe_found(input: &str, byte_offset: usize) -> String {
    match input.get(byte_offset..).and_then(|rest| rest.chars().next()) {
        None => "end of input".to_string(),
        Some('"') => r#""\"""#.to_string(),
        Some('\\') => r#""\\""#.to_string(),
        Some('\n') => r#""\n""#.to_string(),
        Some('\t') => r#""\t""#.to_string(),
        Some(c) => format!("\"{}\"", c),
    }
}

fn join_expected(descriptions: &[String]) -> String {
    match descriptions {
        [] => "end of input".to_string(),
        [only] => only.clone(),
        [first, second] => format!("{} or {}", first, second),
        [init @ .., last] => format!("{}, or {}", init.join(", "), last),
    }
}

/// Errors raised while loading a [`SearchConfig`](crate::config::SearchConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("more than one override for operator '{0}'")]
    DuplicateOverride(String),

    #[error("override for operator '{0}' has an empty field name")]
    EmptyOverrideField(String),

    #[error("max_depth must be at least 1")]
    ZeroDepth,

    #[error("max_depth {0} exceeds the supported maximum of {1}")]
    DepthTooLarge(usize, usize),
}
