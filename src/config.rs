//! Configuration module, loads search settings from a JSON file.

use crate::ast::{Literal, OperatorKind};
use crate::compiler::{literal_to_value, CompileOptions, FilterValue};
use crate::error::ConfigError;
use crate::parser::{DEFAULT_MAX_DEPTH, MAX_SUPPORTED_DEPTH};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Placeholder replaced by the comparison value in override templates.
pub const VALUE_PLACEHOLDER: &str = "$value";

/// A shape override written as data: `template` is emitted with every
/// `"$value"` string replaced by the comparison's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideTemplate {
    pub operator: OperatorKind,
    pub field: String,
    pub template: FilterValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Fields searched by bare terms
    #[serde(default)]
    pub default_fields: Vec<String>,
    /// Maximum tree depth accepted by the parser
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub overrides: Vec<OverrideTemplate>,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_fields: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            overrides: Vec::new(),
        }
    }
}

impl SearchConfig {
    /// Loads and validates a config from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ConfigError::NotFound(path_ref.to_path_buf()));
        }

        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.to_path_buf(),
            source,
        })?;

        let config: SearchConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path_ref.to_path_buf(),
            source,
        })?;

        config.validate()?;
        log::debug!(
            "loaded search config from {}: {} default fields, {} overrides",
            path_ref.display(),
            config.default_fields.len(),
            config.overrides.len()
        );
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: SearchConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        if self.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(ConfigError::DepthTooLarge(self.max_depth, MAX_SUPPORTED_DEPTH));
        }

        let mut seen = HashSet::new();
        for template in &self.overrides {
            let symbol = template.operator.symbol().to_string();
            if template.field.is_empty() {
                return Err(ConfigError::EmptyOverrideField(symbol));
            }
            if !seen.insert(template.operator) {
                return Err(ConfigError::DuplicateOverride(symbol));
            }
        }
        Ok(())
    }

    /// Builds the compiler options described by this config.
    pub fn compile_options(&self) -> CompileOptions {
        self.overrides.iter().fold(
            CompileOptions::new().with_default_fields(self.default_fields.iter().cloned()),
            |options, entry| {
                let template = entry.template.clone();
                options.with_override(entry.operator, entry.field.clone(), move |value| {
                    substitute(&template, value)
                })
            },
        )
    }
}

/// Copies `template`, replacing every `"$value"` string with `value`.
pub fn substitute(template: &FilterValue, value: &Literal) -> FilterValue {
    match template {
        FilterValue::String(s) if s == VALUE_PLACEHOLDER => literal_to_value(value),
        FilterValue::Array(items) => {
            FilterValue::Array(items.iter().map(|item| substitute(item, value)).collect())
        }
        FilterValue::Object(map) => FilterValue::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, value)))
                .collect(),
        ),
        other => other.clone(),
    }
}
