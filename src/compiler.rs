//! Filter compiler that turns a parsed query into the API's JSON filter tree.

use crate::ast::{BoolOp, Expression, Literal, OperatorKind};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A compiled filter. Always a JSON value so it can be sent to the API as-is.
pub type FilterValue = Value;

pub const AND_KEY: &str = "+and";
pub const OR_KEY: &str = "+or";
pub const CONTAINS_KEY: &str = "+contains";

/// Builds the filter for a comparison that matched a [`ShapeOverride`].
pub type Transform = Arc<dyn Fn(&Literal) -> FilterValue + Send + Sync>;

/// Replaces the default filter shape for one (operator, field) pair.
#[derive(Clone)]
pub struct ShapeOverride {
    pub field: String,
    pub transform: Transform,
}

impl fmt::Debug for ShapeOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeOverride")
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

/// Caller-supplied compilation settings.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Fields a bare term is matched against, in order
    pub default_fields: Vec<String>,
    /// At most one override per operator
    pub shape_overrides: HashMap<OperatorKind, ShapeOverride>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Registers an override for `operator` on `field`, replacing any
    /// earlier override for the same operator.
    ///
    /// # Panics
    ///
    /// Panics if `field` is empty.
    pub fn with_override<F>(mut self, operator: OperatorKind, field: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&Literal) -> FilterValue + Send + Sync + 'static,
    {
        let field = field.into();
        assert!(!field.is_empty(), "shape override for '{}' needs a field name", operator.symbol());
        let replaced = self.shape_overrides.insert(
            operator,
            ShapeOverride {
                field,
                transform: Arc::new(transform),
            },
        );
        if let Some(previous) = replaced {
            log::warn!(
                "replacing shape override for '{}' on field '{}'",
                operator.symbol(),
                previous.field
            );
        }
        self
    }

    fn override_for(&self, operator: OperatorKind, field: &str) -> Option<&ShapeOverride> {
        self.shape_overrides
            .get(&operator)
            .filter(|shape| shape.field == field)
    }
}

/// Compiles `expr` with `options`. Total over any tree the parser produces.
pub fn compile(expr: &Expression, options: &CompileOptions) -> FilterValue {
    FilterCompiler::new(options).compile(expr)
}

pub struct FilterCompiler<'o> {
    options: &'o CompileOptions,
}

impl<'o> FilterCompiler<'o> {
    pub fn new(options: &'o CompileOptions) -> Self {
        Self { options }
    }

    pub fn compile(&self, expr: &Expression) -> FilterValue {
        match expr {
            Expression::Combination { op, left, right } => {
                let key = match op {
                    BoolOp::And => AND_KEY,
                    BoolOp::Or => OR_KEY,
                };
                json!({ key: [self.compile(left), self.compile(right)] })
            }
            Expression::Grouping(inner) => self.compile(inner),
            Expression::Comparison { field, operator, value } => {
                self.compile_comparison(field.as_str(), *operator, value)
            }
            Expression::BareTerm(value) => self.compile_bare_term(value),
        }
    }

    fn compile_comparison(&self, field: &str, operator: OperatorKind, value: &Literal) -> FilterValue {
        if let Some(shape) = self.options.override_for(operator, field) {
            return (shape.transform)(value);
        }

        let value = literal_to_value(value);
        let condition = match operator.control_key() {
            Some(key) => json!({ key: value }),
            None => value,
        };
        single_entry(field, condition)
    }

    /// A bare term is a `:` comparison against each default field, OR-ed
    /// together. With no default fields it matches everything.
    fn compile_bare_term(&self, value: &Literal) -> FilterValue {
        let contains = |field: &str| single_entry(field, json!({ CONTAINS_KEY: literal_to_value(value) }));

        match self.options.default_fields.as_slice() {
            [] => Value::Object(Map::new()),
            [field] => contains(field),
            fields => json!({ OR_KEY: fields.iter().map(|f| contains(f)).collect::<Vec<_>>() }),
        }
    }
}

fn single_entry(key: &str, value: FilterValue) -> FilterValue {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

/// Converts a literal into the JSON scalar sent to the API.
pub fn literal_to_value(literal: &Literal) -> FilterValue {
    match literal {
        Literal::String(s) => Value::String(s.clone()),
        Literal::Number(n) => Value::from(*n),
    }
}
