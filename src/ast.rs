//! The syntax tree produced by the parser and consumed by the filter compiler.

use serde::{Deserialize, Serialize};

/// A node of a parsed search query.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `field <op> value`, e.g. `size >= 20`
    Comparison {
        field: Identifier,
        operator: OperatorKind,
        value: Literal,
    },
    /// `left and right` / `left or right`
    Combination {
        op: BoolOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// An expression wrapped in parentheses
    Grouping(Box<Expression>),
    /// A value with no field or operator, matched against the default fields
    BareTerm(Literal),
}

impl Expression {
    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::Combination {
            op: BoolOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Combination {
            op: BoolOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn grouping(inner: Expression) -> Self {
        Expression::Grouping(Box::new(inner))
    }

    /// Height of the tree. Leaves have depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Expression::Comparison { .. } | Expression::BareTerm(_) => 1,
            Expression::Grouping(inner) => inner.depth() + 1,
            Expression::Combination { left, right, .. } => left.depth().max(right.depth()) + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    #[serde(rename = ":")]
    Contains,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">=")]
    Gte,
}

impl OperatorKind {
    pub const ALL: [OperatorKind; 7] = [
        OperatorKind::Contains,
        OperatorKind::Eq,
        OperatorKind::Neq,
        OperatorKind::Lt,
        OperatorKind::Gt,
        OperatorKind::Lte,
        OperatorKind::Gte,
    ];

    /// The operator as it is written in a query.
    pub fn symbol(self) -> &'static str {
        match self {
            OperatorKind::Contains => ":",
            OperatorKind::Eq => "=",
            OperatorKind::Neq => "!=",
            OperatorKind::Lt => "<",
            OperatorKind::Gt => ">",
            OperatorKind::Lte => "<=",
            OperatorKind::Gte => ">=",
        }
    }

    /// The control key the API expects for this operator. `Eq` has none:
    /// equality is expressed by the bare value.
    pub fn control_key(self) -> Option<&'static str> {
        match self {
            OperatorKind::Contains => Some("+contains"),
            OperatorKind::Eq => None,
            OperatorKind::Neq => Some("+neq"),
            OperatorKind::Lt => Some("+lt"),
            OperatorKind::Gt => Some("+gt"),
            OperatorKind::Lte => Some("+lte"),
            OperatorKind::Gte => Some("+gte"),
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(i64),
}

impl Literal {
    /// Classifies an unquoted token: an optionally signed run of digits that
    /// fits in an `i64` is a number, anything else is a string.
    pub fn from_unquoted(text: &str) -> Self {
        let digits = text.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(text);
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = text.parse::<i64>() {
                return Literal::Number(n);
            }
        }
        Literal::String(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_classification() {
        assert_eq!(Literal::from_unquoted("100"), Literal::Number(100));
        assert_eq!(Literal::from_unquoted("-5"), Literal::Number(-5));
        assert_eq!(Literal::from_unquoted("+7"), Literal::Number(7));
        assert_eq!(Literal::from_unquoted("1.5"), Literal::String("1.5".to_string()));
        assert_eq!(Literal::from_unquoted("-"), Literal::String("-".to_string()));
        assert_eq!(Literal::from_unquoted("10a"), Literal::String("10a".to_string()));
    }

    #[test]
    fn test_overflowing_number_stays_string() {
        let huge = "99999999999999999999999";
        assert_eq!(Literal::from_unquoted(huge), Literal::String(huge.to_string()));
    }

    #[test]
    fn test_operator_symbols_round_trip() {
        for op in OperatorKind::ALL {
            assert_eq!(OperatorKind::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(OperatorKind::from_symbol("=="), None);
    }

    #[test]
    fn test_depth() {
        let leaf = || Expression::BareTerm(Literal::Number(1));
        assert_eq!(leaf().depth(), 1);
        let tree = Expression::and(Expression::grouping(Expression::or(leaf(), leaf())), leaf());
        assert_eq!(tree.depth(), 4);
    }
}
