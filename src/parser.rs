//! The search query parser.
//!
//! ## Grammar (highest to lowest binding strength)
//!
//! ```text
//! primary    = "(" or_expr ")" | comparison | bare_term
//! comparison = field operator value
//! bare_term  = value
//! and_expr   = primary (WS "and" WS primary)*
//! or_expr    = and_expr (WS "or" WS and_expr)*
//! query      = or_expr
//!
//! operator   = "<=" | ">=" | "!=" | ":" | "=" | "<" | ">"
//! field      = [letter digit _ -]+
//! value      = [letter digit _ - . @]+ | "..." | '...'
//! ```
//!
//! `and` / `or` are case-insensitive and must be separated from their
//! neighbours by whitespace. Chains associate to the left, so
//! `a and b and c` parses as `(a and b) and c`.
//!
//! ## Depth limit
//!
//! Every grouping and every boolean combination adds one level to the tree.
//! A query whose tree would be taller than `max_depth` is rejected with a
//! [`ParseError`], which keeps both this parser and the recursive compiler
//! within a bounded stack. Configured limits are clamped to
//! `1..=MAX_SUPPORTED_DEPTH`.

use crate::ast::{Expression, Identifier, Literal, OperatorKind};
use crate::error::ParseError;
use crate::lexer::{is_field_char, Lexer};
use crate::token::{Token, TokenKind};

pub const DEFAULT_MAX_DEPTH: usize = 128;
/// Upper bound for any configured depth; deeper trees would not fit the
/// stack of a default thread.
pub const MAX_SUPPORTED_DEPTH: usize = 512;

const PRIMARY: &[&str] = &["\"(\"", "search value", "whitespace"];
const VALUE: &[&str] = &["search value", "whitespace"];
const AFTER_TERM: &[&str] = &["\"and\"", "\"or\"", "end of input"];
const AFTER_GROUPED_TERM: &[&str] = &["\"and\"", "\"or\"", "\")\""];
const CLOSING_QUOTE: &[&str] = &["closing quote"];
const WHITESPACE: &[&str] = &["whitespace"];

/// Lexes and parses `query` with the default depth limit.
pub fn parse(query: &str) -> Result<Expression, ParseError> {
    parse_with_max_depth(query, DEFAULT_MAX_DEPTH)
}

pub fn parse_with_max_depth(query: &str, max_depth: usize) -> Result<Expression, ParseError> {
    let tokens: Vec<_> = Lexer::new(query).collect();
    log::trace!("lexed {} tokens", tokens.len());
    Parser::new(query, &tokens).with_max_depth(max_depth).parse()
}

pub struct Parser<'a> {
    input: &'a str,
    tokens: &'a [Token<'a>],
    position: usize,
    max_depth: usize,
    /// Open parentheses around the current position
    nesting: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, tokens: &'a [Token<'a>]) -> Self {
        Self {
            input,
            tokens,
            position: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            nesting: 0,
        }
    }

    /// Sets the depth limit, clamped to `1..=MAX_SUPPORTED_DEPTH`.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.clamp(1, MAX_SUPPORTED_DEPTH);
        self
    }

    /// Returns the current token without advancing.
    fn peek(&self) -> Option<&'a Token<'a>> {
        self.tokens.get(self.position)
    }

    fn peek_nth(&self, n: usize) -> Option<&'a Token<'a>> {
        self.tokens.get(self.position + n)
    }

    fn advance(&mut self) -> Option<&'a Token<'a>> {
        let token = self.tokens.get(self.position);
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Byte offset of the current token, or the end of input.
    fn current_offset(&self) -> usize {
        self.peek().map_or(self.input.len(), |t| t.span.start)
    }

    fn error_here(&self, expected: &[&str]) -> ParseError {
        ParseError::expected(self.input, self.current_offset(), expected)
    }

    fn check_depth(&self, height: usize, byte_offset: usize) -> Result<(), ParseError> {
        if height > self.max_depth {
            return Err(ParseError::at_position(
                self.input,
                byte_offset,
                format!("Maximum nesting depth of {} exceeded.", self.max_depth),
            ));
        }
        Ok(())
    }

    /// Parses the whole query. Trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expression, ParseError> {
        let (expr, _) = self.parse_or_expression()?;
        if self.peek().is_some() {
            return Err(self.error_here(AFTER_TERM));
        }
        Ok(expr)
    }

    /// Consumes `keyword` if the current token is that word and it is
    /// separated by whitespace on both sides.
    fn match_keyword(&mut self, keyword: &str) -> Result<bool, ParseError> {
        let Some(token) = self.peek() else {
            return Ok(false);
        };
        let TokenKind::Word(word) = token.kind else {
            return Ok(false);
        };
        if !word.eq_ignore_ascii_case(keyword) {
            return Ok(false);
        }
        let space_before = self.position > 0 && self.tokens[self.position - 1].span.end < token.span.start;
        if !space_before {
            return Ok(false);
        }
        let space_after = match self.peek_nth(1) {
            Some(next) => next.span.start > token.span.end,
            None => self.input.len() > token.span.end,
        };
        if !space_after {
            return Err(ParseError::expected(self.input, token.span.end, WHITESPACE));
        }
        self.advance();
        Ok(true)
    }

    /// or_expr = and_expr ("or" and_expr)*
    ///
    /// Returns the expression and its height.
    fn parse_or_expression(&mut self) -> Result<(Expression, usize), ParseError> {
        let (mut left, mut height) = self.parse_and_expression()?;

        loop {
            let keyword_offset = self.current_offset();
            if !self.match_keyword("or")? {
                break;
            }
            let (right, right_height) = self.parse_and_expression()?;
            height = height.max(right_height) + 1;
            self.check_depth(height, keyword_offset)?;
            left = Expression::or(left, right);
        }

        Ok((left, height))
    }

    /// and_expr = primary ("and" primary)*
    fn parse_and_expression(&mut self) -> Result<(Expression, usize), ParseError> {
        let (mut left, mut height) = self.parse_primary_expression()?;

        loop {
            let keyword_offset = self.current_offset();
            if !self.match_keyword("and")? {
                break;
            }
            let (right, right_height) = self.parse_primary_expression()?;
            height = height.max(right_height) + 1;
            self.check_depth(height, keyword_offset)?;
            left = Expression::and(left, right);
        }

        Ok((left, height))
    }

    /// Supported forms:
    /// - `(or_expr)` - grouping
    /// - `field op value` - comparison (e.g. `size >= 20`, `label:web`)
    /// - `value` - bare term
    fn parse_primary_expression(&mut self) -> Result<(Expression, usize), ParseError> {
        let Some(token) = self.peek() else {
            return Err(self.error_here(PRIMARY));
        };

        match token.kind {
            TokenKind::LParen => {
                self.nesting += 1;
                self.check_depth(self.nesting + 1, token.span.start)?;
                self.advance();
                let (inner, inner_height) = self.parse_or_expression()?;
                match self.peek() {
                    Some(Token { kind: TokenKind::RParen, .. }) => {
                        self.advance();
                    }
                    _ => return Err(self.error_here(AFTER_GROUPED_TERM)),
                }
                self.nesting -= 1;
                let height = inner_height + 1;
                self.check_depth(height, token.span.start)?;
                Ok((Expression::grouping(inner), height))
            }
            TokenKind::Word(word) => {
                let is_comparison = self.peek_nth(1).is_some_and(|next| next.kind.is_operator())
                    && word.chars().all(is_field_char);
                if is_comparison {
                    self.parse_comparison(word)
                } else {
                    self.advance();
                    Ok((Expression::BareTerm(Literal::from_unquoted(word)), 1))
                }
            }
            TokenKind::Quoted(text) => {
                self.advance();
                Ok((Expression::BareTerm(Literal::String(text.to_string())), 1))
            }
            TokenKind::UnterminatedQuote => {
                Err(ParseError::expected(self.input, self.input.len(), CLOSING_QUOTE))
            }
            _ => Err(self.error_here(PRIMARY)),
        }
    }

    /// Parses `field op value`; the current token is the field.
    fn parse_comparison(&mut self, field: &str) -> Result<(Expression, usize), ParseError> {
        self.advance(); // field
        let operator = self.parse_operator()?;
        let value = self.parse_value()?;
        Ok((
            Expression::Comparison {
                field: Identifier(field.to_string()),
                operator,
                value,
            },
            1,
        ))
    }

    fn parse_operator(&mut self) -> Result<OperatorKind, ParseError> {
        let operator = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Colon) => OperatorKind::Contains,
            Some(TokenKind::Eq) => OperatorKind::Eq,
            Some(TokenKind::NotEq) => OperatorKind::Neq,
            Some(TokenKind::Lt) => OperatorKind::Lt,
            Some(TokenKind::Gt) => OperatorKind::Gt,
            Some(TokenKind::Lte) => OperatorKind::Lte,
            Some(TokenKind::Gte) => OperatorKind::Gte,
            _ => {
                let symbols: Vec<String> = OperatorKind::ALL
                    .iter()
                    .map(|op| format!("\"{}\"", op.symbol()))
                    .collect();
                let symbols: Vec<&str> = symbols.iter().map(String::as_str).collect();
                return Err(self.error_here(&symbols));
            }
        };
        self.advance();
        Ok(operator)
    }

    fn parse_value(&mut self) -> Result<Literal, ParseError> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Word(text)) => {
                let literal = Literal::from_unquoted(text);
                self.advance();
                Ok(literal)
            }
            Some(TokenKind::Quoted(text)) => {
                let literal = Literal::String(text.to_string());
                self.advance();
                Ok(literal)
            }
            Some(TokenKind::UnterminatedQuote) => {
                Err(ParseError::expected(self.input, self.input.len(), CLOSING_QUOTE))
            }
            _ => Err(self.error_here(VALUE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BoolOp;

    fn comparison(field: &str, operator: OperatorKind, value: Literal) -> Expression {
        Expression::Comparison {
            field: Identifier(field.to_string()),
            operator,
            value,
        }
    }

    fn string(s: &str) -> Literal {
        Literal::String(s.to_string())
    }

    #[test]
    fn test_simple_comparison() {
        let result = parse("label: my-linode").unwrap();
        assert_eq!(result, comparison("label", OperatorKind::Contains, string("my-linode")));
    }

    #[test]
    fn test_all_operators() {
        let cases = [
            ("a:1", OperatorKind::Contains),
            ("a=1", OperatorKind::Eq),
            ("a!=1", OperatorKind::Neq),
            ("a<1", OperatorKind::Lt),
            ("a>1", OperatorKind::Gt),
            ("a<=1", OperatorKind::Lte),
            ("a>=1", OperatorKind::Gte),
        ];
        for (input, op) in cases {
            assert_eq!(parse(input).unwrap(), comparison("a", op, Literal::Number(1)), "{}", input);
        }
    }

    #[test]
    fn test_numbers_and_quoted_numbers() {
        assert_eq!(parse("id = 100").unwrap(), comparison("id", OperatorKind::Eq, Literal::Number(100)));
        assert_eq!(parse(r#"id = "100""#).unwrap(), comparison("id", OperatorKind::Eq, string("100")));
        assert_eq!(parse("ipv4: 10.0.0.1").unwrap(), comparison("ipv4", OperatorKind::Contains, string("10.0.0.1")));
    }

    #[test]
    fn test_quoted_values_keep_spaces() {
        assert_eq!(
            parse("label: 'my server'").unwrap(),
            comparison("label", OperatorKind::Contains, string("my server"))
        );
    }

    #[test]
    fn test_bare_terms() {
        assert_eq!(parse("my-linode-1").unwrap(), Expression::BareTerm(string("my-linode-1")));
        assert_eq!(parse(r#""two words""#).unwrap(), Expression::BareTerm(string("two words")));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let result = parse("a:1 or b:2 and c:3").unwrap();
        let Expression::Combination { op: BoolOp::Or, left, right } = result else {
            panic!("Expected OR at the root");
        };
        assert_eq!(*left, comparison("a", OperatorKind::Contains, Literal::Number(1)));
        assert!(matches!(*right, Expression::Combination { op: BoolOp::And, .. }));
    }

    #[test]
    fn test_chains_nest_to_the_left() {
        let result = parse("a and b and c").unwrap();
        let expected = Expression::and(
            Expression::and(Expression::BareTerm(string("a")), Expression::BareTerm(string("b"))),
            Expression::BareTerm(string("c")),
        );
        assert_eq!(result, expected);
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert!(matches!(parse("a AND b").unwrap(), Expression::Combination { op: BoolOp::And, .. }));
        assert!(matches!(parse("a Or b").unwrap(), Expression::Combination { op: BoolOp::Or, .. }));
    }

    #[test]
    fn test_grouping() {
        let result = parse("(label: prod or label: staging) and size >= 20").unwrap();
        let Expression::Combination { op: BoolOp::And, left, .. } = result else {
            panic!("Expected AND at the root");
        };
        let Expression::Grouping(inner) = *left else {
            panic!("Expected grouping on the left");
        };
        assert!(matches!(*inner, Expression::Combination { op: BoolOp::Or, .. }));
    }

    #[test]
    fn test_missing_value_error() {
        let err = parse("label: ").unwrap_err();
        assert_eq!(err.message, "Expected search value or whitespace but end of input found.");
        assert_eq!(err.position.unwrap().offset, 7);
    }

    #[test]
    fn test_unmatched_paren_errors() {
        let err = parse("(label: prod").unwrap_err();
        assert_eq!(err.message, r#"Expected "and", "or", or ")" but end of input found."#);

        let err = parse("label: prod)").unwrap_err();
        assert_eq!(err.message, r#"Expected "and", "or", or end of input but ")" found."#);
        assert_eq!(err.position.unwrap().column, 12);
    }

    #[test]
    fn test_adjacent_terms_are_an_error() {
        let err = parse("foo bar").unwrap_err();
        assert_eq!(err.position.unwrap().offset, 4);
        assert_eq!(err.expected_tokens, vec!["\"and\"", "\"or\"", "end of input"]);
    }

    #[test]
    fn test_keywords_need_surrounding_whitespace() {
        assert!(parse("a and(b)").is_err());
        assert!(parse("(a)and (b)").is_err());
        assert!(parse("a and").is_err());
        // Not keywords at all: plain words that happen to start with one.
        assert!(parse("android").is_ok());
        assert!(parse("a andb").is_err());
    }

    #[test]
    fn test_trailing_keyword_with_space() {
        let err = parse("a and ").unwrap_err();
        assert_eq!(err.message, r#"Expected "(", search value, or whitespace but end of input found."#);
    }

    #[test]
    fn test_field_with_value_only_characters() {
        // `.` is not a field character, so this is a bare term followed by a stray ':'
        let err = parse("foo.bar: x").unwrap_err();
        assert_eq!(err.position.unwrap().offset, 7);
    }

    #[test]
    fn test_unterminated_quote() {
        let err = parse(r#"label: "prod"#).unwrap_err();
        assert_eq!(err.message, "Expected closing quote but end of input found.");
        assert_eq!(err.position.unwrap().offset, 12);
    }

    #[test]
    fn test_illegal_character() {
        let err = parse("label: #x").unwrap_err();
        assert_eq!(err.message, r##"Expected search value or whitespace but "#" found."##);
    }

    #[test]
    fn test_whitespace_only_query() {
        let err = parse("   ").unwrap_err();
        assert_eq!(err.position.unwrap().offset, 3);
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}a{}", "(".repeat(10), ")".repeat(10));
        assert!(parse_with_max_depth(&deep, 11).is_ok());

        let err = parse_with_max_depth(&deep, 10).unwrap_err();
        assert_eq!(err.message, "Maximum nesting depth of 10 exceeded.");
        assert!(err.expected_tokens.is_empty());
    }

    #[test]
    fn test_pathological_nesting_does_not_overflow() {
        let deep = "(".repeat(100_000);
        let err = parse(&deep).unwrap_err();
        assert!(err.message.contains("Maximum nesting depth"));
    }

    #[test]
    fn test_depth_limit_is_clamped() {
        let err = parse_with_max_depth(&"(".repeat(20_000), usize::MAX).unwrap_err();
        assert_eq!(err.message, format!("Maximum nesting depth of {} exceeded.", MAX_SUPPORTED_DEPTH));

        // A zero limit behaves like 1: a single comparison, nothing nested.
        assert!(parse_with_max_depth("label: a", 0).is_ok());
        let err = parse_with_max_depth("(label: a)", 0).unwrap_err();
        assert_eq!(err.message, "Maximum nesting depth of 1 exceeded.");
    }

    #[test]
    fn test_chain_limit() {
        let chain = vec!["x"; 6].join(" and ");
        assert_eq!(parse_with_max_depth(&chain, 6).unwrap().depth(), 6);
        assert!(parse_with_max_depth(&chain, 5).is_err());
    }
}
