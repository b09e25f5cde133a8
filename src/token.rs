//! The token definition for the search language.

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
///
/// `and` / `or` are not separate kinds: they are ordinary words that the
/// parser promotes to keywords when they sit between two expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // Literals
    Word(&'a str),   // label, my-linode, 100, user@example.com
    Quoted(&'a str), // The content between the quotes, quotes stripped

    // Punctuation
    LParen, // (
    RParen, // )

    // Operators
    Colon, // :
    Eq,    // =
    NotEq, // !=
    Lt,    // <
    Gt,    // >
    Lte,   // <=
    Gte,   // >=

    // Special
    Illegal,           // An illegal/unknown character
    UnterminatedQuote, // An opening quote with no matching close
}

impl TokenKind<'_> {
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            TokenKind::Colon
                | TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::Lte
                | TokenKind::Gte
        )
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
