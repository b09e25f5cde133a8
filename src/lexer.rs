//! The lexer for search queries.

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// Current position in the input (byte index)
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// Returns the character at the current position without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// Advances one character and returns it.
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind<'a>, start: usize) -> Token<'a> {
        Token {
            kind,
            span: Span::new(start, self.position),
        }
    }

    /// Reads a quoted literal. The opening quote has already been consumed.
    /// No escape processing: the literal ends at the first matching quote.
    fn read_quoted(&mut self, quote: char, start: usize) -> Token<'a> {
        let content_start = self.position;
        while let Some(c) = self.peek() {
            if c == quote {
                let content = &self.input[content_start..self.position];
                self.bump(); // closing quote
                return self.token(TokenKind::Quoted(content), start);
            }
            self.bump();
        }
        self.token(TokenKind::UnterminatedQuote, start)
    }

    /// Reads an unquoted word: letters, digits, `_`, `-`, `.` and `@`.
    fn read_word(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if is_word_char(c) {
                self.bump();
            } else {
                break;
            }
        }
        self.token(TokenKind::Word(&self.input[start..self.position]), start)
    }
}

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '@')
}

pub fn is_field_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-')
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;

        let c = self.bump()?;

        let token = match c {
            '(' => self.token(TokenKind::LParen, start),
            ')' => self.token(TokenKind::RParen, start),
            ':' => self.token(TokenKind::Colon, start),
            '=' => self.token(TokenKind::Eq, start),
            '<' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Lte, start)
                } else {
                    self.token(TokenKind::Lt, start)
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Gte, start)
                } else {
                    self.token(TokenKind::Gt, start)
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::NotEq, start)
                } else {
                    self.token(TokenKind::Illegal, start)
                }
            }
            '"' | '\'' => self.read_quoted(c, start),
            c if is_word_char(c) => self.read_word(start),
            _ => self.token(TokenKind::Illegal, start),
        };
        Some(token)
    }
}
