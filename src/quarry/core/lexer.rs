//! Hand-written tokenizer for the build-file language.

use crate::util::errors::{DiagnosticError, Location, QuarryResult};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Integer(i64),
    String(String),
    // punctuation
    Equals,
    PlusEquals,
    MinusEquals,
    Plus,
    Minus,
    EqEq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    AndAnd,
    OrOr,
    Bang,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    If,
    Else,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

pub struct Lexer<'a> {
    file: &'a Path,
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(file: &'a Path, source: &str) -> Lexer<'a> {
        Lexer {
            file,
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(mut self) -> QuarryResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let location = self.location();
            let Some(c) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    location,
                });
                break;
            };

            let kind = match c {
                '=' => {
                    self.advance();
                    if self.eat('=') {
                        TokenKind::EqEq
                    } else {
                        TokenKind::Equals
                    }
                }
                '+' => {
                    self.advance();
                    if self.eat('=') {
                        TokenKind::PlusEquals
                    } else {
                        TokenKind::Plus
                    }
                }
                '-' => {
                    self.advance();
                    if self.eat('=') {
                        TokenKind::MinusEquals
                    } else {
                        TokenKind::Minus
                    }
                }
                '!' => {
                    self.advance();
                    if self.eat('=') {
                        TokenKind::NotEq
                    } else {
                        TokenKind::Bang
                    }
                }
                '<' => {
                    self.advance();
                    if self.eat('=') {
                        TokenKind::LessEq
                    } else {
                        TokenKind::Less
                    }
                }
                '>' => {
                    self.advance();
                    if self.eat('=') {
                        TokenKind::GreaterEq
                    } else {
                        TokenKind::Greater
                    }
                }
                '&' => {
                    self.advance();
                    if self.eat('&') {
                        TokenKind::AndAnd
                    } else {
                        return Err(self.err(location, "unexpected character `&`").into());
                    }
                }
                '|' => {
                    self.advance();
                    if self.eat('|') {
                        TokenKind::OrOr
                    } else {
                        return Err(self.err(location, "unexpected character `|`").into());
                    }
                }
                '(' => {
                    self.advance();
                    TokenKind::LParen
                }
                ')' => {
                    self.advance();
                    TokenKind::RParen
                }
                '{' => {
                    self.advance();
                    TokenKind::LBrace
                }
                '}' => {
                    self.advance();
                    TokenKind::RBrace
                }
                '[' => {
                    self.advance();
                    TokenKind::LBracket
                }
                ']' => {
                    self.advance();
                    TokenKind::RBracket
                }
                ',' => {
                    self.advance();
                    TokenKind::Comma
                }
                '.' => {
                    self.advance();
                    TokenKind::Dot
                }
                '"' => self.lex_string(location)?,
                c if c.is_ascii_digit() => self.lex_number(),
                c if unicode_xid::UnicodeXID::is_xid_start(c) || c == '_' => {
                    self.lex_identifier_or_keyword()
                }
                other => {
                    return Err(self
                        .err(location, format!("unexpected character `{}`", other))
                        .into())
                }
            };
            tokens.push(Token { kind, location });
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn err(&self, location: Location, message: impl Into<String>) -> DiagnosticError {
        DiagnosticError::new(self.file.to_path_buf(), location, message)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_number(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        TokenKind::Integer(text.parse().unwrap_or(0))
    }

    fn lex_identifier_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;
        while self
            .peek()
            .map_or(false, |c| unicode_xid::UnicodeXID::is_xid_continue(c) || c == '_')
        {
            self.advance();
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match text.as_str() {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "true" => TokenKind::Identifier("true".to_string()),
            "false" => TokenKind::Identifier("false".to_string()),
            _ => TokenKind::Identifier(text),
        }
    }

    fn lex_string(&mut self, start_location: Location) -> QuarryResult<TokenKind> {
        self.advance(); // opening quote
        let mut out = String::new();
        loop {
            match self.advance() {
                None => return Err(self.err(start_location, "unterminated string literal").into()),
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('$') => out.push('$'),
                    Some(other) => out.push(other),
                    None => {
                        return Err(self
                            .err(start_location, "unterminated escape sequence")
                            .into())
                    }
                },
                Some(c) => out.push(c),
            }
        }
        Ok(TokenKind::String(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tokens(src: &str) -> Vec<TokenKind> {
        let path = PathBuf::from("//BUILD.gn");
        Lexer::new(&path, src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_assignment() {
        assert_eq!(
            tokens("x = 1"),
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::Equals,
                TokenKind::Integer(1),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_string_with_escapes() {
        assert_eq!(
            tokens(r#""a\"b""#),
            vec![TokenKind::String("a\"b".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn skips_hash_comments() {
        assert_eq!(
            tokens("# comment\nx = 1"),
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::Equals,
                TokenKind::Integer(1),
                TokenKind::Eof,
            ]
        );
    }
}
