//! Lexer for Java source text
//!
//! Handles just enough of the language to find method headers safely:
//! - Line and block comments (including Javadoc) are skipped
//! - String, text-block and char literals are skipped with escapes honored
//! - Numeric literals collapse into a single `Literal` token
//! - Identifiers follow Java rules (`_` and `$` allowed)

pub mod tokens;

pub use tokens::{Token, TokenKind};

use thiserror::Error;

/// Errors raised while tokenizing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("unterminated block comment starting at line {line}")]
    UnterminatedComment { line: usize },

    #[error("unterminated string literal starting at line {line}")]
    UnterminatedString { line: usize },

    #[error("unterminated char literal starting at line {line}")]
    UnterminatedChar { line: usize },
}

/// Lexer for Java source code.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the entire source. The stream always ends with `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ScanError> {
        while let Some(c) = self.advance() {
            self.scan_token(c)?;
        }
        self.tokens.push(Token::new(TokenKind::Eof, self.line));
        Ok(self.tokens)
    }

    // ========================================================================
    // Core character handling
    // ========================================================================

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn push(&mut self, kind: TokenKind) {
        self.tokens.push(Token::new(kind, self.line));
    }

    fn scan_token(&mut self, c: char) -> Result<(), ScanError> {
        match c {
            c if c.is_whitespace() => {}
            '/' if self.peek() == Some('/') => self.skip_line_comment(),
            '/' if self.peek() == Some('*') => self.skip_block_comment()?,
            '"' => self.skip_string()?,
            '\'' => self.skip_char()?,
            '@' => self.push(TokenKind::At),
            '(' => self.push(TokenKind::LParen),
            ')' => self.push(TokenKind::RParen),
            '{' => self.push(TokenKind::LBrace),
            '}' => self.push(TokenKind::RBrace),
            ';' => self.push(TokenKind::Semi),
            '=' => self.push(TokenKind::Eq),
            '.' => self.push(TokenKind::Dot),
            c if c.is_ascii_digit() => self.skip_number(),
            c if is_ident_start(c) => self.scan_ident(c),
            other => self.push(TokenKind::Other(other)),
        }
        Ok(())
    }

    // ========================================================================
    // Skipped regions
    // ========================================================================

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ScanError> {
        let start = self.line;
        self.advance(); // '*'
        let mut prev = '\0';
        while let Some(c) = self.advance() {
            if prev == '*' && c == '/' {
                return Ok(());
            }
            prev = c;
        }
        Err(ScanError::UnterminatedComment { line: start })
    }

    fn skip_string(&mut self) -> Result<(), ScanError> {
        let start = self.line;
        // Text block: """ ... """
        if self.peek() == Some('"') {
            self.advance();
            if self.peek() != Some('"') {
                // Empty string literal ""
                self.push(TokenKind::Literal);
                return Ok(());
            }
            self.advance();
            let mut quotes = 0;
            while let Some(c) = self.advance() {
                match c {
                    '\\' => {
                        self.advance();
                        quotes = 0;
                    }
                    '"' => {
                        quotes += 1;
                        if quotes == 3 {
                            self.push(TokenKind::Literal);
                            return Ok(());
                        }
                    }
                    _ => quotes = 0,
                }
            }
            return Err(ScanError::UnterminatedString { line: start });
        }

        while let Some(c) = self.advance() {
            match c {
                '\\' => {
                    self.advance();
                }
                '"' => {
                    self.push(TokenKind::Literal);
                    return Ok(());
                }
                '\n' => break,
                _ => {}
            }
        }
        Err(ScanError::UnterminatedString { line: start })
    }

    fn skip_char(&mut self) -> Result<(), ScanError> {
        let start = self.line;
        while let Some(c) = self.advance() {
            match c {
                '\\' => {
                    self.advance();
                }
                '\'' => {
                    self.push(TokenKind::Literal);
                    return Ok(());
                }
                '\n' => break,
                _ => {}
            }
        }
        Err(ScanError::UnterminatedChar { line: start })
    }

    fn skip_number(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                self.advance();
            } else {
                break;
            }
        }
        self.push(TokenKind::Literal);
    }

    fn scan_ident(&mut self, first: char) {
        let mut name = String::from(first);
        while let Some(c) = self.peek() {
            if is_ident_part(c) {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        self.push(TokenKind::Ident(name));
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Tokenize Java source text.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn lex(source: &str) -> Result<Vec<Token>, ScanError> {
    Lexer::new(source).tokenize()
}
