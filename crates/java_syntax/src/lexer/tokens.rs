//! Token types for the Java lexer.
//!
//! Only the punctuation the scanner cares about gets its own kind. Everything
//! else collapses into `Other` or `Literal`.

/// Kind of token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // ========== Identifiers and Literals ==========
    Ident(String),
    /// String, text block, char or numeric literal (content dropped)
    Literal,

    // ========== Punctuation ==========
    At,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Semi,
    Eq,
    Dot,
    Other(char),

    // ========== Special ==========
    Eof,
}

/// A token with its kind and 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize) -> Self {
        Self { kind, line }
    }
}
