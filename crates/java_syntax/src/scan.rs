//! Annotated-method discovery over a token stream.
//!
//! ## Scanner state
//!
//! ```text
//! [top level] -- `public ... class Name {` --> [class body, depth 1]
//!                                                  |
//!                        `@Ann(...)` --> pending annotations
//!                        `name (`    --> method header (record if annotated)
//!                        `;` / `=`   --> drop pending annotations
//!                        `{ ... }`   --> skipped (bodies, inner classes)
//! ```

use crate::lexer::{self, ScanError, Token, TokenKind};

/// Public top-level class of a source file and its annotated methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestClass {
    /// Simple class name as declared.
    pub name: String,
    /// Annotated method names in source order.
    pub methods: Vec<String>,
}

/// Scan `source` for the first public top-level class and collect the names of
/// its methods annotated with `annotation` (simple name, e.g. `Test`).
///
/// Qualified annotations such as `@org.junit.Test` match on their last segment.
/// Returns `Ok(None)` when the file declares no public top-level class.
pub fn parse_test_class(source: &str, annotation: &str) -> Result<Option<TestClass>, ScanError> {
    let tokens = lexer::lex(source)?;
    let mut cursor = Cursor { tokens: &tokens, pos: 0 };

    let Some(name) = cursor.find_public_class() else {
        return Ok(None);
    };
    let methods = cursor.collect_annotated_methods(annotation);
    tracing::trace!(class = %name, methods = methods.len(), "scanned test class");
    Ok(Some(TestClass { name, methods }))
}

struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> &TokenKind {
        self.tokens.get(self.pos).map(|t| &t.kind).unwrap_or(&TokenKind::Eof)
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn bump(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    /// Skip a balanced `open ... close` group; the cursor must be on `open`.
    fn skip_group(&mut self, open: &TokenKind, close: &TokenKind) {
        let mut depth = 0usize;
        while !self.at_end() {
            let kind = self.bump();
            if &kind == open {
                depth += 1;
            } else if &kind == close {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return;
                }
            }
        }
    }

    /// Advance past `public ... class Name {` at brace depth 0 and return `Name`.
    fn find_public_class(&mut self) -> Option<String> {
        let mut saw_public = false;
        while !self.at_end() {
            match self.peek().clone() {
                TokenKind::LBrace => {
                    // A non-public top-level type body; skip it entirely.
                    self.skip_group(&TokenKind::LBrace, &TokenKind::RBrace);
                    saw_public = false;
                }
                TokenKind::Semi => {
                    self.bump();
                    saw_public = false;
                }
                TokenKind::At => {
                    // Type annotations may carry arguments.
                    self.bump();
                    self.skip_qualified_name();
                    if matches!(self.peek(), TokenKind::LParen) {
                        self.skip_group(&TokenKind::LParen, &TokenKind::RParen);
                    }
                }
                TokenKind::Ident(word) if word == "public" => {
                    self.bump();
                    saw_public = true;
                }
                TokenKind::Ident(word) if word == "class" && saw_public => {
                    self.bump();
                    let name = match self.bump() {
                        TokenKind::Ident(name) => name,
                        _ => return None,
                    };
                    // Skip generics / extends / implements up to the body.
                    while !self.at_end() && !matches!(self.peek(), TokenKind::LBrace) {
                        self.bump();
                    }
                    self.bump();
                    return Some(name);
                }
                _ => {
                    self.bump();
                }
            }
        }
        None
    }

    /// Consume `Ident (. Ident)*` and return the last segment.
    fn skip_qualified_name(&mut self) -> Option<String> {
        let mut last = match self.peek() {
            TokenKind::Ident(name) => name.clone(),
            _ => return None,
        };
        self.bump();
        while matches!(self.peek(), TokenKind::Dot) {
            if let TokenKind::Ident(name) = self.peek_at(1) {
                last = name.clone();
                self.bump();
                self.bump();
            } else {
                break;
            }
        }
        Some(last)
    }

    /// Walk the class body (cursor just inside the opening brace).
    fn collect_annotated_methods(&mut self, annotation: &str) -> Vec<String> {
        let mut methods = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        while !self.at_end() {
            match self.peek().clone() {
                TokenKind::RBrace => break,
                TokenKind::LBrace => {
                    self.skip_group(&TokenKind::LBrace, &TokenKind::RBrace);
                    pending.clear();
                }
                TokenKind::Semi | TokenKind::Eq => {
                    self.bump();
                    pending.clear();
                }
                TokenKind::At => {
                    self.bump();
                    // `@interface` declares an annotation type, not a use.
                    if matches!(self.peek(), TokenKind::Ident(w) if w == "interface") {
                        continue;
                    }
                    if let Some(name) = self.skip_qualified_name() {
                        pending.push(name);
                    }
                    if matches!(self.peek(), TokenKind::LParen) {
                        self.skip_group(&TokenKind::LParen, &TokenKind::RParen);
                    }
                }
                TokenKind::Ident(name) if matches!(self.peek_at(1), TokenKind::LParen) => {
                    self.bump();
                    self.skip_group(&TokenKind::LParen, &TokenKind::RParen);
                    if pending.iter().any(|a| a == annotation) {
                        methods.push(name);
                    }
                    pending.clear();
                }
                _ => {
                    self.bump();
                }
            }
        }

        methods
    }
}
