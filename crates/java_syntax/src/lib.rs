//! Light source-level scanner for Java test classes.
//!
//! This crate answers one question: given the text of a `.java` file, which
//! methods of its public top-level class carry a given annotation (usually
//! `@Test`)? It is deliberately not a Java parser. It tokenizes just enough to
//! skip comments and literals, tracks brace depth, and reads method headers.
//!
//! ## Notes
//! - Method order is source order. Callers rely on that for reproducible output.
//! - Inner classes, anonymous classes and lambdas are never scanned.
//!
//! ## Examples
//! ```rust
//! use java_syntax::scan;
//!
//! let source = "public class FooTest { @Test public void a() {} }";
//! let class = scan::parse_test_class(source, "Test").unwrap().unwrap();
//! assert_eq!(class.name, "FooTest");
//! assert_eq!(class.methods, vec!["a".to_string()]);
//! ```

pub mod lexer;
pub mod scan;

pub use lexer::{ScanError, Token, TokenKind};
pub use scan::{TestClass, parse_test_class};
