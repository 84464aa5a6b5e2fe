//! tagscript: a small templating language with `{$ ... $}` tags.
//!
//! A template is plain text with embedded tags. Text passes through
//! unchanged; tags either print the result of a postfix expression or repeat
//! a block of the template.
//!
//! Supported tags:
//! - `{$= e1 e2 ... $}` evaluates its elements as a stack machine and prints
//!   whatever is left on the stack, bottom first.
//! - `{$ FOR var start end [step] $} ... {$END$}` renders its body for each
//!   value of `var` from `start` up to and including `end`.
//!
//! Elements are integers, doubles (`1.5`), string literals (`"a\n"`),
//! variables, the operators `+ - * / ^` and built-in functions (`@sin`,
//! `@decfmt`, `@dup`, `@swap`, `@paramGet`, `@pparamGet`, `@pparamSet`,
//! `@pparamDel`, `@tparamGet`, `@tparamSet`, `@tparamDel`).
//!
//! In text, `\\` is a backslash and `\{` a literal brace, so `\{$` prints
//! `{$` without opening a tag.
//!
//! Values are dynamically typed: numeric strings are parsed on use, integer
//! arithmetic wraps at 32 bits and mixing in a double promotes the result.
//!
//! Not supported:
//! - User-defined functions.
//! - Operator precedence: echo tags are strictly postfix.
//!
//! ```
//! use tagscript::{render, Bindings};
//!
//! let mut bindings = Bindings::new().with_variable("n", 3);
//! let out = render("{$FOR i 1 n$}{$= i i * $} {$END$}", &mut bindings).unwrap();
//! assert_eq!(out, "1 4 9 ");
//! ```

pub mod ast;
pub mod bindings;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod multistack;
pub mod parser;
pub mod token;
pub mod value;

pub use ast::{Document, ForLoop, Node, NodeId, NodeKind};
pub use bindings::{Bindings, Scope};
pub use error::{Error, LexError, ParseError, RenderError, StackError, ValueError};
pub use eval::Executor;
pub use lexer::{Lexer, LexerMode};
pub use multistack::MultiStack;
pub use parser::Parser;
pub use token::{Element, Token};
pub use value::{Opaque, Value};

/// Parse template source into a [`Document`].
pub fn parse(source: &str) -> Result<Document, ParseError> {
    Parser::new(source).parse()
}

/// Parse `source` and render it once against `bindings`.
///
/// Loop variables are written to `bindings` while their loop runs and
/// restored afterwards; the `@pparam*`/`@tparam*` functions may leave
/// changes behind.
pub fn render(source: &str, bindings: &mut Bindings) -> Result<String, Error> {
    let document = parse(source)?;
    Ok(Executor::new(&document, bindings).render()?)
}
