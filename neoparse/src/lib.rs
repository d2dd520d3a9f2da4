//! Front end for the Neo language.
//!
//! The entry point is [`parse`](fn.parse.html), which accepts the text of
//! one Neo source file and returns the typed AST of its top-level
//! declarations together with the populated global scope. Symbol
//! resolution happens during parsing: every reference, call and type
//! annotation is checked against the lexical scope chain, and the first
//! violation aborts with a positioned error.
//!
//! Parsing is implemented with [pest], and this crate's
//! [`Error`](type.Error.html) is an alias of `pest::error::Error`, so
//! errors render with the offending line, column and a caret-underlined
//! source excerpt; use `Error::with_path` to prefix them with a file name.
//!
//! # The Neo language
//!
//! Neo is a small statically typed, procedural language with braces and
//! semicolons. A source file is a list of top-level `var` and `func`
//! declarations:
//!
//! ```text
//! var greeting: int = 1;
//!
//! func add(a: int, b: int) -> int {
//!     return a + b;
//! }
//!
//! func main() {
//!     var x = 1 + 2;
//!     var y = x;
//! }
//! ```
//!
//! Comments are `// line` or `/* block */`. The primitive types are
//! `void`, `int`, `uint`, `float`, `double`, `char` and `bool`.
//!
//! ## Declarations
//!
//! | Form | Meaning |
//! |------|---------|
//! | `var x: int;` | declared type, no initializer (warns) |
//! | `var x: int = 1;` | declared type and initializer |
//! | `var x = 1;` | type inferred from the initializer |
//! | `func f(a: int) -> int { .. }` | parameters as `name: type`, optional `-> type` return (default `void`) |
//!
//! ## Statements and expressions
//!
//! Blocks contain `var` declarations, assignments, `if`/`else`, `return`
//! and expression statements. Expressions support the unary operators
//! `- ! *`, the binary operators `+ - * / == != < > <= >=`, integer
//! literals (decimal or `0x` hexadecimal), character literals `'c'`,
//! `true`/`false`, identifiers and calls. `*` and `/` bind tighter than
//! the remaining binary operators, which share one left-associative
//! level; a leading unary operator applies to the first term.
//!
//! [pest]: https://docs.rs/pest/

mod exprs;
mod items;
mod literals;
mod parser;

#[cfg(test)]
mod test;

use neo::ast::Node;
use neo::symtab::Scope;
use parser::{NeoParser, Rule};
use pest::iterators::Pair;
use pest::{Parser, Span};

pub type Error = pest::error::Error<Rule>;

pub type Result<T> = std::result::Result<T, Error>;

/// Parses one Neo source file into its top-level declarations and the
/// global scope accumulated while resolving them.
pub fn parse(input: &str) -> Result<(Vec<Node>, Scope)> {
    items::process_program(parse_program(input)?)
}

/// Prints the token-level view of the source to stdout (the `-d tok`
/// dump): every terminal of the parse tree with its position and rule.
pub fn dump_tokens(input: &str) -> Result<()> {
    let program = parse_program(input)?;
    for pair in program.into_inner().flatten() {
        if pair.clone().into_inner().next().is_none() {
            let (line, col) = pair.as_span().start_pos().line_col();
            println!("{}:{} {:?} '{}'", line, col, pair.as_rule(), pair.as_str());
        }
    }
    Ok(())
}

fn parse_program(input: &str) -> Result<Pair<Rule>> {
    Ok(NeoParser::parse(Rule::program, input)?.next().unwrap())
}

fn new_parser_error(span: Span, message: String) -> Error {
    Error::new_from_span(pest::error::ErrorVariant::CustomError { message }, span)
}

fn span_of(pair: &Pair<Rule>) -> neo::Span {
    let (line, col) = pair.as_span().start_pos().line_col();
    neo::Span::new(line, col)
}
