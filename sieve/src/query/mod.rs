//! Term expression parser.
//!
//! # Syntax
//!
//! Comma-separated terms, each trimmed of surrounding whitespace:
//!
//! - `word` - any indexed word starting with `word`
//! - `!word` - exactly the indexed word `word`
//! - `-word` - drop anything indexed under a word starting with `word`
//!
//! Every token parses; there is no syntax error.

mod parser;

pub use parser::{parse_terms, Term, TermQuery};

#[cfg(test)]
mod tests;
