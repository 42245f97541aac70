//! Parser for comma-separated term expressions.

use std::fmt;

/// One comma-separated unit of a term expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    /// `!word`: records indexed under exactly this word.
    ExactInclude(String),
    /// `-word`: drop records indexed under any word starting with this one.
    PrefixExclude(String),
    /// `word`: records indexed under any word starting with this one.
    PrefixInclude(String),
}

impl Term {
    /// The word after the marker has been stripped.
    pub fn word(&self) -> &str {
        match self {
            Term::ExactInclude(word) | Term::PrefixExclude(word) | Term::PrefixInclude(word) => {
                word
            }
        }
    }

    /// Short label for logs and explain output.
    pub fn kind(&self) -> &'static str {
        match self {
            Term::ExactInclude(_) => "exact",
            Term::PrefixExclude(_) => "exclude",
            Term::PrefixInclude(_) => "prefix",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::ExactInclude(word) => write!(f, "!{}", word),
            Term::PrefixExclude(word) => write!(f, "-{}", word),
            Term::PrefixInclude(word) => write!(f, "{}", word),
        }
    }
}

/// A parsed term expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermQuery {
    /// Terms in input order. Order carries no meaning for evaluation.
    pub terms: Vec<Term>,
}

impl TermQuery {
    /// True when there is nothing to filter on.
    pub fn is_match_all(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Term> {
        self.terms.iter()
    }
}

impl<'a> IntoIterator for &'a TermQuery {
    type Item = &'a Term;
    type IntoIter = std::slice::Iter<'a, Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}

/// Parse an optional term expression.
///
/// `None` and the empty string both produce a match-all query. Any other
/// input is split on `,` and every piece becomes a term, including pieces
/// that are empty after trimming.
pub fn parse_terms(input: Option<&str>) -> TermQuery {
    match input {
        Some(raw) if !raw.is_empty() => TermQuery {
            terms: raw.split(',').map(classify).collect(),
        },
        _ => TermQuery::default(),
    }
}

/// Classify a single token by its leading marker.
///
/// Only the first character is a marker. Later `!` and `-` stay part of the
/// word, so `-well-known` excludes the prefix `well-known`, not `wellknown`;
/// the indexer splits on whitespace only, so such words are stored intact.
fn classify(token: &str) -> Term {
    let token = token.trim();

    if let Some(rest) = token.strip_prefix('!') {
        Term::ExactInclude(rest.trim().to_string())
    } else if let Some(rest) = token.strip_prefix('-') {
        Term::PrefixExclude(rest.trim().to_string())
    } else {
        Term::PrefixInclude(token.to_string())
    }
}
