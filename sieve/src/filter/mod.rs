//! Term filtering.
//!
//! Turns a term expression into a [`Decision`] by resolving every term
//! against an [`IndexStore`] and combining the results:
//!
//! - `!word` reads the exact key `namespace + word`
//! - `word` and `-word` scan every key starting with `namespace + word` and
//!   union their sets; a scan that finds no keys contributes nothing
//! - inclusions intersect, exclusions union and are subtracted
//!
//! Terms are independent, so a query with several terms may resolve them
//! concurrently. Any failed lookup fails the whole evaluation.

mod decision;

use crate::index::{index_key, IdSet, IndexStore};
use crate::query::{parse_terms, Term, TermQuery};
use crate::{Error, Result};

pub use decision::{apply, combine, Contribution, Decision, Mode, Restrict};

/// Each term paired with its contribution, and the resulting decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Explanation {
    /// In input order.
    pub terms: Vec<(Term, Contribution)>,
    /// `None` when there were no terms.
    pub decision: Option<Decision>,
}

fn worker_count(terms: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cores.min(terms)
}

/// Evaluates term expressions against an injected index.
pub struct TermFilter<I> {
    index: I,
    namespace: String,
    parallel: bool,
}

impl<I: IndexStore> TermFilter<I> {
    /// Create a filter reading keys under `namespace`.
    pub fn new(index: I, namespace: impl Into<String>) -> Self {
        Self {
            index,
            namespace: namespace.into(),
            parallel: true,
        }
    }

    /// Enable or disable resolving terms on separate threads.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    /// Resolve one term to its contribution.
    pub fn resolve(&self, term: &Term) -> Result<Contribution> {
        let key = index_key(&self.namespace, term.word());

        let contribution = match term {
            Term::ExactInclude(_) => Contribution::Include(self.index.exact_members(&key)?),
            Term::PrefixInclude(_) => match self.prefix_union(&key)? {
                Some(ids) => Contribution::Include(ids),
                None => Contribution::Nothing,
            },
            Term::PrefixExclude(_) => match self.prefix_union(&key)? {
                Some(ids) => Contribution::Exclude(ids),
                None => Contribution::Nothing,
            },
        };

        match contribution.size() {
            Some(n) => tracing::debug!("term {:?} ({}) matched {} ids", term.word(), term.kind(), n),
            None => tracing::debug!("term {:?} ({}) matched no keys", term.word(), term.kind()),
        }

        Ok(contribution)
    }

    /// Union of every set under keys starting with `prefix`, or `None` when
    /// no key matches.
    fn prefix_union(&self, prefix: &str) -> Result<Option<IdSet>> {
        let keys = self.index.keys_matching_prefix(prefix)?;
        if keys.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.index.union_members(&keys)?))
    }

    /// Resolve every term of `query`, in input order.
    pub fn resolve_all(&self, query: &TermQuery) -> Result<Vec<Contribution>> {
        let workers = if self.parallel {
            worker_count(query.len())
        } else {
            1
        };

        if workers > 1 {
            self.resolve_concurrently(&query.terms, workers)
        } else {
            self.resolve_chunk(&query.terms)
        }
    }

    fn resolve_chunk(&self, terms: &[Term]) -> Result<Vec<Contribution>> {
        terms.iter().map(|term| self.resolve(term)).collect()
    }

    /// Resolve `terms` as one contiguous chunk per worker thread. A chunk
    /// whose thread cannot be spawned is resolved on the calling thread.
    fn resolve_concurrently(&self, terms: &[Term], workers: usize) -> Result<Vec<Contribution>> {
        let chunk_len = terms.len().div_ceil(workers);

        let parts: Vec<Result<Vec<Contribution>>> = std::thread::scope(|scope| {
            let pending: Vec<_> = terms
                .chunks(chunk_len)
                .map(|chunk| {
                    std::thread::Builder::new()
                        .name("sieve-resolve".to_string())
                        .spawn_scoped(scope, move || self.resolve_chunk(chunk))
                        .map_err(|e| {
                            tracing::warn!("resolving {} terms inline, spawn failed: {}", chunk.len(), e);
                            chunk
                        })
                })
                .collect();

            // Join every worker before looking at results.
            pending
                .into_iter()
                .map(|spawned| match spawned {
                    Ok(handle) => handle.join().unwrap_or_else(|_| {
                        Err(Error::index_unavailable("term resolver thread panicked"))
                    }),
                    Err(chunk) => self.resolve_chunk(chunk),
                })
                .collect()
        });

        let mut contributions = Vec::with_capacity(terms.len());
        for part in parts {
            contributions.extend(part?);
        }
        Ok(contributions)
    }

    fn combine_logged(&self, contributions: Vec<Contribution>) -> Decision {
        let decision = combine(contributions);
        match decision.mode {
            Mode::KeepOnly => tracing::info!("filter by {} ids", decision.ids.len()),
            Mode::DropOnly => tracing::info!("exclude {} ids", decision.ids.len()),
        }
        decision
    }

    /// Evaluate a parsed query. `None` means there were no terms and
    /// nothing should be restricted.
    pub fn decide(&self, query: &TermQuery) -> Result<Option<Decision>> {
        if query.is_match_all() {
            tracing::info!("empty term query, no restriction applied");
            return Ok(None);
        }

        let contributions = self.resolve_all(query)?;
        Ok(Some(self.combine_logged(contributions)))
    }

    /// Evaluate a parsed query, keeping what each term contributed.
    pub fn explain(&self, query: &TermQuery) -> Result<Explanation> {
        if query.is_match_all() {
            tracing::info!("empty term query, no restriction applied");
            return Ok(Explanation::default());
        }

        let contributions = self.resolve_all(query)?;
        let decision = self.combine_logged(contributions.clone());

        Ok(Explanation {
            terms: query.terms.iter().cloned().zip(contributions).collect(),
            decision: Some(decision),
        })
    }

    /// Parse and evaluate a raw term expression.
    pub fn evaluate(&self, raw: Option<&str>) -> Result<Option<Decision>> {
        self.decide(&parse_terms(raw))
    }

    /// Parse, evaluate and apply a raw term expression to `records`.
    pub fn filter<R: Restrict>(&self, raw: Option<&str>, records: R) -> Result<R> {
        let decision = self.evaluate(raw)?;
        Ok(apply(decision.as_ref(), records))
    }
}

#[cfg(test)]
mod tests;
