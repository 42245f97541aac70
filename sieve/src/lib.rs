//! Sieve: term filtering over a prefix-indexed query store
//!
//! Query records live in DuckDB next to an inverted index of their words.
//! A term expression such as `cat,!food,-dog` resolves against that index
//! into a [`Decision`], which then restricts a record listing.

pub mod config;
pub mod error;
pub mod filter;
pub mod index;
pub mod init;
pub mod query;
pub mod schema;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use filter::{Contribution, Decision, Explanation, Mode, Restrict, TermFilter};
pub use index::{DuckIndex, IdSet, IndexStore, MemoryIndex};
pub use query::{parse_terms, Term, TermQuery};
pub use schema::{AuditAction, AuditEntry, QueryRecord};
pub use store::{Page, QueryFilters, QueryResult, QuerySelect, Store, UploadStats};
