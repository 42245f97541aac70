//! Store - handles reading and writing query records.
//!
//! Uses one DuckDB database for records, the inverted index, and the audit
//! log. Every operation runs on a connection cloned from the one opened in
//! [`Store::open`].

mod audit;
mod indexing;
mod queries;

use duckdb::{types::ValueRef, Connection};

use crate::filter::TermFilter;
use crate::index::DuckIndex;
use crate::{Config, Error, Result};

pub use queries::{Page, QueryFilters, QuerySelect, UploadStats};

/// A sieve store for reading and writing records.
pub struct Store {
    config: Config,
    conn: Connection,
}

impl Store {
    /// Open an existing store.
    pub fn open(config: Config) -> Result<Self> {
        if !config.db_path().exists() {
            return Err(Error::NotInitialized(config.sieve_root.clone()));
        }
        let conn = Connection::open(config.db_path())?;
        Ok(Self { config, conn })
    }

    /// Get a DuckDB connection to the store.
    pub fn connection(&self) -> Result<Connection> {
        Ok(self.conn.try_clone()?)
    }

    /// Get config reference.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The inverted index stored alongside the records.
    pub fn index(&self) -> Result<DuckIndex> {
        Ok(DuckIndex::new(self.connection()?))
    }

    /// A term filter over this store's index and configured namespace.
    pub fn term_filter(&self) -> Result<TermFilter<DuckIndex>> {
        Ok(TermFilter::new(self.index()?, self.config.index_prefix.clone())
            .with_parallel(self.config.parallel_resolve))
    }

    /// Run `body` inside a transaction, rolling back if it fails.
    fn in_transaction<T>(&self, body: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.connection()?;

        conn.execute("BEGIN TRANSACTION", [])?;

        match body(&conn) {
            Ok(value) => {
                conn.execute("COMMIT", [])?;
                Ok(value)
            }
            Err(e) => {
                // Rollback on error
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    /// Query the store using SQL.
    ///
    /// Returns results as a Vec of rows, where each row is a Vec of string values.
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql)?;

        let mut rows_iter = stmt.query([])?;

        let column_count = rows_iter.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let column_names: Vec<String> = if let Some(row_ref) = rows_iter.as_ref() {
            (0..column_count)
                .map(|i| {
                    row_ref
                        .column_name(i)
                        .map(|s| s.to_string())
                        .unwrap_or_else(|_| format!("col{}", i))
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut result_rows = Vec::new();
        while let Some(row) = rows_iter.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value = match row.get_ref(i)? {
                    ValueRef::Null => "NULL".to_string(),
                    ValueRef::Boolean(b) => b.to_string(),
                    ValueRef::TinyInt(n) => n.to_string(),
                    ValueRef::SmallInt(n) => n.to_string(),
                    ValueRef::Int(n) => n.to_string(),
                    ValueRef::BigInt(n) => n.to_string(),
                    ValueRef::HugeInt(n) => n.to_string(),
                    ValueRef::UTinyInt(n) => n.to_string(),
                    ValueRef::USmallInt(n) => n.to_string(),
                    ValueRef::UInt(n) => n.to_string(),
                    ValueRef::UBigInt(n) => n.to_string(),
                    ValueRef::Float(f) => f.to_string(),
                    ValueRef::Double(f) => f.to_string(),
                    ValueRef::Decimal(d) => d.to_string(),
                    ValueRef::Text(s) => String::from_utf8_lossy(s).to_string(),
                    ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
                    _ => "<complex>".to_string(),
                };
                values.push(value);
            }
            result_rows.push(values);
        }

        Ok(QueryResult {
            columns: column_names,
            rows: result_rows,
        })
    }
}

/// Result of a raw SQL query.
#[derive(Debug)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
