//! Index backed by the `query_index` table of the DuckDB store.

use duckdb::{params, params_from_iter, Connection};
use parking_lot::Mutex;

use super::{IdSet, IndexStore};
use crate::{Error, Result};

// Keeps IN lists to a size DuckDB binds comfortably.
const UNION_CHUNK: usize = 512;

/// Index stored as `(key, id)` rows.
///
/// Holds one connection as a template; every call clones it, so lookups
/// from several threads run on separate connections to the same database.
pub struct DuckIndex {
    conn: Mutex<Connection>,
}

impl DuckIndex {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn connection(&self) -> Result<Connection> {
        self.conn.lock().try_clone().map_err(|e| {
            tracing::warn!("index connection unavailable: {}", e);
            Error::index_unavailable(e)
        })
    }

    /// Add ids under `key`. Pairs that already exist are left alone.
    pub fn insert(&self, key: &str, ids: &[i64]) -> Result<usize> {
        let conn = self.connection()?;
        Ok(insert_members(&conn, key, ids)?)
    }
}

/// Insert `(key, id)` rows on `conn`, so they join any open transaction.
pub(crate) fn insert_members(conn: &Connection, key: &str, ids: &[i64]) -> duckdb::Result<usize> {
    let mut stmt = conn.prepare("INSERT OR IGNORE INTO query_index VALUES (?, ?)")?;
    let mut inserted = 0;
    for id in ids {
        inserted += stmt.execute(params![key, id])?;
    }
    Ok(inserted)
}

/// Delete rows under `prefix` on `conn`.
pub(crate) fn clear_prefix(conn: &Connection, prefix: &str) -> duckdb::Result<usize> {
    conn.execute(
        "DELETE FROM query_index WHERE starts_with(key, ?)",
        params![prefix],
    )
}

impl IndexStore for DuckIndex {
    fn exact_members(&self, key: &str) -> Result<IdSet> {
        let conn = self.connection()?;
        exact_members(&conn, key).map_err(unavailable)
    }

    fn keys_matching_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let conn = self.connection()?;
        keys_matching_prefix(&conn, prefix).map_err(unavailable)
    }

    fn union_members(&self, keys: &[String]) -> Result<IdSet> {
        if keys.is_empty() {
            return Ok(IdSet::new());
        }
        let conn = self.connection()?;
        union_members(&conn, keys).map_err(unavailable)
    }
}

fn unavailable(e: duckdb::Error) -> Error {
    tracing::warn!("index lookup failed: {}", e);
    Error::index_unavailable(e)
}

fn exact_members(conn: &Connection, key: &str) -> duckdb::Result<IdSet> {
    let mut stmt = conn.prepare("SELECT id FROM query_index WHERE key = ?")?;
    let rows = stmt.query_map(params![key], |row| row.get::<_, i64>(0))?;

    let mut ids = IdSet::new();
    for id in rows {
        ids.insert(id?);
    }
    Ok(ids)
}

fn keys_matching_prefix(conn: &Connection, prefix: &str) -> duckdb::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT key FROM query_index WHERE starts_with(key, ?) ORDER BY key",
    )?;
    let rows = stmt.query_map(params![prefix], |row| row.get::<_, String>(0))?;

    let mut keys = Vec::new();
    for key in rows {
        keys.push(key?);
    }
    Ok(keys)
}

fn union_members(conn: &Connection, keys: &[String]) -> duckdb::Result<IdSet> {
    let mut ids = IdSet::new();

    for chunk in keys.chunks(UNION_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "SELECT DISTINCT id FROM query_index WHERE key IN ({})",
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| row.get::<_, i64>(0))?;
        for id in rows {
            ids.insert(id?);
        }
    }

    Ok(ids)
}
