//! Audit log reads and writes.

use chrono::NaiveDateTime;
use duckdb::{params, Connection};
use uuid::Uuid;

use super::Store;
use crate::schema::AuditEntry;
use crate::{Error, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Write an audit entry on `conn`, so it joins any open transaction.
pub(super) fn insert_audit(conn: &Connection, entry: &AuditEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO audit_log (id, created_at, actor, action, query_id, project, page_id) VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            entry.id.to_string(),
            entry.created_at.format(TIMESTAMP_FORMAT).to_string(),
            entry.actor,
            entry.action.as_str(),
            entry.query_id,
            entry.project,
            entry.page_id,
        ],
    )?;
    Ok(())
}

impl Store {
    /// Audit entries for a query, oldest first.
    pub fn audit_entries(&self, query_id: i64) -> Result<Vec<AuditEntry>> {
        let conn = self.connection()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id::VARCHAR, created_at::VARCHAR, actor, action, query_id, project, page_id
            FROM audit_log
            WHERE query_id = ?
            ORDER BY created_at, id
            "#,
        )?;

        let rows = stmt.query_map(params![query_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, Option<i64>>(6)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, created_at, actor, action, query_id, project, page_id) = row?;
            entries.push(AuditEntry {
                id: Uuid::parse_str(&id)
                    .map_err(|e| Error::Storage(format!("bad audit id {}: {}", id, e)))?,
                created_at: parse_timestamp(&created_at)?,
                actor,
                action: action.parse()?,
                query_id,
                project,
                page_id,
            });
        }

        Ok(entries)
    }
}

fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map(|dt| dt.and_utc())
        .map_err(|e| Error::Storage(format!("bad audit timestamp {}: {}", s, e)))
}
