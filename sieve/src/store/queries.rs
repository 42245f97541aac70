//! Query record storage and filtered listing.

use duckdb::{params, Connection, OptionalExt, Row};
use serde::Serialize;

use super::indexing::index_text;
use super::Store;
use crate::filter::Restrict;
use crate::index::IdSet;
use crate::schema::{AuditAction, AuditEntry, QueryRecord};
use crate::{Error, Result};

const COLUMNS: &str = "id, project, query, page_id, is_deleted, frequency, frequency_quotes, frequency_quotes_exact";

/// Filters for listing query records.
#[derive(Debug, Default, Clone)]
pub struct QueryFilters {
    /// Only records of this project.
    pub project: Option<i64>,
    /// Only records grouped under this page.
    pub page_id: Option<i64>,
    /// `Some(true)` for ungrouped records, `Some(false)` for grouped ones.
    pub page_isnull: Option<bool>,
    /// Filter on the soft-delete flag.
    pub is_deleted: Option<bool>,
    /// Exact query text.
    pub query: Option<String>,
    /// Term expression resolved against the inverted index.
    pub terms: Option<String>,
    /// Page size; defaults to the configured page limit.
    pub limit: Option<usize>,
    /// Rows to skip.
    pub offset: usize,
}

impl QueryFilters {
    /// Select carrying every filter except the term expression.
    pub fn select(&self) -> QuerySelect {
        let mut select = QuerySelect::new();

        if let Some(project) = self.project {
            select = select.condition(format!("project = {}", project));
        }

        if let Some(page_id) = self.page_id {
            select = select.condition(format!("page_id = {}", page_id));
        }

        match self.page_isnull {
            Some(true) => select = select.condition("page_id IS NULL"),
            Some(false) => select = select.condition("page_id IS NOT NULL"),
            None => {}
        }

        if let Some(deleted) = self.is_deleted {
            select = select.condition(format!("is_deleted = {}", deleted));
        }

        if let Some(ref text) = self.query {
            select = select.condition(format!("query = '{}'", text.replace('\'', "''")));
        }

        select
    }
}

/// WHERE conditions over the `queries` table, joined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySelect {
    conditions: Vec<String>,
}

impl QuerySelect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition.
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    /// Render as a WHERE clause, or an empty string when unrestricted.
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }
}

fn id_list(ids: &IdSet) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Restrict for QuerySelect {
    fn keep_ids(self, ids: &IdSet) -> Self {
        if ids.is_empty() {
            return self.condition("FALSE");
        }
        self.condition(format!("id IN ({})", id_list(ids)))
    }

    fn drop_ids(self, ids: &IdSet) -> Self {
        if ids.is_empty() {
            return self;
        }
        self.condition(format!("id NOT IN ({})", id_list(ids)))
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Matching rows before pagination.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub items: Vec<T>,
}

/// Outcome of an upload.
#[derive(Debug, Default, Clone, Serialize)]
pub struct UploadStats {
    /// Records created by this upload.
    pub created: Vec<QueryRecord>,
    /// Lines that matched an existing record.
    pub existing: usize,
}

fn record_from_row(row: &Row<'_>) -> duckdb::Result<QueryRecord> {
    Ok(QueryRecord {
        id: row.get(0)?,
        project: row.get(1)?,
        query: row.get(2)?,
        page_id: row.get(3)?,
        is_deleted: row.get(4)?,
        frequency: row.get(5)?,
        frequency_quotes: row.get(6)?,
        frequency_quotes_exact: row.get(7)?,
    })
}

fn find_query(conn: &Connection, project: i64, text: &str) -> Result<Option<QueryRecord>> {
    let record = conn
        .query_row(
            &format!("SELECT {} FROM queries WHERE project = ? AND query = ?", COLUMNS),
            params![project, text],
            record_from_row,
        )
        .optional()?;
    Ok(record)
}

fn fetch_query(conn: &Connection, id: i64) -> Result<Option<QueryRecord>> {
    let record = conn
        .query_row(
            &format!("SELECT {} FROM queries WHERE id = ?", COLUMNS),
            params![id],
            record_from_row,
        )
        .optional()?;
    Ok(record)
}

impl Store {
    /// List query records matching `filters`, most frequent first.
    ///
    /// The term expression is resolved against the index before the records
    /// are read; if the index fails, so does the listing.
    pub fn list_queries(&self, filters: &QueryFilters) -> Result<Page<QueryRecord>> {
        let select = self
            .term_filter()?
            .filter(filters.terms.as_deref(), filters.select())?;
        let where_clause = select.where_clause();

        let conn = self.connection()?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM queries {}", where_clause),
            [],
            |row| row.get(0),
        )?;

        let limit = self.config.effective_limit(filters.limit);
        let sql = format!(
            "SELECT {} FROM queries {} ORDER BY frequency DESC, query ASC LIMIT {} OFFSET {}",
            COLUMNS, where_clause, limit, filters.offset
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], record_from_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }

        Ok(Page {
            total: total as usize,
            limit,
            offset: filters.offset,
            items,
        })
    }

    /// Get one record by id.
    pub fn get_query(&self, id: i64) -> Result<QueryRecord> {
        let conn = self.connection()?;
        fetch_query(&conn, id)?.ok_or_else(|| Error::NotFound(format!("query {}", id)))
    }

    /// Count all records in the store.
    pub fn query_count(&self) -> Result<i64> {
        let conn = self.connection()?;
        let count = conn.query_row("SELECT COUNT(*) FROM queries", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Add newline-separated queries to a project.
    ///
    /// Lines are trimmed and blank lines skipped. Each line not already
    /// present is created, audited and indexed in one transaction; if any
    /// step fails nothing is kept.
    pub fn upload_queries(&self, project: i64, text: &str, actor: &str) -> Result<UploadStats> {
        let stats = self.in_transaction(|conn| {
            let mut stats = UploadStats::default();

            for line in text.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                if find_query(conn, project, line)?.is_some() {
                    stats.existing += 1;
                    continue;
                }

                let id: i64 = conn.query_row(
                    "INSERT INTO queries (project, query) VALUES (?, ?) RETURNING id",
                    params![project, line],
                    |row| row.get(0),
                )?;
                let record = fetch_query(conn, id)?
                    .ok_or_else(|| Error::Storage(format!("query {} vanished after insert", id)))?;

                super::audit::insert_audit(
                    conn,
                    &AuditEntry::new(actor, AuditAction::QueryCreate, &record),
                )?;
                index_text(conn, &self.config.index_prefix, record.id, &record.query)?;
                stats.created.push(record);
            }

            Ok(stats)
        })?;

        tracing::info!(
            "upload to project {}: {} created, {} existing",
            project,
            stats.created.len(),
            stats.existing
        );
        Ok(stats)
    }

    /// Set the soft-delete flag, auditing the change if there is one.
    pub fn set_deleted(&self, id: i64, deleted: bool, actor: &str) -> Result<QueryRecord> {
        self.in_transaction(|conn| {
            let mut record =
                fetch_query(conn, id)?.ok_or_else(|| Error::NotFound(format!("query {}", id)))?;

            if record.is_deleted == deleted {
                return Ok(record);
            }

            conn.execute(
                "UPDATE queries SET is_deleted = ? WHERE id = ?",
                params![deleted, id],
            )?;
            record.is_deleted = deleted;

            let action = if deleted {
                AuditAction::QueryDelete
            } else {
                AuditAction::QueryUndelete
            };
            super::audit::insert_audit(conn, &AuditEntry::new(actor, action, &record))?;

            Ok(record)
        })
    }

    /// Move a record to another page, or ungroup it with `None`.
    ///
    /// Leaving a page is audited as a shrink of that page and joining one as
    /// an expansion.
    pub fn assign_page(&self, id: i64, page_id: Option<i64>, actor: &str) -> Result<QueryRecord> {
        self.in_transaction(|conn| {
            let mut record =
                fetch_query(conn, id)?.ok_or_else(|| Error::NotFound(format!("query {}", id)))?;

            if record.page_id == page_id {
                return Ok(record);
            }

            let old_page = record.page_id;
            conn.execute(
                "UPDATE queries SET page_id = ? WHERE id = ?",
                params![page_id, id],
            )?;
            record.page_id = page_id;

            if let Some(old) = old_page {
                let entry = AuditEntry::new(actor, AuditAction::GroupShrink, &record).with_page(old);
                super::audit::insert_audit(conn, &entry)?;
            }

            if let Some(new) = page_id {
                let entry = AuditEntry::new(actor, AuditAction::GroupExpand, &record).with_page(new);
                super::audit::insert_audit(conn, &entry)?;
            }

            Ok(record)
        })
    }

    /// Update the frequency columns of a record.
    pub fn set_frequencies(
        &self,
        id: i64,
        frequency: i64,
        frequency_quotes: i64,
        frequency_quotes_exact: i64,
    ) -> Result<QueryRecord> {
        let conn = self.connection()?;
        let changed = conn.execute(
            "UPDATE queries SET frequency = ?, frequency_quotes = ?, frequency_quotes_exact = ? WHERE id = ?",
            params![frequency, frequency_quotes, frequency_quotes_exact, id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("query {}", id)));
        }
        self.get_query(id)
    }
}
