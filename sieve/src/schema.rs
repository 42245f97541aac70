//! Schema definitions for sieve tables.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// A search query tracked for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Store-assigned identifier; the ids held in the inverted index.
    pub id: i64,

    /// Owning project.
    pub project: i64,

    /// The query text.
    pub query: String,

    /// Landing page the query is grouped under.
    pub page_id: Option<i64>,

    /// Soft-delete flag.
    pub is_deleted: bool,

    /// Broad-match search frequency.
    pub frequency: i64,

    /// Frequency for the quoted form.
    pub frequency_quotes: i64,

    /// Frequency for the quoted exact form.
    pub frequency_quotes_exact: i64,
}

/// Kinds of change written to the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    QueryCreate,
    QueryDelete,
    QueryUndelete,
    /// Query removed from a page.
    GroupShrink,
    /// Query added to a page.
    GroupExpand,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::QueryCreate => "query_create",
            AuditAction::QueryDelete => "query_delete",
            AuditAction::QueryUndelete => "query_undelete",
            AuditAction::GroupShrink => "group_shrink",
            AuditAction::GroupExpand => "group_expand",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query_create" => Ok(AuditAction::QueryCreate),
            "query_delete" => Ok(AuditAction::QueryDelete),
            "query_undelete" => Ok(AuditAction::QueryUndelete),
            "group_shrink" => Ok(AuditAction::GroupShrink),
            "group_expand" => Ok(AuditAction::GroupExpand),
            other => Err(Error::Storage(format!("unknown audit action: {}", other))),
        }
    }
}

/// One audit log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique identifier (UUIDv7 for time-ordering).
    pub id: Uuid,

    pub created_at: DateTime<Utc>,

    pub actor: String,

    pub action: AuditAction,

    pub query_id: Option<i64>,

    pub project: i64,

    /// Page involved in a group change.
    pub page_id: Option<i64>,
}

impl AuditEntry {
    /// Create an entry stamped now.
    pub fn new(actor: impl Into<String>, action: AuditAction, record: &QueryRecord) -> Self {
        Self {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            actor: actor.into(),
            action,
            query_id: Some(record.id),
            project: record.project,
            page_id: None,
        }
    }

    /// Attach the page a group change refers to.
    pub fn with_page(mut self, page_id: i64) -> Self {
        self.page_id = Some(page_id);
        self
    }
}
