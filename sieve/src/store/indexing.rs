//! Keeping the inverted index in step with the records.

use duckdb::Connection;

use super::Store;
use crate::index::{clear_prefix, index_key, index_words, insert_members, IndexStore};
use crate::schema::QueryRecord;
use crate::Result;

/// Index the words of `text` for record `id` on `conn`.
pub(super) fn index_text(conn: &Connection, namespace: &str, id: i64, text: &str) -> Result<usize> {
    let mut inserted = 0;
    for word in index_words(text) {
        inserted += insert_members(conn, &index_key(namespace, &word), &[id])?;
    }
    Ok(inserted)
}

impl Store {
    /// Add ids under `word` in this store's namespace.
    pub fn index_word(&self, word: &str, ids: &[i64]) -> Result<usize> {
        let key = index_key(&self.config.index_prefix, word);
        self.index()?.insert(&key, ids)
    }

    /// Index every word of a record's query text.
    pub fn index_record(&self, record: &QueryRecord) -> Result<usize> {
        let conn = self.connection()?;
        let inserted = index_text(&conn, &self.config.index_prefix, record.id, &record.query)?;
        tracing::debug!("indexed query {} under {} new keys", record.id, inserted);
        Ok(inserted)
    }

    /// Drop this namespace's keys and index every record again.
    ///
    /// Keys outside the namespace are left untouched. Returns the number of
    /// records indexed.
    pub fn reindex(&self) -> Result<usize> {
        let namespace = &self.config.index_prefix;

        let (records, removed) = self.in_transaction(|conn| {
            let removed = clear_prefix(conn, namespace)?;

            let mut stmt = conn.prepare("SELECT id, query FROM queries ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut records = 0;
            for row in rows {
                let (id, query) = row?;
                index_text(conn, namespace, id, &query)?;
                records += 1;
            }
            Ok((records, removed))
        })?;

        tracing::info!(
            "reindexed {} queries ({} stale rows removed)",
            records,
            removed
        );
        Ok(records)
    }

    /// Keys in this namespace whose word starts with `word_prefix`.
    pub fn index_keys(&self, word_prefix: &str) -> Result<Vec<String>> {
        let prefix = index_key(&self.config.index_prefix, word_prefix);
        self.index()?.keys_matching_prefix(&prefix)
    }
}
