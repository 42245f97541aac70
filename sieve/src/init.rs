//! Store initialization - creates the directory structure and database.
//!
//! # Tables
//!
//! - `queries` - query records, unique per `(project, query)`
//! - `query_index` - inverted index rows `(key, id)`; keys start with the
//!   configured index prefix
//! - `audit_log` - who changed which query, and how

use std::fs;

use crate::{Config, Error, Result};

/// Initialize a new sieve store.
pub fn initialize(config: &Config) -> Result<()> {
    let sieve_root = &config.sieve_root;

    // Check if already initialized
    if is_initialized(config) {
        return Err(Error::AlreadyInitialized(sieve_root.clone()));
    }

    fs::create_dir_all(sieve_root.join("db"))?;

    init_database(config)?;

    config.save()?;

    Ok(())
}

/// Whether a database already exists for this config.
pub fn is_initialized(config: &Config) -> bool {
    config.db_path().exists()
}

/// Create all tables.
fn init_database(config: &Config) -> Result<()> {
    let conn = duckdb::Connection::open(config.db_path())?;

    conn.execute_batch(
        r#"
        CREATE SEQUENCE IF NOT EXISTS query_id_seq START 1;

        CREATE TABLE IF NOT EXISTS queries (
            id BIGINT PRIMARY KEY DEFAULT nextval('query_id_seq'),
            project BIGINT NOT NULL,
            query VARCHAR NOT NULL,
            page_id BIGINT,
            is_deleted BOOLEAN NOT NULL DEFAULT false,
            frequency BIGINT NOT NULL DEFAULT 0,
            frequency_quotes BIGINT NOT NULL DEFAULT 0,
            frequency_quotes_exact BIGINT NOT NULL DEFAULT 0,
            UNIQUE (project, query)
        );

        CREATE TABLE IF NOT EXISTS query_index (
            key VARCHAR NOT NULL,
            id BIGINT NOT NULL,
            PRIMARY KEY (key, id)
        );

        CREATE TABLE IF NOT EXISTS audit_log (
            id UUID PRIMARY KEY,
            created_at TIMESTAMP NOT NULL,
            actor VARCHAR NOT NULL,
            action VARCHAR NOT NULL,
            query_id BIGINT,
            project BIGINT NOT NULL,
            page_id BIGINT
        );
        "#,
    )?;

    Ok(())
}
