//! CLI command implementations.

use std::io::{self, Read};

use sieve::{init, parse_terms, Config, Decision, Mode, QueryFilters, Store};

fn open_store() -> sieve::Result<Store> {
    let config = Config::load()?;
    Store::open(config)
}

/// Initialize a sieve store.
pub fn init(prefix: Option<&str>) -> sieve::Result<()> {
    let mut config = Config::default_location()?;

    if init::is_initialized(&config) {
        println!("Sieve already initialized at {}", config.sieve_root.display());
        return Ok(());
    }

    if let Some(prefix) = prefix {
        config.index_prefix = prefix.to_string();
    }

    init::initialize(&config)?;
    println!("Sieve initialized at {}", config.sieve_root.display());
    println!("Index prefix: {}", config.index_prefix);

    Ok(())
}

/// Upload queries from a file or stdin.
pub fn upload(project: i64, file: Option<&str>) -> sieve::Result<()> {
    let store = open_store()?;

    let text = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let actor = store.config().actor.clone();
    let stats = store.upload_queries(project, &text, &actor)?;

    println!(
        "Uploaded to project {}: {} created, {} already present",
        project,
        stats.created.len(),
        stats.existing
    );

    Ok(())
}

/// List queries matching the filters.
pub fn list(filters: &QueryFilters, format: &str) -> sieve::Result<()> {
    let store = open_store()?;
    let page = store.list_queries(filters)?;

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&page)
                .map_err(|e| sieve::Error::Storage(format!("Failed to serialize: {}", e)))?;
            println!("{}", json);
        }
        _ => {
            if page.items.is_empty() {
                println!("No queries found.");
                return Ok(());
            }

            println!(
                "{:<8} {:<8} {:<8} {:<4} {:>10} QUERY",
                "ID", "PROJECT", "PAGE", "DEL", "FREQUENCY"
            );
            println!("{}", "-".repeat(80));

            for record in &page.items {
                let page_id = record
                    .page_id
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let deleted = if record.is_deleted { "yes" } else { "" };
                println!(
                    "{:<8} {:<8} {:<8} {:<4} {:>10} {}",
                    record.id,
                    record.project,
                    page_id,
                    deleted,
                    record.frequency,
                    truncate_string(&record.query, 60)
                );
            }

            println!(
                "\n({} of {} queries, offset {})",
                page.items.len(),
                page.total,
                page.offset
            );
        }
    }

    Ok(())
}

/// Per-term breakdown for `explain --format json`.
#[derive(serde::Serialize)]
struct TermReport {
    kind: &'static str,
    word: String,
    ids: Option<Vec<i64>>,
}

#[derive(serde::Serialize)]
struct ExplainReport {
    terms: Vec<TermReport>,
    decision: Option<Decision>,
}

/// Show how a term expression resolves.
pub fn explain(raw: &str, format: &str) -> sieve::Result<()> {
    let store = open_store()?;
    let filter = store.term_filter()?;
    let query = parse_terms(Some(raw));

    let explanation = filter.explain(&query)?;

    let terms: Vec<TermReport> = explanation
        .terms
        .iter()
        .map(|(term, contribution)| TermReport {
            kind: term.kind(),
            word: term.word().to_string(),
            ids: contribution.ids().map(|ids| ids.iter().copied().collect()),
        })
        .collect();
    let decision = explanation.decision;

    match format {
        "json" => {
            let report = ExplainReport { terms, decision };
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| sieve::Error::Storage(format!("Failed to serialize: {}", e)))?;
            println!("{}", json);
        }
        _ => {
            println!("Namespace: {}", filter.namespace());
            for term in &terms {
                let resolved = match &term.ids {
                    Some(ids) => format!("{} ids {}", ids.len(), format_ids(ids)),
                    None => "no matching keys".to_string(),
                };
                println!("  {:<8} {:<20} {}", term.kind, term.word, resolved);
            }

            match decision {
                None => println!("Decision: no restriction"),
                Some(decision) => {
                    let ids: Vec<i64> = decision.ids.iter().copied().collect();
                    let verb = match decision.mode {
                        Mode::KeepOnly => "keep only",
                        Mode::DropOnly => "drop",
                    };
                    println!("Decision: {} {} ids {}", verb, ids.len(), format_ids(&ids));
                }
            }
        }
    }

    Ok(())
}

/// Toggle the deleted flag of a query.
pub fn set_deleted(id: i64, deleted: bool) -> sieve::Result<()> {
    let store = open_store()?;
    let actor = store.config().actor.clone();
    let record = store.set_deleted(id, deleted, &actor)?;

    let state = if record.is_deleted { "deleted" } else { "restored" };
    println!("Query {} {}: {}", record.id, state, record.query);

    Ok(())
}

/// Move a query to a page or ungroup it.
pub fn assign(id: i64, page: Option<i64>) -> sieve::Result<()> {
    let store = open_store()?;
    let actor = store.config().actor.clone();
    let record = store.assign_page(id, page, &actor)?;

    match record.page_id {
        Some(page_id) => println!("Query {} assigned to page {}", record.id, page_id),
        None => println!("Query {} removed from its page", record.id),
    }

    Ok(())
}

/// Add ids under a word.
pub fn index_add(word: &str, ids: &[i64]) -> sieve::Result<()> {
    let store = open_store()?;
    let inserted = store.index_word(word, ids)?;
    println!(
        "Indexed {} new ids under {}{}",
        inserted,
        store.config().index_prefix,
        word
    );
    Ok(())
}

/// Rebuild the index from the stored queries.
pub fn index_rebuild() -> sieve::Result<()> {
    let store = open_store()?;
    let records = store.reindex()?;
    println!("Reindexed {} queries", records);
    Ok(())
}

/// List index keys.
pub fn index_keys(prefix: &str) -> sieve::Result<()> {
    let store = open_store()?;
    let keys = store.index_keys(prefix)?;

    if keys.is_empty() {
        println!("No index keys.");
        return Ok(());
    }

    for key in &keys {
        println!("{}", key);
    }

    Ok(())
}

/// Show the audit log of a query.
pub fn audit(id: i64, format: &str) -> sieve::Result<()> {
    let store = open_store()?;
    // Fails with NotFound for unknown ids.
    store.get_query(id)?;
    let entries = store.audit_entries(id)?;

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&entries)
                .map_err(|e| sieve::Error::Storage(format!("Failed to serialize: {}", e)))?;
            println!("{}", json);
        }
        _ => {
            println!("{:<20} {:<16} {:<8} ACTOR", "AT", "ACTION", "PAGE");
            println!("{}", "-".repeat(70));
            for entry in &entries {
                let page_id = entry
                    .page_id
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<20} {:<16} {:<8} {}",
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.action,
                    page_id,
                    entry.actor
                );
            }
        }
    }

    Ok(())
}

/// Execute SQL query.
pub fn sql(query: &str) -> sieve::Result<()> {
    let store = open_store()?;

    let result = store.query(query)?;

    if result.rows.is_empty() {
        println!("No results.");
        return Ok(());
    }

    // Calculate column widths
    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.len()).collect();
    for row in &result.rows {
        for (i, val) in row.iter().enumerate() {
            widths[i] = widths[i].max(val.len().min(50));
        }
    }

    for (i, col) in result.columns.iter().enumerate() {
        print!("{:width$} ", col, width = widths[i]);
    }
    println!();

    for width in &widths {
        print!("{} ", "-".repeat(*width));
    }
    println!();

    for row in &result.rows {
        for (i, val) in row.iter().enumerate() {
            print!("{:width$} ", truncate_string(val, 50), width = widths[i]);
        }
        println!();
    }

    println!("\n({} rows)", result.rows.len());

    Ok(())
}

fn format_ids(ids: &[i64]) -> String {
    const SHOWN: usize = 20;
    let mut out: Vec<String> = ids.iter().take(SHOWN).map(|id| id.to_string()).collect();
    if ids.len() > SHOWN {
        out.push("...".to_string());
    }
    format!("{{{}}}", out.join(", "))
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
