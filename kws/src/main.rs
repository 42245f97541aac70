//! kws: Keyword Sieve - CLI for uploading and filtering search queries.

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "kws")]
#[command(about = "Keyword Sieve - store search queries and filter them by indexed terms")]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a sieve store
    Init {
        /// Namespace prepended to every index key (default: queryindex_)
        #[arg(short = 'p', long = "prefix")]
        prefix: Option<String>,
    },

    /// Upload newline-separated queries to a project
    #[command(visible_alias = "u")]
    Upload {
        /// Project the queries belong to
        #[arg(short = 'P', long = "project")]
        project: i64,

        /// File to read queries from (reads stdin if not provided)
        file: Option<String>,
    },

    /// List queries, most frequent first
    #[command(visible_aliases = ["l", "ls"])]
    List {
        /// Term expression, e.g. "cat,!food,-dog"
        #[arg(short = 't', long = "terms")]
        terms: Option<String>,

        /// Only queries of this project
        #[arg(short = 'P', long = "project")]
        project: Option<i64>,

        /// Only queries grouped under this page
        #[arg(long = "page", conflicts_with = "no_page")]
        page: Option<i64>,

        /// Only queries not grouped under any page
        #[arg(long = "no-page")]
        no_page: bool,

        /// Only queries grouped under some page
        #[arg(long = "has-page", conflicts_with_all = ["page", "no_page"])]
        has_page: bool,

        /// Filter on the deleted flag (true or false)
        #[arg(short = 'd', long = "deleted")]
        deleted: Option<bool>,

        /// Exact query text
        #[arg(short = 'q', long = "query")]
        query: Option<String>,

        /// Page size (clamped to the configured maximum)
        #[arg(short = 'n', long = "limit")]
        limit: Option<usize>,

        /// Rows to skip
        #[arg(short = 'o', long = "offset", default_value = "0")]
        offset: usize,

        /// Output format: table, json
        #[arg(short = 'f', long = "format", default_value = "table")]
        format: String,
    },

    /// Show how a term expression resolves against the index
    Explain {
        /// Term expression, e.g. "cat,!food,-dog"
        terms: String,

        /// Output format: table, json
        #[arg(short = 'f', long = "format", default_value = "table")]
        format: String,
    },

    /// Mark a query as deleted
    Delete {
        /// Query id
        id: i64,
    },

    /// Clear the deleted flag of a query
    Restore {
        /// Query id
        id: i64,
    },

    /// Move a query to a page, or remove it from its page
    Assign {
        /// Query id
        id: i64,

        /// Page to group the query under
        #[arg(long = "page", required_unless_present = "clear", conflicts_with = "clear")]
        page: Option<i64>,

        /// Remove the query from its page
        #[arg(long = "clear")]
        clear: bool,
    },

    /// Inspect and maintain the inverted index
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Show the audit log of a query
    Audit {
        /// Query id
        id: i64,

        /// Output format: table, json
        #[arg(short = 'f', long = "format", default_value = "table")]
        format: String,
    },

    /// Execute SQL query
    #[command(visible_alias = "q")]
    Sql {
        /// SQL query to execute
        query: String,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Add query ids under a word
    Add {
        /// Word to index (without the namespace)
        word: String,

        /// Query ids
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Drop the namespace and index every query again
    Rebuild,

    /// List index keys
    Keys {
        /// Only keys whose word starts with this
        #[arg(default_value = "")]
        prefix: String,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init { prefix } => commands::init(prefix.as_deref()),
        Commands::Upload { project, file } => commands::upload(project, file.as_deref()),
        Commands::List { terms, project, page, no_page, has_page, deleted, query, limit, offset, format } => {
            let filters = sieve::QueryFilters {
                project,
                page_id: page,
                page_isnull: if no_page {
                    Some(true)
                } else if has_page {
                    Some(false)
                } else {
                    None
                },
                is_deleted: deleted,
                query,
                terms,
                limit,
                offset,
            };
            commands::list(&filters, &format)
        }
        Commands::Explain { terms, format } => commands::explain(&terms, &format),
        Commands::Delete { id } => commands::set_deleted(id, true),
        Commands::Restore { id } => commands::set_deleted(id, false),
        Commands::Assign { id, page, clear } => {
            let page = if clear { None } else { page };
            commands::assign(id, page)
        }
        Commands::Index { action } => match action {
            IndexAction::Add { word, ids } => commands::index_add(&word, &ids),
            IndexAction::Rebuild => commands::index_rebuild(),
            IndexAction::Keys { prefix } => commands::index_keys(&prefix),
        },
        Commands::Audit { id, format } => commands::audit(id, &format),
        Commands::Sql { query } => commands::sql(&query),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
