//! memlog CLI
//!
//! Command-line tools for reading, writing and maintaining memlog books.
//!
//! # Commands
//!
//! - `write` - Append a record to an events or summary stream
//! - `read` - Print every record of a stream
//! - `summary` - Append a summary with source ids
//! - `latest-summary` - Print the newest summary of a unit
//! - `get` - Print one record by id
//! - `query` - Print records inside a time window
//! - `rebuild` - Rebuild a unit index or the global index
//! - `verify` - Compare every unit index with its data file
//! - `units` - List units and their streams

mod commands;
mod output;

use clap::{Parser, Subcommand};
use memlog_core::{Config, CoreError, JsonlStore, MissingTimePolicy};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// memlog command-line tools.
#[derive(Parser)]
#[command(name = "memlog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the books
    #[arg(global = true, short, long, env = "MEMLOG_ROOT")]
    root: Option<PathBuf>,

    /// Book identifier
    #[arg(global = true, short, long, env = "MEMLOG_BOOK")]
    book: Option<String>,

    /// Sync every append to disk
    #[arg(global = true, long)]
    sync: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a record
    Write {
        /// Target address (`unit` or `unit/__summary__`)
        address: String,

        /// Text content
        #[arg(required_unless_present = "json", conflicts_with = "json")]
        content: Option<String>,

        /// Content as a JSON value; must be a JSON string
        #[arg(long)]
        json: Option<String>,
    },

    /// Print every record of a stream
    Read {
        /// Stream address (`unit` or `unit/__summary__`)
        address: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Append a summary to a unit
    Summary {
        /// Unit address
        unit: String,

        /// Summary text
        text: String,

        /// Ids of the records the summary was derived from
        #[arg(short, long = "source", value_delimiter = ',')]
        sources: Vec<String>,
    },

    /// Print the newest summary of a unit
    LatestSummary {
        /// Unit address
        unit: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print one record by id
    Get {
        /// Record id
        id: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print records inside a time window
    Query {
        /// Window start (epoch seconds or ISO-8601)
        start: String,

        /// Window end (epoch seconds or ISO-8601)
        end: String,

        /// Restrict to one unit
        #[arg(short, long)]
        address: Option<String>,

        /// Stream to search or filter by (events, summary)
        #[arg(short, long)]
        stream: Option<String>,

        /// Maximum number of records
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Rebuild a unit index, or the global index when no unit is given
    Rebuild {
        /// Unit address
        unit: Option<String>,

        /// Stream of the unit to rebuild (events, summary)
        #[arg(short, long, default_value = "events")]
        stream: String,

        /// Stamp records without a usable time with the current time
        #[arg(long)]
        stamp_now: bool,
    },

    /// Compare every unit index with its data file
    Verify {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List units and their streams
    Units,

    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<CoreError>() {
                Some(core) => eprintln!("error [{}]: {}", core.status(), core),
                None => eprintln!("error: {e}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = StoreSettings {
        root: cli.root,
        book: cli.book,
        sync: cli.sync,
    };

    match cli.command {
        Commands::Write {
            address,
            content,
            json,
        } => {
            let store = settings.open(true, MissingTimePolicy::default())?;
            commands::write::run(&store, &address, content.as_deref(), json.as_deref())?;
        }
        Commands::Read { address, format } => {
            let store = settings.open(false, MissingTimePolicy::default())?;
            commands::read::read(&store, &address, &format)?;
        }
        Commands::Summary {
            unit,
            text,
            sources,
        } => {
            let store = settings.open(true, MissingTimePolicy::default())?;
            commands::write::summary(&store, &unit, &text, &sources)?;
        }
        Commands::LatestSummary { unit, format } => {
            let store = settings.open(false, MissingTimePolicy::default())?;
            commands::read::latest_summary(&store, &unit, &format)?;
        }
        Commands::Get { id, format } => {
            let store = settings.open(false, MissingTimePolicy::default())?;
            commands::read::get(&store, &id, &format)?;
        }
        Commands::Query {
            start,
            end,
            address,
            stream,
            limit,
            format,
        } => {
            let store = settings.open(false, MissingTimePolicy::default())?;
            let args = commands::query::QueryArgs {
                start,
                end,
                address,
                stream,
                limit,
            };
            commands::query::run(&store, args, &format)?;
        }
        Commands::Rebuild {
            unit,
            stream,
            stamp_now,
        } => {
            let policy = if stamp_now {
                MissingTimePolicy::Now
            } else {
                MissingTimePolicy::Unknown
            };
            let store = settings.open(false, policy)?;
            commands::rebuild::run(&store, unit.as_deref(), &stream)?;
        }
        Commands::Verify { format } => {
            let store = settings.open(false, MissingTimePolicy::default())?;
            commands::verify::run(&store, &format)?;
        }
        Commands::Units => {
            let store = settings.open(false, MissingTimePolicy::default())?;
            commands::units::run(&store)?;
        }
        Commands::Version => {
            println!("memlog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("memlog core v{}", memlog_core::VERSION);
        }
    }

    Ok(())
}

/// Location and durability settings shared by every command.
struct StoreSettings {
    root: Option<PathBuf>,
    book: Option<String>,
    sync: bool,
}

impl StoreSettings {
    fn open(
        &self,
        create: bool,
        missing_time: MissingTimePolicy,
    ) -> Result<JsonlStore, Box<dyn std::error::Error>> {
        let root = self
            .root
            .as_deref()
            .ok_or("book root required (--root or MEMLOG_ROOT)")?;
        let book = self
            .book
            .as_deref()
            .ok_or("book id required (--book or MEMLOG_BOOK)")?;

        let config = Config::new()
            .create_if_missing(create)
            .sync_on_append(self.sync)
            .missing_time(missing_time);
        Ok(JsonlStore::open_with_config(root, book, config)?)
    }
}
