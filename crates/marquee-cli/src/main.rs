use anyhow::{Context, Result};
use clap::Parser;
use marquee_core::CatalogQuery;
use marquee_etl::{Config, EnrichMode};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "marquee", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the SQLite catalog (default: movies.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Load MovieLens, enrich with OMDb and export the top 10
    ///
    /// Runs the full pipeline:
    ///
    /// - Re-creates the catalog tables (all existing rows are dropped)
    /// - Loads movies.csv and ratings.csv from the data directory
    /// - Enriches every movie from the OMDb cache, querying OMDb on a miss
    /// - Writes the ten best-rated movies to sample_output/top10_enriched.csv
    ///
    /// Enrichment is skipped unless an OMDb key is available or --mock-omdb
    /// is given. In mock mode only omdb_cache.json is consulted.
    ///
    /// Every run appends its log to run_log.txt.
    Run {
        /// Directory containing movies.csv and ratings.csv
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// OMDb API key
        #[arg(long)]
        omdb_key: Option<String>,

        /// Use OMDb with the configured key (or OMDB_API_KEY from .env)
        #[arg(long)]
        use_omdb: bool,

        /// Run using the cache only (no real API calls)
        #[arg(long)]
        mock_omdb: bool,

        /// Do not write the top-10 CSV export
        #[arg(long)]
        no_export: bool,
    },
    /// Drop and recreate the catalog tables
    Init,
    /// Run one of the fixed catalog queries
    Query {
        /// tables, top-rated, count, missing-rating or since-2000
        name: CatalogQuery,

        /// Print the SQL instead of running it
        #[arg(long)]
        sql: bool,
    },
    /// Show row counts for the catalog tables
    Status,
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with commented defaults
    Init,
}

/// Install the log subscriber; `run_log` additionally receives every line.
fn init_logging(run_log: Option<&Path>) -> Result<()> {
    let file_layer = match run_log {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open run log {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = match cli.db {
        Some(db) => Config::load_with_db_path(db)?,
        None => Config::load()?,
    };

    let run_log = matches!(cli.command, Commands::Run { .. }).then(|| config.run_log_path.clone());
    init_logging(run_log.as_deref())?;

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    match cli.command {
        Commands::Run {
            data_dir,
            omdb_key,
            use_omdb,
            mock_omdb,
            no_export,
        } => {
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir;
            }
            // Ensure database directory exists
            if let Some(parent) = config
                .database_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
            {
                std::fs::create_dir_all(parent)?;
            }
            let mode = EnrichMode::resolve(omdb_key, config.omdb_key(), use_omdb, mock_omdb);
            commands::run_etl(&config, mode, !no_export).await?;
        }
        Commands::Init => {
            commands::run_init(&config.database_path)?;
        }
        Commands::Query { name, sql } => {
            commands::run_query(&config.database_path, name, sql)?;
        }
        Commands::Status => {
            commands::show_status(&config.database_path)?;
        }
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => commands::config::show_config(&config)?,
            ConfigAction::Path => commands::config::show_path()?,
            ConfigAction::Example => commands::config::show_example()?,
            ConfigAction::Init => commands::config::init_config()?,
        },
    }

    Ok(())
}
