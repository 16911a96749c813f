//! nmbrs-db CLI - mirror Nmbrs payroll data into a local SQL store

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use nmbrs_db::config::{self, NmbrsDbConfig, DEFAULT_DATABASE_URL};
use nmbrs_db::ui::{self, IngestProgress};
use nmbrs_db::{Gateway, InMemoryApi, IngestReport, NmbrsApi, NmbrsDatabase};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "nmbrs-db")]
#[command(version)]
#[command(about = "Mirror Nmbrs debtors, companies, employees and tags into a SQL database")]
#[command(long_about = r#"
nmbrs-db loads the payroll hierarchy of an Nmbrs account into a local
relational store, fanning debtors out over worker threads.

Example usage:
  nmbrs-db init
  nmbrs-db create --snapshot nmbrs-snapshot.json --delete
  nmbrs-db query --sql "SELECT name FROM debtors"
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to ./nmbrs-db.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config file
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Check that an existing database can be reached
    Ping {
        /// Database URL, e.g. sqlite:///nmbrs.db
        #[arg(short, long)]
        database: Option<String>,
    },

    /// Build the database and mirror debtors into it
    Create {
        /// Database URL, e.g. sqlite:///nmbrs.db
        #[arg(short, long)]
        database: Option<String>,

        /// JSON snapshot of the provider account
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Only mirror these debtor ids (repeatable)
        #[arg(long = "debtor")]
        debtors: Vec<i64>,

        /// Drop all tables before creating them
        #[arg(long)]
        delete: bool,

        /// Number of concurrent debtor workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Run raw SQL against the database
    Query {
        /// Database URL, e.g. sqlite:///nmbrs.db
        #[arg(short, long)]
        database: Option<String>,

        /// SQL statement to execute
        #[arg(short, long)]
        sql: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show row counts per table
    Stats {
        /// Database URL, e.g. sqlite:///nmbrs.db
        #[arg(short, long)]
        database: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let settings = config::load_config(Some(&config_path))?.unwrap_or_default();

    match cli.command {
        Commands::Init { force } => {
            config::write_config(&config_path, &NmbrsDbConfig::starter(), force)?;
            ui::success(&format!("Wrote {}", config_path.display()));
        }

        Commands::Ping { database } => {
            let url = database_url(database, &settings);
            // Probing needs no provider data
            let mut db = NmbrsDatabase::new(InMemoryApi::new(), url.as_str())
                .with_gateway_options(settings.gateway_options());
            let status = db.initialize_basic();
            ui::connection_status(&url, &status);
            if !status.is_connected() {
                std::process::exit(1);
            }
        }

        Commands::Create {
            database,
            snapshot,
            debtors,
            delete,
            workers,
            format,
        } => {
            let url = database_url(database, &settings);
            let snapshot = match snapshot.or_else(|| settings.snapshot.as_ref().map(PathBuf::from)) {
                Some(path) => path,
                None => bail!("no snapshot given (pass --snapshot or set `snapshot` in the config)"),
            };

            let mut settings = settings;
            if workers.is_some() {
                settings.workers = workers;
            }

            let started = Instant::now();
            let report = run_create(&url, &snapshot, &debtors, delete, &settings, format)?;

            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                Format::Text => {
                    ui::success(&format!("Mirrored {} debtors into {}", report.debtors, url));
                    ui::ingest_summary(&report);
                    ui::timing(&format!("{:.2?}", started.elapsed()));
                }
            }
        }

        Commands::Query { database, sql, format } => {
            let url = database_url(database, &settings);
            let gateway = Gateway::connect_existing(&url, &settings.gateway_options())?;
            let rows = gateway.query(&sql)?;

            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
                Format::Text => {
                    println!("{}", ui::query_table(&rows));
                    ui::info("rows", &rows.len().to_string());
                }
            }
        }

        Commands::Stats { database } => {
            let gateway =
                Gateway::connect_existing(&database_url(database, &settings), &settings.gateway_options())?;
            let stats = gateway.stats()?;

            ui::header(&format!("nmbrs-db statistics ({})", gateway.url()));
            println!("{}", ui::stats_table(&stats));
        }
    }

    Ok(())
}

/// Flag, then config, then the built-in default
fn database_url(flag: Option<String>, settings: &NmbrsDbConfig) -> String {
    flag.or_else(|| settings.database_url.clone())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

fn run_create(
    url: &str,
    snapshot: &Path,
    only: &[i64],
    delete: bool,
    settings: &NmbrsDbConfig,
    format: Format,
) -> anyhow::Result<IngestReport> {
    let api = InMemoryApi::from_json_file(snapshot)
        .with_context(|| format!("failed to load snapshot {}", snapshot.display()))?;

    let selected = if only.is_empty() {
        None
    } else {
        let picked: Vec<_> = api
            .list_debtors()?
            .into_iter()
            .filter(|d| only.contains(&d.id))
            .collect();
        let missing: Vec<i64> = only
            .iter()
            .copied()
            .filter(|id| !picked.iter().any(|d| d.id == *id))
            .collect();
        if !missing.is_empty() {
            bail!("debtors not in snapshot: {:?}", missing);
        }
        Some(picked)
    };

    if let Format::Text = format {
        ui::header(&format!("Creating {}", url));
        ui::info("snapshot", &snapshot.display().to_string());
    }

    let total = match &selected {
        Some(debtors) => debtors.len(),
        None => api.list_debtors()?.len(),
    };
    let (tx, rx) = crossbeam::channel::unbounded();
    let progress = IngestProgress::spawn(total, rx);

    // The facade owns the last sender; it must be gone before the bar can finish.
    let result = {
        let mut db = NmbrsDatabase::new(api, url)
            .with_gateway_options(settings.gateway_options())
            .with_pipeline_options(settings.pipeline_options())
            .with_progress(tx);
        db.create_basic(selected, delete)
    };
    let tally = progress.finish();
    tracing::debug!("{} debtors finished, {} failed", tally.finished, tally.failed);

    Ok(result?)
}
