use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use ttt_cli::commands::list::Filter;
use ttt_cli::commands::{clear, list, run, show, status, sweep};
use ttt_cli::{Cli, Commands, Config};
use ttt_store::SqliteStore;
use ttt_tracker::{KnownTabs, Tracker, spawn_sweeper};

/// Open the record store, ensuring the parent directory exists.
fn open_store(config: &Config) -> Result<SqliteStore> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    SqliteStore::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // try_init: a subscriber may already be installed (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let store = open_store(&config)?;
    let host = KnownTabs::new();
    let tracker = Tracker::new(store, host.clone(), config.tracker_options());
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::Run {
            events,
            reconcile,
            no_sweep,
        } => {
            let sweeper =
                (!no_sweep).then(|| spawn_sweeper(tracker.clone(), config.sweep_interval()));
            let result = match events {
                Some(path) => {
                    let file = tokio::fs::File::open(path)
                        .await
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    run::run(BufReader::new(file), &mut stdout, &tracker, &host, *reconcile).await
                }
                None => {
                    let stdin = BufReader::new(tokio::io::stdin());
                    run::run(stdin, &mut stdout, &tracker, &host, *reconcile).await
                }
            };
            if let Some(sweeper) = sweeper {
                sweeper.abort();
            }
            result?;
        }
        Commands::List { json, open, closed } => {
            list::run(&mut stdout, &tracker, Filter::from_flags(*open, *closed), *json).await?;
        }
        Commands::Show { tab_id, json } => {
            show::run(&mut stdout, &tracker, *tab_id, *json).await?;
        }
        Commands::Clear => {
            clear::run(&mut stdout, &tracker).await?;
        }
        Commands::Sweep => {
            sweep::run(&mut stdout, &tracker).await?;
        }
        Commands::Status => {
            status::run(&mut stdout, &tracker, &config.database_path).await?;
        }
    }

    Ok(())
}
