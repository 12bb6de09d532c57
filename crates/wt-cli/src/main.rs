use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wt_cli::commands::{find, recompute, sessions, status, track};
use wt_cli::{Cli, Commands, Config, workspace};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // stdout carries command output, so logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = std::io::stdout();
    match &cli.command {
        Some(Commands::Track {
            ledger,
            idle_threshold,
            no_start,
        }) => {
            track::run(&config, ledger, *idle_threshold, !*no_start).await?;
        }
        Some(Commands::Status { ledger }) => {
            let identity = workspace::resolve_identity(&config, ledger)?;
            let store = workspace::open_store(&config)?;
            status::run(&mut stdout, store.as_ref(), &identity)?;
        }
        Some(Commands::Sessions { ledger, json }) => {
            let identity = workspace::resolve_identity(&config, ledger)?;
            let store = workspace::open_store(&config)?;
            sessions::run(&mut stdout, store.as_ref(), &identity, *json)?;
        }
        Some(Commands::Recompute { ledger }) => {
            let identity = workspace::resolve_identity(&config, ledger)?;
            let store = workspace::open_store(&config)?;
            recompute::run(&mut stdout, store, &identity)?;
        }
        Some(Commands::Find { dir }) => {
            let dir = match dir {
                Some(dir) => dir.clone(),
                None => std::env::current_dir().context("failed to determine current directory")?,
            };
            find::run(&mut stdout, &config, &dir)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
