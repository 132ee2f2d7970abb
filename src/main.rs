mod cli;
mod handlers;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use rdjd::{ConfigManager, CredentialStore};
use std::process;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const TOKEN_ENV: &str = "RDJD_TOKEN";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Validate CLI arguments first
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_logging(args.verbose);

    let config_manager = match &args.config {
        Some(path) => ConfigManager::load_from(path)?,
        None => ConfigManager::new()?,
    };

    if !handlers::should_skip_config_validation(&args.command) {
        if let Err(e) = config_manager.validate() {
            eprintln!("Configuration validation failed: {}", e);
            eprintln!("Run 'rdjd config validate' for details");
            process::exit(1);
        }
    }

    let credentials = Arc::new(CredentialStore::open(config_manager.credentials_file())?);
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        if !token.trim().is_empty() {
            debug!("Using API token from {}", TOKEN_ENV);
            credentials.set_ephemeral(&token);
        }
    }

    if args.requires_token() && !credentials.is_set() {
        eprintln!("Error: no Real-Debrid API token configured");
        eprintln!("Run 'rdjd auth set' or export {}", TOKEN_ENV);
        process::exit(1);
    }

    match args.command {
        Commands::Auth { action } => {
            handlers::handle_auth(&credentials, action).await?;
        }
        Commands::Add { magnet } => {
            handlers::handle_add(&config_manager, credentials, magnet).await?;
        }
        Commands::Fetch {
            magnet,
            no_dispatch,
        } => {
            handlers::handle_fetch(&config_manager, credentials, magnet, no_dispatch).await?;
        }
        Commands::Batch {
            magnets,
            file,
            no_dispatch,
            concurrency,
        } => {
            handlers::handle_batch(
                &config_manager,
                credentials,
                magnets,
                file,
                no_dispatch,
                concurrency,
            )
            .await?;
        }
        Commands::Scan { url, send } => {
            handlers::handle_scan(&config_manager, credentials, url, send).await?;
        }
        Commands::Resolve {
            series,
            episode,
            season,
        } => {
            handlers::handle_resolve(&config_manager, series, episode, season).await?;
        }
        Commands::Season {
            series,
            episodes,
            season,
            send,
        } => {
            handlers::handle_season(&config_manager, credentials, series, episodes, season, send)
                .await?;
        }
        Commands::List => {
            handlers::handle_list(&config_manager, credentials).await?;
        }
        Commands::Config { action } => {
            handlers::handle_config(&config_manager, action).await?;
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise warnings only, or debug output for this crate
/// with `--verbose`. Logs go to stderr so piped link output stays clean.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("warn,rdjd=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}
